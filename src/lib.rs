//! Spring Bone 运行时
//!
//! 为挂在骨骼上的头发、布料、饰品等骨链模拟二次运动（摇摆）：
//! - math: 几何内核（球-球相交圆、切点、线段相交）
//! - skeleton: 姿态表接口与参考骨架实现
//! - collider: 球体 / 胶囊体 / 面板碰撞体
//! - spring: 角度限制、单骨骼求解器、骨链调度器

pub mod math;
pub mod skeleton;
pub mod collider;
pub mod spring;

pub use collider::{
    Collider, ColliderId, ColliderSet, CollisionLog, CollisionRecord, CollisionStatus,
    CapsuleCollider, Frame, GroundPlane, PanelCollider, SphereCollider,
};
pub use skeleton::{NodeId, PoseTable, Skeleton};
pub use spring::{
    AngleLimits, Character, SpringBone, SpringBoneSettings, SpringConfig, SpringManager,
    SpringWorld, StepFlags,
};

/// 错误类型
#[derive(Debug, thiserror::Error)]
pub enum SpringError {
    #[error("Node index {0} out of range")]
    NodeOutOfRange(usize),

    #[error("Collider index {0} out of range")]
    ColliderOutOfRange(usize),

    #[error("Spring bone on node '{0}' has no parent")]
    MissingParent(String),

    #[error("Spring bone on node '{0}' has no valid child to aim at")]
    NoValidChild(String),

    #[error("Node '{0}' already has a spring bone")]
    DuplicateBone(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SpringError>;
