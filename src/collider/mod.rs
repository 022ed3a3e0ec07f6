//! 碰撞体
//!
//! 三种解析碰撞体（球体 / 胶囊体 / 面板）组成封闭的 tagged union，
//! 统一通过 `Collider::resolve` 修正骨骼尾端位置。
//! 碰撞计算都在碰撞体本地空间完成，结果再变换回世界空间。

mod frame;
mod sphere;
mod capsule;
mod panel;
mod set;
mod debug;

pub use frame::Frame;
pub use sphere::SphereCollider;
pub use capsule::CapsuleCollider;
pub use panel::{Axis, GroundPlane, PanelCollider, resolve_aligned_plane};
pub use set::{Attachment, ColliderId, ColliderSet};
pub use debug::{CollisionLog, CollisionRecord};

use glam::Vec3;

/// 半径小于此值的碰撞体不参与检测
pub const MIN_COLLIDER_RADIUS: f32 = 0.0001;

/// 单次碰撞检测结果
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CollisionStatus {
    /// 未碰撞
    #[default]
    NoCollision,
    /// 骨骼头部已嵌入碰撞体，只能把尾端推出
    HeadEmbedded,
    /// 尾端碰撞，已投影回表面
    TailCollision,
}

impl CollisionStatus {
    #[inline]
    pub fn is_collision(self) -> bool {
        self != CollisionStatus::NoCollision
    }
}

/// 接触点（仅用于诊断）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactPoint {
    pub position: Vec3,
    pub normal: Vec3,
}

/// 碰撞体种类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColliderKind {
    Sphere,
    Capsule,
    Panel,
}

/// 碰撞体
#[derive(Clone, Debug)]
pub enum Collider {
    Sphere(SphereCollider),
    Capsule(CapsuleCollider),
    Panel(PanelCollider),
}

impl Collider {
    #[inline]
    pub fn kind(&self) -> ColliderKind {
        match self {
            Collider::Sphere(_) => ColliderKind::Sphere,
            Collider::Capsule(_) => ColliderKind::Capsule,
            Collider::Panel(_) => ColliderKind::Panel,
        }
    }

    /// 启用且尺寸有效
    pub fn is_active(&self) -> bool {
        match self {
            Collider::Sphere(c) => c.is_active(),
            Collider::Capsule(c) => c.is_active(),
            Collider::Panel(c) => c.is_active(),
        }
    }

    pub fn frame(&self) -> &Frame {
        match self {
            Collider::Sphere(c) => &c.frame,
            Collider::Capsule(c) => &c.frame,
            Collider::Panel(c) => &c.frame,
        }
    }

    pub fn frame_mut(&mut self) -> &mut Frame {
        match self {
            Collider::Sphere(c) => &mut c.frame,
            Collider::Capsule(c) => &mut c.frame,
            Collider::Panel(c) => &mut c.frame,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        match self {
            Collider::Sphere(c) => c.enabled = enabled,
            Collider::Capsule(c) => c.enabled = enabled,
            Collider::Panel(c) => c.enabled = enabled,
        }
    }

    /// 修正尾端位置
    ///
    /// `bone_length` 只有面板需要（判断整根骨骼是否埋在面板下）。
    pub fn resolve(
        &self,
        head: Vec3,
        tail: Vec3,
        tail_radius: f32,
        bone_length: f32,
    ) -> (Vec3, CollisionStatus) {
        match self {
            Collider::Sphere(c) => c.resolve(head, tail, tail_radius),
            Collider::Capsule(c) => c.resolve(head, tail, tail_radius),
            Collider::Panel(c) => c.resolve(head, tail, tail_radius, bone_length),
        }
    }

    /// 点是否在碰撞体内（面板没有体积，恒为 false）
    pub fn contains(&self, point: Vec3) -> bool {
        match self {
            Collider::Sphere(c) => c.contains(point),
            Collider::Capsule(c) => c.contains(point),
            Collider::Panel(_) => false,
        }
    }

    /// 带半径的线段是否与碰撞体相交
    pub fn intersects_segment(&self, a: Vec3, b: Vec3, segment_radius: f32) -> bool {
        match self {
            Collider::Sphere(c) => c.intersects_segment(a, b, segment_radius),
            Collider::Capsule(c) => c.intersects_segment(a, b, segment_radius),
            Collider::Panel(c) => c.intersects_segment(a, b, segment_radius),
        }
    }

    /// 尾端对应的表面接触点
    pub fn contact_point(&self, tail: Vec3) -> ContactPoint {
        match self {
            Collider::Sphere(c) => c.contact_point(tail),
            Collider::Capsule(c) => c.contact_point(tail),
            Collider::Panel(c) => c.contact_point(tail),
        }
    }
}

impl From<SphereCollider> for Collider {
    fn from(c: SphereCollider) -> Self {
        Collider::Sphere(c)
    }
}

impl From<CapsuleCollider> for Collider {
    fn from(c: CapsuleCollider) -> Self {
        Collider::Capsule(c)
    }
}

impl From<PanelCollider> for Collider {
    fn from(c: PanelCollider) -> Self {
        Collider::Panel(c)
    }
}

/// 归一化，长度过小时返回 fallback
#[inline]
pub(crate) fn direction_or(v: Vec3, fallback: Vec3) -> Vec3 {
    v.try_normalize().unwrap_or(fallback)
}
