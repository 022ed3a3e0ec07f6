//! 骨架 / 姿态表
//!
//! 核心设计思想：
//! - PoseTable: 求解器读写姿态的唯一接口（按节点索引访问，不持有对象引用）
//! - SkeletonNode: 单个变换节点
//! - Skeleton: 节点 arena，写入本地旋转时同步刷新子孙的世界变换

mod node;
mod hierarchy;

pub use node::{NodeFlags, SkeletonNode};
pub use hierarchy::Skeleton;

use glam::{Vec3, Quat, Mat4};

/// 节点索引
pub type NodeId = usize;

// ============================================================================
// 公共类型定义
// ============================================================================

/// 节点本地变换数据
#[derive(Clone, Copy, Debug)]
pub struct NodeTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl NodeTransform {
    /// 转换为 4x4 矩阵
    #[inline]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// 从矩阵分解
    #[inline]
    pub fn from_matrix(m: Mat4) -> Self {
        let (scale, rotation, translation) = m.to_scale_rotation_translation();
        Self { translation, rotation, scale }
    }
}

// ============================================================================
// 姿态表接口
// ============================================================================

/// 外部拥有的姿态表
///
/// 求解器只读取父节点的世界朝向 / 位置，并写回自身的本地旋转。
/// 实现方必须保证 `set_local_rotation` 之后该节点及其子孙的世界变换立即可见，
/// 否则按深度顺序处理的子骨骼会读到上一帧的父朝向。
pub trait PoseTable {
    /// 节点数量
    fn node_count(&self) -> usize;

    /// 节点名称
    fn name(&self, id: NodeId) -> &str;

    /// 父节点
    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// 子节点列表
    fn children(&self, id: NodeId) -> &[NodeId];

    /// 是否为角度限制用的 pivot 节点（推导骨骼尾端时忽略）
    fn is_pivot(&self, _id: NodeId) -> bool {
        false
    }

    fn world_position(&self, id: NodeId) -> Vec3;

    fn world_rotation(&self, id: NodeId) -> Quat;

    fn local_rotation(&self, id: NodeId) -> Quat;

    fn set_local_rotation(&mut self, id: NodeId, rotation: Quat);

    /// 层级深度（连续父节点个数 + 1）
    fn depth(&self, id: NodeId) -> usize {
        let mut depth = 1;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// 节点索引是否有效
    #[inline]
    fn contains(&self, id: NodeId) -> bool {
        id < self.node_count()
    }
}
