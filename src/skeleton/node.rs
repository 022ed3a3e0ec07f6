//! 骨架节点
//!
//! 每个 SkeletonNode 代表变换层次中的一个节点，
//! 世界变换按 local_to_world = parent.local_to_world * local_to_parent 计算。

use glam::{Vec3, Quat, Mat4};
use bitflags::bitflags;

use super::{NodeId, NodeTransform};

// ============================================================================
// 节点标志
// ============================================================================

bitflags! {
    /// 节点标志位
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct NodeFlags: u32 {
        /// 角度限制 pivot（不是骨骼子节点）
        const PIVOT = 1 << 0;
    }
}

// ============================================================================
// 骨架节点
// ============================================================================

/// 骨架节点
#[derive(Clone, Debug)]
pub struct SkeletonNode {
    // ========================================
    // 静态数据（初始化后不变）
    // ========================================

    /// 节点名称
    pub name: String,

    /// 节点内部索引
    pub(crate) internal_id: NodeId,

    /// 父节点索引
    pub parent_index: Option<NodeId>,

    /// 节点标志
    pub flags: NodeFlags,

    // ========================================
    // 动态数据（每帧更新）
    // ========================================

    /// 本地变换（平移 / 旋转 / 缩放）
    pub local: NodeTransform,

    /// 本地变换矩阵 (local_to_parent)
    pub local_to_parent: Mat4,

    /// 全局变换矩阵 (local_to_world)
    pub local_to_world: Mat4,
}

impl SkeletonNode {
    /// 创建新节点
    pub fn new(name: String) -> Self {
        Self {
            name,
            internal_id: 0,
            parent_index: None,
            flags: NodeFlags::empty(),
            local: NodeTransform::default(),
            local_to_parent: Mat4::IDENTITY,
            local_to_world: Mat4::IDENTITY,
        }
    }

    /// 节点索引
    #[inline]
    pub fn node_id(&self) -> NodeId {
        self.internal_id
    }

    /// 是否为根节点
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_index.is_none()
    }

    /// 获取世界位置
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.local_to_world.col(3).truncate()
    }

    /// 获取世界旋转（去除缩放）
    #[inline]
    pub fn rotation(&self) -> Quat {
        let (_, rotation, _) = self.local_to_world.to_scale_rotation_translation();
        rotation
    }

    /// 计算本地变换 (local_to_parent)
    #[inline]
    pub fn compute_local_transform(&mut self) {
        self.local_to_parent = self.local.to_matrix();
    }

    #[inline]
    pub fn is_pivot(&self) -> bool {
        self.flags.contains(NodeFlags::PIVOT)
    }

    #[inline]
    pub fn set_pivot(&mut self, pivot: bool) {
        self.flags.set(NodeFlags::PIVOT, pivot);
    }
}

impl Default for SkeletonNode {
    fn default() -> Self {
        Self::new(String::new())
    }
}
