//! 参考骨架实现
//!
//! 节点按"父先于子"的顺序加入，因此索引顺序即拓扑序，
//! 全量刷新只需线性遍历一次。

use glam::{Vec3, Quat, Mat4};

use crate::{Result, SpringError};
use super::{NodeId, PoseTable, SkeletonNode};

/// 骨架（节点 arena）
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    nodes: Vec<SkeletonNode>,
    /// 子节点缓存
    children: Vec<Vec<NodeId>>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加节点
    ///
    /// 父节点必须已存在，保证层次无环。
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
        translation: Vec3,
        rotation: Quat,
    ) -> Result<NodeId> {
        if let Some(parent) = parent {
            if parent >= self.nodes.len() {
                return Err(SpringError::NodeOutOfRange(parent));
            }
        }

        let id = self.nodes.len();
        let mut node = SkeletonNode::new(name.into());
        node.internal_id = id;
        node.parent_index = parent;
        node.local.translation = translation;
        node.local.rotation = rotation;
        node.compute_local_transform();

        self.nodes.push(node);
        self.children.push(Vec::new());
        if let Some(parent) = parent {
            self.children[parent].push(id);
        }

        self.update_world_transform_recursive(id);
        Ok(id)
    }

    /// 添加 pivot 节点
    pub fn add_pivot(
        &mut self,
        name: impl Into<String>,
        parent: NodeId,
        rotation: Quat,
    ) -> Result<NodeId> {
        let id = self.add_node(name, Some(parent), Vec3::ZERO, rotation)?;
        self.nodes[id].set_pivot(true);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&SkeletonNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[SkeletonNode] {
        &self.nodes
    }

    /// 按名称查找
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// 设置本地平移（同步刷新子孙）
    pub fn set_local_translation(&mut self, id: NodeId, translation: Vec3) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.local.translation = translation;
            node.compute_local_transform();
            self.update_world_transform_recursive(id);
        }
    }

    /// 设置根节点的世界变换（移动整个角色）
    pub fn set_root_transform(&mut self, id: NodeId, translation: Vec3, rotation: Quat) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.local.translation = translation;
            node.local.rotation = rotation;
            node.compute_local_transform();
            self.update_world_transform_recursive(id);
        }
    }

    /// 全量刷新世界变换
    pub fn update_world_transforms(&mut self) {
        for idx in 0..self.nodes.len() {
            let parent_global = match self.nodes[idx].parent_index {
                Some(parent) => self.nodes[parent].local_to_world,
                None => Mat4::IDENTITY,
            };
            let node = &mut self.nodes[idx];
            node.local_to_world = parent_global * node.local_to_parent;
        }
    }

    /// 递归更新全局变换
    pub(crate) fn update_world_transform_recursive(&mut self, idx: NodeId) {
        if idx >= self.nodes.len() {
            return;
        }

        let parent_global = match self.nodes[idx].parent_index {
            Some(parent) => self.nodes[parent].local_to_world,
            None => Mat4::IDENTITY,
        };
        self.nodes[idx].local_to_world = parent_global * self.nodes[idx].local_to_parent;

        // 递归更新子节点
        for i in 0..self.children[idx].len() {
            let child_idx = self.children[idx][i];
            self.update_world_transform_recursive(child_idx);
        }
    }
}

impl PoseTable for Skeleton {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn name(&self, id: NodeId) -> &str {
        &self.nodes[id].name
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent_index
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        &self.children[id]
    }

    fn is_pivot(&self, id: NodeId) -> bool {
        self.nodes[id].is_pivot()
    }

    fn world_position(&self, id: NodeId) -> Vec3 {
        self.nodes[id].position()
    }

    fn world_rotation(&self, id: NodeId) -> Quat {
        self.nodes[id].rotation()
    }

    fn local_rotation(&self, id: NodeId) -> Quat {
        self.nodes[id].local.rotation
    }

    fn set_local_rotation(&mut self, id: NodeId, rotation: Quat) {
        let node = &mut self.nodes[id];
        node.local.rotation = rotation;
        node.compute_local_transform();
        self.update_world_transform_recursive(id);
    }
}
