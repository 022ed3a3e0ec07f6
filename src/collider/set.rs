//! 碰撞体集合
//!
//! 碰撞体由外部拥有，骨骼只持有索引。挂在骨架节点上的碰撞体
//! 在每帧步进前按节点当前姿态同步（类似运动学刚体跟随骨骼），
//! 步进期间只读。

use crate::skeleton::{NodeId, PoseTable};
use crate::{Result, SpringError};
use super::{Collider, Frame};

/// 碰撞体索引
pub type ColliderId = usize;

/// 碰撞体挂载信息
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attachment {
    /// 跟随的骨架节点
    pub node: NodeId,
    /// 相对节点的偏移
    pub offset: Frame,
}

#[derive(Clone, Debug)]
struct ColliderEntry {
    collider: Collider,
    attachment: Option<Attachment>,
}

/// 碰撞体集合
#[derive(Clone, Debug, Default)]
pub struct ColliderSet {
    entries: Vec<ColliderEntry>,
}

impl ColliderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加世界空间固定的碰撞体
    pub fn add(&mut self, collider: impl Into<Collider>) -> ColliderId {
        self.entries.push(ColliderEntry {
            collider: collider.into(),
            attachment: None,
        });
        self.entries.len() - 1
    }

    /// 添加跟随骨架节点的碰撞体
    ///
    /// 碰撞体自身的 frame 会被视为相对节点的偏移。
    pub fn add_attached(&mut self, collider: impl Into<Collider>, node: NodeId) -> ColliderId {
        let collider = collider.into();
        let offset = *collider.frame();
        self.entries.push(ColliderEntry {
            collider,
            attachment: Some(Attachment { node, offset }),
        });
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: ColliderId) -> Option<&Collider> {
        self.entries.get(id).map(|e| &e.collider)
    }

    pub fn get_mut(&mut self, id: ColliderId) -> Option<&mut Collider> {
        self.entries.get_mut(id).map(|e| &mut e.collider)
    }

    pub fn attachment(&self, id: ColliderId) -> Option<&Attachment> {
        self.entries.get(id).and_then(|e| e.attachment.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColliderId, &Collider)> {
        self.entries.iter().enumerate().map(|(id, e)| (id, &e.collider))
    }

    /// 校验挂载节点都存在于姿态表中
    pub fn validate<P: PoseTable + ?Sized>(&self, pose: &P) -> Result<()> {
        for entry in &self.entries {
            if let Some(attachment) = entry.attachment {
                if !pose.contains(attachment.node) {
                    return Err(SpringError::NodeOutOfRange(attachment.node));
                }
            }
        }
        Ok(())
    }

    /// 按节点当前姿态刷新挂载碰撞体的坐标系
    pub fn sync_with_pose<P: PoseTable + ?Sized>(&mut self, pose: &P) {
        for entry in &mut self.entries {
            let Some(attachment) = entry.attachment else {
                continue;
            };
            if !pose.contains(attachment.node) {
                continue;
            }
            let node_frame = Frame::new(
                pose.world_position(attachment.node),
                pose.world_rotation(attachment.node),
            );
            *entry.collider.frame_mut() = node_frame * attachment.offset;
        }
    }
}
