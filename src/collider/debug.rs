//! 碰撞诊断记录
//!
//! 每次非 NoCollision 的检测记录一次接触点，供外部可视化 / 遥测使用。
//! 每帧开始时清空。

use glam::Vec3;

use crate::skeleton::NodeId;
use super::{CollisionStatus, ContactPoint};

/// 单条碰撞记录
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionRecord {
    /// 发生碰撞的骨骼节点
    pub bone: NodeId,
    /// 接触点（世界空间）
    pub position: Vec3,
    /// 接触法线
    pub normal: Vec3,
    /// 骨骼尾端半径
    pub radius: f32,
    pub status: CollisionStatus,
}

/// 碰撞记录
#[derive(Clone, Debug, Default)]
pub struct CollisionLog {
    enabled: bool,
    records: Vec<CollisionRecord>,
}

impl CollisionLog {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, records: Vec::new() }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.records.clear();
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn record(&mut self, bone: NodeId, contact: ContactPoint, radius: f32, status: CollisionStatus) {
        if !self.enabled || !status.is_collision() {
            return;
        }
        self.records.push(CollisionRecord {
            bone,
            position: contact.position,
            normal: contact.normal,
            radius,
            status,
        });
    }

    pub fn records(&self) -> &[CollisionRecord] {
        &self.records
    }

    /// 头部嵌入的记录数
    pub fn head_embedded_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == CollisionStatus::HeadEmbedded)
            .count()
    }
}
