//! 碰撞体坐标系
//!
//! 平移 + 旋转 + 等比缩放。半径、长度等标量按缩放换算到本地单位。

use std::ops::Mul;

use glam::{Vec3, Quat};

/// 碰撞体坐标系
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub translation: Vec3,
    pub rotation: Quat,
    /// 等比缩放
    pub scale: f32,
}

impl Default for Frame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Frame {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: 1.0,
    };

    #[inline]
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self { translation, rotation, scale: 1.0 }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY)
    }

    #[inline]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// 缩放有效（可逆）
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.scale > f32::EPSILON && self.scale.is_finite()
    }

    #[inline]
    pub fn to_local_point(&self, p: Vec3) -> Vec3 {
        (self.rotation.inverse() * (p - self.translation)) / self.scale
    }

    #[inline]
    pub fn to_world_point(&self, p: Vec3) -> Vec3 {
        self.translation + self.rotation * (p * self.scale)
    }

    #[inline]
    pub fn to_world_direction(&self, d: Vec3) -> Vec3 {
        self.rotation * d
    }

    #[inline]
    pub fn to_local_length(&self, length: f32) -> f32 {
        length / self.scale
    }

    #[inline]
    pub fn to_world_length(&self, length: f32) -> f32 {
        length * self.scale
    }

    /// 本地 Y 轴（世界空间）
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// 本地 Z 轴（世界空间）
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

/// 坐标系复合：parent * child
impl Mul for Frame {
    type Output = Frame;

    fn mul(self, child: Frame) -> Frame {
        Frame {
            translation: self.to_world_point(child.translation),
            rotation: (self.rotation * child.rotation).normalize(),
            scale: self.scale * child.scale,
        }
    }
}
