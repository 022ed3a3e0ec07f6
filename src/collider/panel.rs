//! 面板碰撞体与地面
//!
//! 面板本地 Z 轴为法线，X 方向宽度、Y 方向高度。
//! 地面是同一套"轴对齐平面"逻辑，以世界 Y 轴为法线。

use glam::{Vec2, Vec3, Quat};

use super::{CollisionStatus, ContactPoint, Frame};

/// 侧向投影长度低于此值时不做侧向偏移
const MIN_PROJECTION_LENGTH: f32 = 0.001;

/// 平面法线所在的坐标轴
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// 与轴对齐平面（法线为 up_axis，平面过原点）的碰撞
///
/// - 尾端高度 ≥ 尾端半径：无碰撞
/// - 头部高度 + 骨骼长度仍 ≤ 尾端半径：整根骨骼埋在平面下，尾端沿法线放在头部上方 length 处
/// - 其余：尾端放到高度 tail_radius，侧向按 sqrt(length² - h²) 偏移以尽量保持骨骼长度
pub fn resolve_aligned_plane(
    local_head: Vec3,
    local_length: f32,
    local_tail: Vec3,
    local_tail_radius: f32,
    up_axis: Axis,
) -> (Vec3, CollisionStatus) {
    let z = up_axis.index();
    if local_tail[z] >= local_tail_radius {
        return (local_tail, CollisionStatus::NoCollision);
    }

    let mut new_tail = local_head;
    if local_head[z] + local_length <= local_tail_radius {
        // 整根骨骼埋在平面下
        new_tail[z] += local_length;
        return (new_tail, CollisionStatus::HeadEmbedded);
    }

    let x = (z + 1) % 3;
    let y = (z + 2) % 3;

    let height_above_radius = local_head[z] - local_tail_radius;
    let projection_length = (local_length * local_length - height_above_radius * height_above_radius)
        .max(0.0)
        .sqrt();
    let bone_vector = local_tail - local_head;
    let lateral = Vec2::new(bone_vector[x], bone_vector[y]);
    let lateral_length = lateral.length();
    if lateral_length > MIN_PROJECTION_LENGTH {
        let projection = lateral * (projection_length / lateral_length);
        new_tail[x] += projection.x;
        new_tail[y] += projection.y;
    }
    new_tail[z] = local_tail_radius;
    (new_tail, CollisionStatus::TailCollision)
}

/// 面板碰撞体（有界平面）
#[derive(Clone, Debug, PartialEq)]
pub struct PanelCollider {
    pub frame: Frame,
    pub width: f32,
    pub height: f32,
    pub enabled: bool,
}

impl PanelCollider {
    /// 由中心点和法线创建，面板的宽度轴由最短弧旋转确定
    pub fn new(origin: Vec3, normal: Vec3, width: f32, height: f32) -> Self {
        let normal = normal.try_normalize().unwrap_or(Vec3::Z);
        let rotation = Quat::from_rotation_arc(Vec3::Z, normal);
        Self::with_frame(Frame::new(origin, rotation), width, height)
    }

    pub fn with_frame(frame: Frame, width: f32, height: f32) -> Self {
        Self { frame, width, height, enabled: true }
    }

    /// 面板法线（世界空间）
    #[inline]
    pub fn normal(&self) -> Vec3 {
        self.frame.forward()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.enabled && self.width > 0.0 && self.height > 0.0 && self.frame.is_valid()
    }

    /// 本地点是否在（按半径扩展后的）矩形范围外
    fn out_of_bounds(&self, local: Vec3, local_radius: f32) -> bool {
        let half_width = 0.5 * self.width + local_radius;
        let half_height = 0.5 * self.height + local_radius;
        local.y <= -half_height
            || local.y >= half_height
            || local.x <= -half_width
            || local.x >= half_width
    }

    /// 修正尾端位置
    pub fn resolve(
        &self,
        head: Vec3,
        tail: Vec3,
        tail_radius: f32,
        length: f32,
    ) -> (Vec3, CollisionStatus) {
        if !self.is_active() {
            return (tail, CollisionStatus::NoCollision);
        }

        let local_head = self.frame.to_local_point(head);
        let local_tail = self.frame.to_local_point(tail);
        let local_length = self.frame.to_local_length(length);
        let local_tail_radius = self.frame.to_local_length(tail_radius);

        // 头尾都在矩形范围外时面板不参与
        if self.out_of_bounds(local_tail, local_tail_radius)
            && self.out_of_bounds(local_head, local_tail_radius)
        {
            return (tail, CollisionStatus::NoCollision);
        }

        let (new_local_tail, status) =
            resolve_aligned_plane(local_head, local_length, local_tail, local_tail_radius, Axis::Z);
        match status {
            CollisionStatus::NoCollision => (tail, status),
            _ => (self.frame.to_world_point(new_local_tail), status),
        }
    }

    /// 尾端投影到面板平面
    pub fn contact_point(&self, tail: Vec3) -> ContactPoint {
        let normal = self.normal();
        let offset = (tail - self.frame.translation).dot(normal);
        ContactPoint {
            position: tail - normal * offset,
            normal,
        }
    }

    /// 带半径的线段是否穿过面板矩形
    pub fn intersects_segment(&self, a: Vec3, b: Vec3, segment_radius: f32) -> bool {
        if !self.is_active() {
            return false;
        }
        let local_a = self.frame.to_local_point(a);
        let local_b = self.frame.to_local_point(b);
        let local_radius = self.frame.to_local_length(segment_radius);

        let (za, zb) = (local_a.z, local_b.z);
        // 两端在同一侧且都离平面超过半径
        if (za > local_radius && zb > local_radius) || (za < -local_radius && zb < -local_radius) {
            return false;
        }
        let dz = zb - za;
        let t = if dz.abs() > f32::EPSILON { (-za / dz).clamp(0.0, 1.0) } else { 0.0 };
        let crossing = local_a + (local_b - local_a) * t;
        !self.out_of_bounds(crossing, local_radius)
    }
}

/// 地面（与世界 XZ 平面平行）
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroundPlane {
    pub height: f32,
}

impl GroundPlane {
    pub fn new(height: f32) -> Self {
        Self { height }
    }

    /// 修正尾端位置，骨骼长度取当前头尾距离
    pub fn resolve(&self, head: Vec3, tail: Vec3, tail_radius: f32) -> (Vec3, CollisionStatus) {
        let length = (tail - head).length();
        let offset = Vec3::new(0.0, self.height, 0.0);
        let (new_tail, status) = resolve_aligned_plane(head - offset, length, tail - offset, tail_radius, Axis::Y);
        match status {
            CollisionStatus::NoCollision => (tail, status),
            _ => (new_tail + offset, status),
        }
    }

    pub fn contact_point(&self, tail: Vec3) -> ContactPoint {
        ContactPoint {
            position: Vec3::new(tail.x, self.height, tail.z),
            normal: Vec3::Y,
        }
    }
}
