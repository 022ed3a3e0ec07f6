//! 球体碰撞体

use glam::Vec3;

use crate::math::{circle_tangent_points, line_segment_sphere_intersection, project_onto, sphere_sphere_intersection};
use super::{direction_or, CollisionStatus, ContactPoint, Frame, MIN_COLLIDER_RADIUS};

/// 切点离固定端过近时不再绕行
const MIN_TANGENT_DISTANCE_SQR: f32 = 0.01;

/// 球体碰撞体
#[derive(Clone, Debug, PartialEq)]
pub struct SphereCollider {
    /// 球心所在坐标系
    pub frame: Frame,
    /// 半径（本地单位）
    pub radius: f32,
    pub enabled: bool,
}

impl SphereCollider {
    pub fn new(origin: Vec3, radius: f32) -> Self {
        Self::with_frame(Frame::from_translation(origin), radius)
    }

    pub fn with_frame(frame: Frame, radius: f32) -> Self {
        Self { frame, radius, enabled: true }
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.frame.translation
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.enabled && self.radius > MIN_COLLIDER_RADIUS && self.frame.is_valid()
    }

    /// 点是否在球内
    pub fn contains(&self, point: Vec3) -> bool {
        let local = self.frame.to_local_point(point);
        local.length_squared() <= self.radius * self.radius
    }

    /// 修正尾端位置
    pub fn resolve(&self, head: Vec3, tail: Vec3, tail_radius: f32) -> (Vec3, CollisionStatus) {
        if !self.is_active() {
            return (tail, CollisionStatus::NoCollision);
        }

        let local_head = self.frame.to_local_point(head);
        let local_tail = self.frame.to_local_point(tail);
        let local_tail_radius = self.frame.to_local_length(tail_radius);

        let (new_local_tail, status) =
            resolve_local_sphere(local_head, local_tail, local_tail_radius, Vec3::ZERO, self.radius);
        match status {
            CollisionStatus::NoCollision => (tail, status),
            _ => (self.frame.to_world_point(new_local_tail), status),
        }
    }

    /// 尾端对应的表面接触点
    pub fn contact_point(&self, tail: Vec3) -> ContactPoint {
        let local_normal = direction_or(self.frame.to_local_point(tail), Vec3::Y);
        ContactPoint {
            position: self.frame.to_world_point(local_normal * self.radius),
            normal: self.frame.to_world_direction(local_normal),
        }
    }

    /// 带半径的线段是否与球相交
    pub fn intersects_segment(&self, a: Vec3, b: Vec3, segment_radius: f32) -> bool {
        if !self.is_active() {
            return false;
        }
        local_segment_hits_sphere(
            self.frame.to_local_point(a),
            self.frame.to_local_point(b),
            self.radius + self.frame.to_local_length(segment_radius),
            Vec3::ZERO,
        )
    }

    /// 线段碰撞：让活动端绕过球体
    ///
    /// 活动端沿固定端到切点的方向重新放置，保持线段长度。
    /// 固定端在合成球内时无法求切点，返回 HeadEmbedded 且不修改位置。
    pub fn resolve_segment(&self, fixed: Vec3, mover: Vec3, segment_radius: f32) -> (Vec3, CollisionStatus) {
        if !self.intersects_segment(fixed, mover, segment_radius) {
            return (mover, CollisionStatus::NoCollision);
        }

        let Some(tangent) = self.find_tangent_point(fixed, mover, segment_radius) else {
            return (mover, CollisionStatus::HeadEmbedded);
        };

        let fixed_to_tangent = tangent - fixed;
        if fixed_to_tangent.length_squared() > MIN_TANGENT_DISTANCE_SQR {
            let original_length = (mover - fixed).length();
            return (fixed + fixed_to_tangent.normalize() * original_length, CollisionStatus::TailCollision);
        }
        (mover, CollisionStatus::TailCollision)
    }

    /// 从固定端出发、离活动端最近的切点（世界空间）
    fn find_tangent_point(&self, fixed: Vec3, mover: Vec3, segment_radius: f32) -> Option<Vec3> {
        let fixed_point = self.frame.to_local_point(fixed);
        let moving_point = self.frame.to_local_point(mover);
        let combined_radius = self.radius + self.frame.to_local_length(segment_radius);

        let distance = fixed_point.length();
        let (ta, tb) = circle_tangent_points(distance, combined_radius)?;

        // 切线所在平面：x 轴指向固定端，y 轴为活动端方向去掉 x 分量
        let x_axis = fixed_point / distance;
        let fixed_to_moving = moving_point - fixed_point;
        let y_axis = direction_or(fixed_to_moving - project_onto(fixed_to_moving, x_axis), x_axis.any_orthonormal_vector());

        let tangent_a = x_axis * ta.x + y_axis * ta.y;
        let tangent_b = x_axis * tb.x + y_axis * tb.y;
        let local_tangent = if tangent_a.distance_squared(moving_point) < tangent_b.distance_squared(moving_point) {
            tangent_a
        } else {
            tangent_b
        };
        Some(self.frame.to_world_point(local_tangent))
    }
}

/// 本地空间的球体碰撞（球体和胶囊端帽共用）
pub(crate) fn resolve_local_sphere(
    local_head: Vec3,
    local_tail: Vec3,
    local_tail_radius: f32,
    sphere_origin: Vec3,
    sphere_radius: f32,
) -> (Vec3, CollisionStatus) {
    let combined_radius = sphere_radius + local_tail_radius;
    let origin_to_tail = local_tail - sphere_origin;
    if origin_to_tail.length_squared() >= combined_radius * combined_radius {
        return (local_tail, CollisionStatus::NoCollision);
    }

    let origin_to_head = local_head - sphere_origin;
    if origin_to_head.length_squared() <= sphere_radius * sphere_radius {
        // 头部在球内，只能把尾端沿径向推出
        let direction = direction_or(origin_to_tail, direction_or(origin_to_head, Vec3::Y));
        return (sphere_origin + direction * combined_radius, CollisionStatus::HeadEmbedded);
    }

    // 以头部为球心、骨骼长度为半径的球与合成球求交，取交线圆上离原尾端最近的点
    let head_radius = (local_tail - local_head).length();
    let new_tail = match sphere_sphere_intersection(local_head, head_radius, sphere_origin, combined_radius) {
        Some(intersection) => intersection.project_point(local_tail),
        None => local_tail,
    };
    (new_tail, CollisionStatus::TailCollision)
}

pub(crate) fn local_segment_hits_sphere(a: Vec3, b: Vec3, combined_radius: f32, origin: Vec3) -> bool {
    matches!(
        line_segment_sphere_intersection(origin, combined_radius, a, b),
        Some((t1, t2)) if t1 <= 1.0 && t2 >= 0.0
    )
}
