//! 胶囊体碰撞体
//!
//! 本地 Y 轴为胶囊轴，从原点到 (0, axis_length, 0)。
//! 分解为两个球形端帽和中间的圆柱段。

use glam::{Vec2, Vec3};

use crate::math::line_segment_circle_intersection;
use super::sphere::{local_segment_hits_sphere, resolve_local_sphere};
use super::{direction_or, CollisionStatus, ContactPoint, Frame, MIN_COLLIDER_RADIUS};

/// 胶囊体碰撞体
#[derive(Clone, Debug, PartialEq)]
pub struct CapsuleCollider {
    pub frame: Frame,
    /// 轴长（两端帽球心之间的距离，本地单位）
    pub axis_length: f32,
    pub radius: f32,
    pub enabled: bool,
}

impl CapsuleCollider {
    /// 竖直（世界 +Y）胶囊体
    pub fn new(origin: Vec3, axis_length: f32, radius: f32) -> Self {
        Self::with_frame(Frame::from_translation(origin), axis_length, radius)
    }

    pub fn with_frame(frame: Frame, axis_length: f32, radius: f32) -> Self {
        Self { frame, axis_length, radius, enabled: true }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.enabled && self.radius > MIN_COLLIDER_RADIUS && self.frame.is_valid()
    }

    /// 末端端帽球心（世界空间）
    pub fn end_cap_origin(&self) -> Vec3 {
        self.frame.to_world_point(Vec3::new(0.0, self.axis_length, 0.0))
    }

    /// 点是否在胶囊体内
    pub fn contains(&self, point: Vec3) -> bool {
        let local = self.frame.to_local_point(point);
        let axis_point = Vec3::new(0.0, local.y.clamp(0.0, self.axis_length.max(0.0)), 0.0);
        local.distance_squared(axis_point) <= self.radius * self.radius
    }

    /// 修正尾端位置
    pub fn resolve(&self, head: Vec3, tail: Vec3, tail_radius: f32) -> (Vec3, CollisionStatus) {
        if !self.is_active() {
            return (tail, CollisionStatus::NoCollision);
        }

        let local_head = self.frame.to_local_point(head);
        let local_tail = self.frame.to_local_point(tail);
        let local_tail_radius = self.frame.to_local_length(tail_radius);

        // 尾端投影落在轴段之外时按端帽球处理
        let above_top = local_tail.y >= self.axis_length;
        if local_tail.y <= 0.0 || above_top {
            let cap_origin = Vec3::new(0.0, if above_top { self.axis_length } else { 0.0 }, 0.0);
            let (new_local_tail, status) =
                resolve_local_sphere(local_head, local_tail, local_tail_radius, cap_origin, self.radius);
            return match status {
                CollisionStatus::NoCollision => (tail, status),
                _ => (self.frame.to_world_point(new_local_tail), status),
            };
        }

        self.resolve_cylinder(local_head, tail, local_tail, local_tail_radius)
    }

    /// 圆柱段：把尾端的径向分量推到合成半径上，保持轴向坐标
    fn resolve_cylinder(
        &self,
        local_head: Vec3,
        tail: Vec3,
        local_tail: Vec3,
        local_tail_radius: f32,
    ) -> (Vec3, CollisionStatus) {
        let origin_to_tail = Vec2::new(local_tail.x, local_tail.z);
        let combined_radius = self.radius + local_tail_radius;
        if origin_to_tail.length_squared() > combined_radius * combined_radius {
            return (tail, CollisionStatus::NoCollision);
        }

        let origin_to_head = Vec2::new(local_head.x, local_head.z);
        // 尾端恰在轴线上时沿头部的径向推出
        let normal = origin_to_tail
            .try_normalize()
            .or_else(|| origin_to_head.try_normalize())
            .unwrap_or(Vec2::X);
        let radial = normal * combined_radius;
        let new_local_tail = Vec3::new(radial.x, local_tail.y, radial.y);

        let status = if origin_to_head.length_squared() <= self.radius * self.radius {
            CollisionStatus::HeadEmbedded
        } else {
            CollisionStatus::TailCollision
        };
        (self.frame.to_world_point(new_local_tail), status)
    }

    /// 尾端对应的表面接触点
    pub fn contact_point(&self, tail: Vec3) -> ContactPoint {
        let local_tail = self.frame.to_local_point(tail);
        let axis_y = local_tail.y.clamp(0.0, self.axis_length.max(0.0));
        let axis_point = Vec3::new(0.0, axis_y, 0.0);
        let fallback = Vec3::new(local_tail.x, 0.0, local_tail.z);
        let local_normal = direction_or(local_tail - axis_point, direction_or(fallback, Vec3::X));
        ContactPoint {
            position: self.frame.to_world_point(axis_point + local_normal * self.radius),
            normal: self.frame.to_world_direction(local_normal),
        }
    }

    /// 带半径的线段是否与胶囊体相交
    pub fn intersects_segment(&self, a: Vec3, b: Vec3, segment_radius: f32) -> bool {
        if !self.is_active() {
            return false;
        }

        let local_a = self.frame.to_local_point(a);
        let local_b = self.frame.to_local_point(b);
        let combined_radius = self.radius + self.frame.to_local_length(segment_radius);

        let end_origin = Vec3::new(0.0, self.axis_length, 0.0);
        if local_segment_hits_sphere(local_a, local_b, combined_radius, Vec3::ZERO)
            || local_segment_hits_sphere(local_a, local_b, combined_radius, end_origin)
        {
            return true;
        }

        matches!(
            cylinder_intersection(local_a, local_b, combined_radius),
            Some(point) if point.y > 0.0 && point.y < self.axis_length
        )
    }
}

/// 线段与无限圆柱（本地 Y 轴）的第一个交点
fn cylinder_intersection(local_fixed: Vec3, local_moving: Vec3, combined_radius: f32) -> Option<Vec3> {
    let projected_fixed = Vec2::new(local_fixed.x, local_fixed.z);
    let projected_moving = Vec2::new(local_moving.x, local_moving.z);
    let (t1, t2) = line_segment_circle_intersection(Vec2::ZERO, combined_radius, projected_fixed, projected_moving)?;
    if t1 >= 1.0 || t2 <= 0.0 {
        return None;
    }
    Some(local_fixed + (local_moving - local_fixed) * t1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collider::SphereCollider;
    use glam::Quat;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_cylinder_pushes_radially() {
        let capsule = CapsuleCollider::new(Vec3::ZERO, 2.0, 0.5);
        let head = Vec3::new(1.5, 1.5, 0.0);
        let tail = Vec3::new(0.3, 1.0, 0.1);
        let (p, status) = capsule.resolve(head, tail, 0.1);
        assert_eq!(status, CollisionStatus::TailCollision);
        assert!((Vec2::new(p.x, p.z).length() - 0.6).abs() < EPS);
        // 轴向坐标不变
        assert!((p.y - 1.0).abs() < EPS);
    }

    #[test]
    fn test_cylinder_head_embedded() {
        let capsule = CapsuleCollider::new(Vec3::ZERO, 2.0, 0.5);
        let head = Vec3::new(0.1, 1.5, 0.0);
        let tail = Vec3::new(0.3, 1.0, 0.0);
        let (p, status) = capsule.resolve(head, tail, 0.0);
        assert_eq!(status, CollisionStatus::HeadEmbedded);
        assert!((p - Vec3::new(0.5, 1.0, 0.0)).length() < EPS);
    }

    #[test]
    fn test_end_caps() {
        let capsule = CapsuleCollider::new(Vec3::ZERO, 2.0, 0.5);
        // 顶部端帽
        let (p, status) = capsule.resolve(Vec3::new(0.0, 4.0, 0.0), Vec3::new(0.1, 2.3, 0.0), 0.0);
        assert_eq!(status, CollisionStatus::TailCollision);
        assert!(((p - capsule.end_cap_origin()).length() - 0.5).abs() < EPS);

        // 底部端帽
        let (p, status) = capsule.resolve(Vec3::new(0.0, -2.0, 0.0), Vec3::new(0.1, -0.2, 0.0), 0.0);
        assert_eq!(status, CollisionStatus::TailCollision);
        assert!((p.length() - 0.5).abs() < EPS);
    }

    #[test]
    fn test_zero_length_matches_sphere() {
        let frame = Frame::new(Vec3::new(0.5, 1.0, -0.5), Quat::from_rotation_x(0.4));
        let capsule = CapsuleCollider::with_frame(frame, 0.0, 0.7);
        let sphere = SphereCollider::with_frame(frame, 0.7);

        let cases = [
            (Vec3::new(0.5, 3.0, -0.5), Vec3::new(0.6, 1.2, -0.4), 0.05),
            (Vec3::new(0.6, 1.1, -0.5), Vec3::new(0.9, 1.3, -0.2), 0.1),
            (Vec3::new(2.0, 2.0, 2.0), Vec3::new(3.0, 3.0, 3.0), 0.0),
            (Vec3::new(-1.0, 0.0, -0.5), Vec3::new(0.3, 0.6, -0.5), 0.2),
        ];
        for (head, tail, r) in cases {
            assert_eq!(capsule.resolve(head, tail, r), sphere.resolve(head, tail, r));
        }
    }

    #[test]
    fn test_tiny_radius_is_inert() {
        let capsule = CapsuleCollider::new(Vec3::ZERO, 1.0, 0.00005);
        let tail = Vec3::new(0.0, 0.5, 0.0);
        assert_eq!(capsule.resolve(Vec3::new(1.0, 0.5, 0.0), tail, 0.1), (tail, CollisionStatus::NoCollision));
    }

    #[test]
    fn test_contains_and_segment() {
        let capsule = CapsuleCollider::new(Vec3::ZERO, 2.0, 0.5);
        assert!(capsule.contains(Vec3::new(0.2, 1.0, 0.2)));
        assert!(capsule.contains(Vec3::new(0.0, 2.4, 0.0)));
        assert!(!capsule.contains(Vec3::new(0.0, 2.6, 0.0)));

        // 横穿圆柱段
        assert!(capsule.intersects_segment(Vec3::new(-2.0, 1.0, 0.0), Vec3::new(2.0, 1.0, 0.0), 0.0));
        // 横穿顶部端帽
        assert!(capsule.intersects_segment(Vec3::new(-2.0, 2.3, 0.0), Vec3::new(2.0, 2.3, 0.0), 0.0));
        // 完全在外
        assert!(!capsule.intersects_segment(Vec3::new(-2.0, 1.0, 1.0), Vec3::new(2.0, 1.0, 1.0), 0.0));
    }
}
