//! 几何内核
//!
//! 纯数学函数，无状态。碰撞体与角度限制都建立在这里的公式之上。

mod circle;
mod segment;

pub use circle::{Circle3, circle_tangent_points, sphere_sphere_intersection};
pub use segment::{line_segment_circle_intersection, line_segment_sphere_intersection};

use glam::Vec3;
#[cfg(test)]
use glam::Quat;

/// 在 (side, forward) 平面内按角度（度）构造方向向量
///
/// 0° 对应 forward，+90° 对应 side。
#[inline]
pub fn angle_vector(side: Vec3, forward: Vec3, degrees: f32) -> Vec3 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    side * sin + forward * cos
}

/// 向量在 axis 上的投影
#[inline]
pub fn project_onto(v: Vec3, axis: Vec3) -> Vec3 {
    let len_sq = axis.length_squared();
    if len_sq <= f32::EPSILON {
        return Vec3::ZERO;
    }
    axis * (v.dot(axis) / len_sq)
}

/// 两个旋转的差（先对齐符号，q 与 -q 视为同一旋转）
///
/// `Quat::angle_between` 经过 acos，接近 0 时在 f32 下有约 1e-3 的下限，测试里用它比较。
#[cfg(test)]
pub(crate) fn rotation_distance(a: Quat, b: Quat) -> f32 {
    let b = if a.dot(b) < 0.0 { -b } else { b };
    (a - b).length()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_vector_axes() {
        let side = Vec3::X;
        let forward = Vec3::Z;
        assert!((angle_vector(side, forward, 0.0) - forward).length() < 1e-6);
        assert!((angle_vector(side, forward, 90.0) - side).length() < 1e-6);
        assert!((angle_vector(side, forward, -90.0) + side).length() < 1e-6);
    }

    #[test]
    fn test_project_onto_degenerate_axis() {
        assert_eq!(project_onto(Vec3::ONE, Vec3::ZERO), Vec3::ZERO);
        let p = project_onto(Vec3::new(2.0, 3.0, 0.0), Vec3::new(0.0, 5.0, 0.0));
        assert!((p - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_rotation_distance() {
        let q = Quat::from_rotation_y(0.7);
        assert_eq!(rotation_distance(q, q), 0.0);
        assert!(rotation_distance(q, -q) < 1e-7);
        // 小角度 θ 时约为 θ / 2
        let d = rotation_distance(Quat::IDENTITY, Quat::from_rotation_x(1e-3));
        assert!((d - 5e-4).abs() < 1e-6);
    }
}
