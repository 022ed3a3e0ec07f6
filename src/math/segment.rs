//! 线段与圆 / 球的参数化相交
//!
//! 解 |A + t·AB - C|² = r² 的二次方程，参考 https://math.stackexchange.com/a/929240

use glam::{Vec2, Vec3};

fn solve_segment_quadratic(ca_dot_ab: f32, ca_sq: f32, ab_sq: f32, radius_sq: f32) -> Option<(f32, f32)> {
    // 退化线段
    if ab_sq <= f32::EPSILON {
        return None;
    }

    let discriminant = 4.0 * ca_dot_ab * ca_dot_ab - 4.0 * ab_sq * (ca_sq - radius_sq);
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let two_ca_ab = -2.0 * ca_dot_ab;
    let t_a = (two_ca_ab + root) / (2.0 * ab_sq);
    let t_b = (two_ca_ab - root) / (2.0 * ab_sq);
    Some((t_a.min(t_b), t_a.max(t_b)))
}

/// 二维线段 AB 与圆的相交参数 (t1, t2)，t1 ≤ t2
///
/// t 是直线参数，可能落在 [0, 1] 之外，由调用方判断是否在线段上。
pub fn line_segment_circle_intersection(
    circle_origin: Vec2,
    combined_radius: f32,
    segment_a: Vec2,
    segment_b: Vec2,
) -> Option<(f32, f32)> {
    let ca = segment_a - circle_origin;
    let ab = segment_b - segment_a;
    solve_segment_quadratic(
        ca.dot(ab),
        ca.length_squared(),
        ab.length_squared(),
        combined_radius * combined_radius,
    )
}

/// 三维线段 AB 与球的相交参数 (t1, t2)，t1 ≤ t2
pub fn line_segment_sphere_intersection(
    sphere_origin: Vec3,
    combined_radius: f32,
    segment_a: Vec3,
    segment_b: Vec3,
) -> Option<(f32, f32)> {
    let ca = segment_a - sphere_origin;
    let ab = segment_b - segment_a;
    solve_segment_quadratic(
        ca.dot(ab),
        ca.length_squared(),
        ab.length_squared(),
        combined_radius * combined_radius,
    )
}
