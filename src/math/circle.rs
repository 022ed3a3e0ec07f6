//! 三维圆与球-球相交
//!
//! 参考 http://mathworld.wolfram.com/Sphere-SphereIntersection.html

use glam::{Vec2, Vec3};

/// 三维空间中的圆
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle3 {
    /// 圆心
    pub origin: Vec3,
    /// 圆所在平面的法线（单位向量）
    pub up: Vec3,
    /// 半径
    pub radius: f32,
}

impl Circle3 {
    /// 圆上距离 point 最近的点
    ///
    /// 先投影到圆所在平面，再沿径向投到圆周上。
    /// point 恰好位于圆心轴线上时任取一个径向。
    pub fn project_point(&self, point: Vec3) -> Vec3 {
        let on_plane = point - self.up * self.up.dot(point - self.origin);
        let radial = on_plane - self.origin;
        let direction = if radial.length_squared() > 1e-12 {
            radial.normalize()
        } else {
            self.up.any_orthonormal_vector()
        };
        self.origin + direction * self.radius
    }
}

/// 计算两个球面的相交圆
///
/// 以 A 为原点、B 位于 (d, 0, 0) 推导：
/// x = (d² - rB² + rA²) / 2d，相交圆半径由勾股关系得出。
/// 球心重合（d ≤ 0）时返回 None。两球不相交时半径退化为 0（切点）。
pub fn sphere_sphere_intersection(
    origin_a: Vec3,
    radius_a: f32,
    origin_b: Vec3,
    radius_b: f32,
) -> Option<Circle3> {
    let a_to_b = origin_b - origin_a;
    let d_sq = a_to_b.length_squared();
    let d = d_sq.sqrt();
    if d <= 0.0 {
        return None;
    }

    let radius_a_sq = radius_a * radius_a;
    let radius_b_sq = radius_b * radius_b;

    let denominator = 0.5 / d;
    let sub_term = d_sq - radius_b_sq + radius_a_sq;
    let x = sub_term * denominator;
    let radicand = (4.0 * d_sq * radius_a_sq - sub_term * sub_term).max(0.0);
    let radius = radicand.sqrt() * denominator;

    let up = a_to_b / d;
    Some(Circle3 {
        origin: origin_a + up * x,
        up,
        radius,
    })
}

/// 求过圆外一点的两条切线的切点
///
/// 圆心在原点，点位于本地 x 轴上距圆心 distance_to_center 处。
/// 点在圆内（distance_to_center ≤ radius）时返回 None。
pub fn circle_tangent_points(distance_to_center: f32, radius: f32) -> Option<(Vec2, Vec2)> {
    if distance_to_center <= radius {
        return None;
    }
    let cos = radius / distance_to_center;
    let sin = (1.0 - cos * cos).max(0.0).sqrt();
    Some((
        Vec2::new(cos, sin) * radius,
        Vec2::new(cos, -sin) * radius,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_intersection_concentric_is_none() {
        assert!(sphere_sphere_intersection(Vec3::ONE, 1.0, Vec3::ONE, 2.0).is_none());
    }

    #[test]
    fn test_intersection_points_lie_on_both_spheres() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(1.2, 0.3, -0.4);
        let (ra, rb) = (1.0, 0.8);
        let circle = sphere_sphere_intersection(a, ra, b, rb).unwrap();

        let side1 = circle.up.any_orthonormal_vector();
        let side2 = circle.up.cross(side1);
        for i in 0..12 {
            let t = i as f32 / 12.0 * std::f32::consts::TAU;
            let p = circle.origin + (side1 * t.cos() + side2 * t.sin()) * circle.radius;
            assert!(((p - a).length() - ra).abs() < EPS);
            assert!(((p - b).length() - rb).abs() < EPS);
        }
    }

    #[test]
    fn test_disjoint_spheres_degenerate_to_point() {
        let circle = sphere_sphere_intersection(Vec3::ZERO, 1.0, Vec3::new(5.0, 0.0, 0.0), 1.0).unwrap();
        assert!(circle.radius.is_finite());
        assert_eq!(circle.radius, 0.0);
    }

    #[test]
    fn test_project_point_onto_circle() {
        let circle = Circle3 { origin: Vec3::new(0.0, 1.0, 0.0), up: Vec3::Y, radius: 2.0 };
        let p = circle.project_point(Vec3::new(5.0, 7.0, 0.0));
        assert!((p - Vec3::new(2.0, 1.0, 0.0)).length() < EPS);

        // 轴线上的点也落在圆周上
        let q = circle.project_point(Vec3::new(0.0, 3.0, 0.0));
        assert!(((q - circle.origin).length() - 2.0).abs() < EPS);
        assert!((q.y - 1.0).abs() < EPS);
    }

    #[test]
    fn test_tangent_points() {
        assert!(circle_tangent_points(0.5, 1.0).is_none());
        assert!(circle_tangent_points(1.0, 1.0).is_none());

        let (ta, tb) = circle_tangent_points(2.0, 1.0).unwrap();
        let p = Vec2::new(2.0, 0.0);
        for t in [ta, tb] {
            assert!((t.length() - 1.0).abs() < EPS);
            // 切线与半径垂直
            assert!((p - t).dot(t).abs() < EPS);
        }
        assert!((ta.y + tb.y).abs() < EPS);
    }
}
