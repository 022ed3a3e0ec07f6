//! 角度限制
//!
//! 在 pivot 的 (side, up, forward) 基下约束骨骼方向：
//! 先用软弹簧把角度拉向 0，再硬夹到 [min, max]。

use glam::Vec3;

use crate::math::{angle_vector, project_onto};

/// 投影长度低于此值时不做约束（方向不确定）
const MIN_PROJECTION_LENGTH: f32 = 1e-6;

/// 单轴角度限制（度）
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AngleLimits {
    pub active: bool,
    /// 下限，[-180, 0]
    pub min: f32,
    /// 上限，[0, 180]
    pub max: f32,
}

impl AngleLimits {
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            active: true,
            min: min.clamp(-180.0, 0.0),
            max: max.clamp(0.0, 180.0),
        }
    }

    /// 上下限均为有限值且 min <= max
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    pub fn copy_to(&self, target: &mut AngleLimits) {
        *target = *self;
    }

    /// 约束向量
    ///
    /// 返回修正后的向量，以及硬限制是否改变了软弹簧之后的角度。
    /// 上下限无效时原样返回。
    pub fn constrain(
        &self,
        side: Vec3,
        up: Vec3,
        forward: Vec3,
        stiffness: f32,
        dt: f32,
        vector: Vec3,
    ) -> (Vec3, bool) {
        if !self.is_valid() {
            return (vector, false);
        }

        let up_projection = project_onto(vector, up);
        let projection = vector - up_projection;
        let projection_length = projection.length();
        if projection_length <= MIN_PROJECTION_LENGTH {
            return (vector, false);
        }

        // 浮点误差可能让 sin 略超出 [-1, 1]
        let sine = (projection / projection_length).dot(side).clamp(-1.0, 1.0);

        let mut angle = sine.asin().to_degrees();
        angle += -angle * stiffness * dt * dt;

        let spring_angle = angle;
        let angle = angle.clamp(self.min, self.max);

        let new_projection = angle_vector(side, forward, angle) * projection_length;
        (new_projection + up_projection, angle != spring_angle)
    }
}
