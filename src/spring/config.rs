//! Spring Bone 配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。
//! SpringManager 在创建时读取一次快照，之后可以单独覆盖。

use glam::Vec3;
use once_cell::sync::Lazy;
use std::sync::RwLock;

use crate::{Result, SpringError};

/// Spring Bone 配置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct SpringConfig {
    // ========== 模拟参数 ==========
    /// 模拟帧率，默认 60
    /// ≤ 0 时使用每帧实际经过的时间
    pub simulation_fps: f32,
    /// 动画骨骼的物理混合比例，默认 0.5
    /// 0.0 = 完全跟随动画，1.0 = 完全物理
    pub dynamic_ratio: f32,

    // ========== 重力 ==========
    /// 重力，默认 (0, -10, 0)
    pub gravity: Vec3,

    // ========== 地面碰撞 ==========
    /// 是否与地面碰撞，默认 true
    pub collide_with_ground: bool,
    /// 地面高度，默认 0
    pub ground_height: f32,
    /// 地面接触后骨骼长度的最小比例，默认 0.5
    pub ground_min_length_ratio: f32,

    // ========== 约束 ==========
    /// 碰撞后跳过地面检测的帧数，默认 5
    /// 防止在碰撞体与地面之间来回振荡
    pub collision_cooldown_frames: u32,
    /// 长度限制的弹簧系数，默认 0.5
    pub length_limit_spring_constant: f32,

    // ========== 并行 ==========
    /// 多个角色之间是否并行步进，默认 true
    pub parallel_characters: bool,

    // ========== 调试 ==========
    /// 是否记录碰撞接触点，默认 false
    pub record_collisions: bool,
    /// 是否输出调试日志，默认 false
    pub debug_log: bool,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            // ====== 模拟参数 ======
            // 固定步长，与渲染帧率无关
            simulation_fps: 60.0,
            dynamic_ratio: 0.5,

            // ====== 重力 ======
            gravity: Vec3::new(0.0, -10.0, 0.0),

            // ====== 地面碰撞 ======
            collide_with_ground: true,
            ground_height: 0.0,
            ground_min_length_ratio: 0.5,

            // ====== 约束 ======
            collision_cooldown_frames: 5,
            length_limit_spring_constant: 0.5,

            // ====== 并行 ======
            parallel_characters: true,

            // ====== 调试 ======
            record_collisions: false,
            debug_log: false,
        }
    }
}

impl SpringConfig {
    /// 校验参数范围
    pub fn validate(&self) -> Result<()> {
        if !self.simulation_fps.is_finite() {
            return Err(SpringError::InvalidConfig(format!(
                "simulation_fps must be finite, got {}",
                self.simulation_fps
            )));
        }
        if !(0.0..=1.0).contains(&self.dynamic_ratio) {
            return Err(SpringError::InvalidConfig(format!(
                "dynamic_ratio must be in [0, 1], got {}",
                self.dynamic_ratio
            )));
        }
        if !self.gravity.is_finite() {
            return Err(SpringError::InvalidConfig("gravity must be finite".to_string()));
        }
        if !(0.0..=1.0).contains(&self.ground_min_length_ratio) {
            return Err(SpringError::InvalidConfig(format!(
                "ground_min_length_ratio must be in [0, 1], got {}",
                self.ground_min_length_ratio
            )));
        }
        Ok(())
    }

    /// 本帧的步长
    #[inline]
    pub fn time_step(&self, delta_time: f32) -> f32 {
        if self.simulation_fps > 0.0 {
            1.0 / self.simulation_fps
        } else {
            delta_time
        }
    }
}

/// 全局配置实例
static SPRING_CONFIG: Lazy<RwLock<SpringConfig>> = Lazy::new(|| {
    RwLock::new(SpringConfig::default())
});

/// 获取当前配置（只读）
pub fn get_config() -> SpringConfig {
    SPRING_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: SpringConfig) -> Result<()> {
    config.validate()?;
    *SPRING_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
    Ok(())
}

/// 重置为默认配置
pub fn reset_config() {
    *SPRING_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = SpringConfig::default();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SpringConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_dynamic_ratio() {
        let config = SpringConfig { dynamic_ratio: 1.5, ..SpringConfig::default() };
        assert!(matches!(config.validate(), Err(SpringError::InvalidConfig(_))));
    }

    #[test]
    fn test_time_step() {
        let mut config = SpringConfig::default();
        assert!((config.time_step(0.1) - 1.0 / 60.0).abs() < 1e-7);
        config.simulation_fps = 0.0;
        assert!((config.time_step(0.1) - 0.1).abs() < 1e-7);
    }
}
