//! 骨链调度器
//!
//! 持有一个角色的全部 SpringBone，按层级深度升序排列（父先于子）。
//! 每帧计算一次步长，依次对每根骨骼执行完整的单步流程。
//! 子骨骼积分时读取的父朝向必须是本帧已写回的物理旋转，
//! 因此深度顺序是正确性要求。

use std::collections::HashSet;

use glam::Vec3;

use crate::collider::{ColliderSet, CollisionLog, GroundPlane};
use crate::skeleton::PoseTable;
use crate::{Result, SpringError};
use super::{get_config, SpringBone, SpringBoneSettings, SpringConfig, StepFlags, StepParams};

/// 骨链调度器
#[derive(Clone, Debug)]
pub struct SpringManager {
    bones: Vec<SpringBone>,
    /// 与 bones 一一对应
    animated: Vec<bool>,
    config: SpringConfig,
    log: CollisionLog,
}

impl SpringManager {
    /// 使用全局配置快照创建
    pub fn build<P: PoseTable + ?Sized>(
        pose: &P,
        colliders: &ColliderSet,
        settings: Vec<SpringBoneSettings>,
    ) -> Result<Self> {
        Self::build_with_config(pose, colliders, settings, get_config())
    }

    /// 使用指定配置创建
    ///
    /// 没有有效子节点的骨骼会被跳过（无可模拟内容），其余配置错误直接返回。
    pub fn build_with_config<P: PoseTable + ?Sized>(
        pose: &P,
        colliders: &ColliderSet,
        settings: Vec<SpringBoneSettings>,
        config: SpringConfig,
    ) -> Result<Self> {
        config.validate()?;
        colliders.validate(pose)?;

        let mut bones = Vec::with_capacity(settings.len());
        let mut seen = HashSet::with_capacity(settings.len());
        for bone_settings in &settings {
            if let Some(&id) = bone_settings.colliders.iter().find(|&&id| id >= colliders.len()) {
                return Err(SpringError::ColliderOutOfRange(id));
            }

            let bone = match SpringBone::new(bone_settings, pose) {
                Ok(bone) => bone,
                Err(SpringError::NoValidChild(name)) => {
                    log::warn!("[SpringManager] 骨骼 '{}' 没有有效子节点，跳过", name);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !seen.insert(bone.node()) {
                return Err(SpringError::DuplicateBone(bone.name().to_string()));
            }
            bones.push(bone);
        }

        // 稳定排序：同深度保持输入顺序
        bones.sort_by_key(|bone| pose.depth(bone.node()));

        let collider_refs: usize = bones.iter().map(|b| b.colliders.len()).sum();
        log::info!(
            "[SpringManager] 构建完成: {} 骨骼 (跳过 {}), {} 碰撞体, {} 碰撞引用, FPS={}",
            bones.len(),
            settings.len() - bones.len(),
            colliders.len(),
            collider_refs,
            config.simulation_fps
        );

        let log = CollisionLog::new(config.record_collisions);
        Ok(Self {
            animated: vec![false; bones.len()],
            bones,
            config,
            log,
        })
    }

    // ========== 访问器 ==========

    /// 按深度排序后的骨骼
    pub fn bones(&self) -> &[SpringBone] {
        &self.bones
    }

    pub fn bones_mut(&mut self) -> &mut [SpringBone] {
        &mut self.bones
    }

    pub fn find_bone(&self, name: &str) -> Option<&SpringBone> {
        self.bones.iter().find(|b| b.name() == name)
    }

    pub fn is_animated(&self, index: usize) -> bool {
        self.animated.get(index).copied().unwrap_or(false)
    }

    pub fn config(&self) -> &SpringConfig {
        &self.config
    }

    pub fn collision_log(&self) -> &CollisionLog {
        &self.log
    }

    // ========== 参数覆盖 ==========

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
    }

    pub fn set_ground(&mut self, collide_with_ground: bool, height: f32) {
        self.config.collide_with_ground = collide_with_ground;
        self.config.ground_height = height;
    }

    pub fn set_simulation_fps(&mut self, fps: f32) -> Result<()> {
        let config = SpringConfig { simulation_fps: fps, ..self.config.clone() };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_dynamic_ratio(&mut self, ratio: f32) -> Result<()> {
        let config = SpringConfig { dynamic_ratio: ratio, ..self.config.clone() };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_record_collisions(&mut self, enabled: bool) {
        self.config.record_collisions = enabled;
        self.log.set_enabled(enabled);
    }

    /// 标记受动画驱动的骨骼（按名称），可按动画切换调用
    pub fn update_bone_is_animated_states<S: AsRef<str>>(&mut self, animated_bone_names: &[S]) {
        for (bone, animated) in self.bones.iter().zip(self.animated.iter_mut()) {
            *animated = animated_bone_names.iter().any(|name| name.as_ref() == bone.name());
        }
    }

    // ========== 每帧 ==========

    fn step_params(&self, delta_time: f32) -> StepParams {
        let ground = self
            .config
            .collide_with_ground
            .then(|| GroundPlane::new(self.config.ground_height));
        StepParams {
            dt: self.config.time_step(delta_time),
            external_force: self.config.gravity,
            ground,
            dynamic_ratio: 1.0,
            cooldown_frames: self.config.collision_cooldown_frames,
            length_limit_spring_constant: self.config.length_limit_spring_constant,
            ground_min_length_ratio: self.config.ground_min_length_ratio,
        }
    }

    /// 推进一帧
    ///
    /// 先按姿态同步挂载碰撞体，之后碰撞体在本帧内只读。
    pub fn update<P: PoseTable + ?Sized>(&mut self, pose: &mut P, colliders: &mut ColliderSet, delta_time: f32) {
        colliders.sync_with_pose(&*pose);
        self.step(pose, colliders, delta_time);
    }

    /// 推进一帧（碰撞体已由调用方同步）
    pub fn step<P: PoseTable + ?Sized>(&mut self, pose: &mut P, colliders: &ColliderSet, delta_time: f32) {
        self.log.clear();
        let base = self.step_params(delta_time);
        if !(base.dt > 0.0) {
            return;
        }

        for (bone, &animated) in self.bones.iter_mut().zip(&self.animated) {
            let params = StepParams {
                dynamic_ratio: if animated { self.config.dynamic_ratio } else { 1.0 },
                ..base
            };
            bone.step(&mut *pose, colliders, &params, animated, &mut self.log);
        }

        if self.config.debug_log {
            let collided = self.bones.iter().filter(|b| b.flags().contains(StepFlags::COLLIDED)).count();
            log::debug!(
                "[SpringManager] dt={:.4}, {} 骨骼, {} 碰撞, {} 记录",
                base.dt,
                self.bones.len(),
                collided,
                self.log.records().len()
            );
        }
    }

    /// 全部骨骼回到静止位置
    pub fn reset<P: PoseTable + ?Sized>(&mut self, pose: &P) {
        for bone in &mut self.bones {
            bone.reset(pose);
        }
        self.log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collider::SphereCollider;
    use crate::math::rotation_distance;
    use crate::skeleton::{NodeId, Skeleton};
    use crate::spring::AngleLimits;
    use glam::Quat;

    const EPS: f32 = 1e-4;

    fn test_config() -> SpringConfig {
        SpringConfig {
            collide_with_ground: false,
            ..SpringConfig::default()
        }
    }

    /// root → a(0,2,0) → b(+1,0,0) → c(+1,0,0) → end(+1,0,0)，水平骨链
    fn horizontal_chain() -> (Skeleton, Vec<NodeId>) {
        let mut s = Skeleton::new();
        let root = s.add_node("root", None, Vec3::ZERO, Quat::IDENTITY).unwrap();
        let a = s.add_node("a", Some(root), Vec3::new(0.0, 2.0, 0.0), Quat::IDENTITY).unwrap();
        let b = s.add_node("b", Some(a), Vec3::X, Quat::IDENTITY).unwrap();
        let c = s.add_node("c", Some(b), Vec3::X, Quat::IDENTITY).unwrap();
        s.add_node("end", Some(c), Vec3::X, Quat::IDENTITY).unwrap();
        (s, vec![a, b, c])
    }

    fn build(s: &Skeleton, colliders: &ColliderSet, nodes: &[NodeId], config: SpringConfig) -> SpringManager {
        let settings = nodes.iter().map(|&n| SpringBoneSettings::new(n)).collect();
        SpringManager::build_with_config(s, colliders, settings, config).unwrap()
    }

    #[test]
    fn test_bones_sorted_parent_first() {
        let (s, nodes) = horizontal_chain();
        let reversed: Vec<NodeId> = nodes.iter().rev().copied().collect();
        let manager = build(&s, &ColliderSet::new(), &reversed, test_config());
        let order: Vec<NodeId> = manager.bones().iter().map(|b| b.node()).collect();
        assert_eq!(order, nodes);
    }

    #[test]
    fn test_input_order_does_not_change_result() {
        let (mut s1, nodes) = horizontal_chain();
        let (mut s2, _) = horizontal_chain();
        let reversed: Vec<NodeId> = nodes.iter().rev().copied().collect();
        let mut c1 = ColliderSet::new();
        let mut c2 = ColliderSet::new();
        let mut m1 = build(&s1, &c1, &nodes, test_config());
        let mut m2 = build(&s2, &c2, &reversed, test_config());

        for _ in 0..30 {
            m1.update(&mut s1, &mut c1, 1.0 / 60.0);
            m2.update(&mut s2, &mut c2, 1.0 / 60.0);
        }
        for &n in &nodes {
            assert!(rotation_distance(s1.local_rotation(n), s2.local_rotation(n)) < 1e-6);
        }
    }

    #[test]
    fn test_gravity_droops_chain() {
        let (mut s, nodes) = horizontal_chain();
        let mut colliders = ColliderSet::new();
        let mut manager = build(&s, &colliders, &nodes, test_config());
        let end_before = s.world_position(4);

        for _ in 0..60 {
            manager.update(&mut s, &mut colliders, 1.0 / 60.0);
        }
        let end_after = s.world_position(4);
        assert!(end_after.y < end_before.y - 0.01);
        // 刚性杆：每段长度不变
        for bone in manager.bones() {
            let head = s.world_position(bone.node());
            assert!(((bone.current_tip() - head).length() - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn test_animated_bone_keeps_animation_at_zero_ratio() {
        let (mut s, nodes) = horizontal_chain();
        let mut colliders = ColliderSet::new();
        let config = SpringConfig { dynamic_ratio: 0.0, ..test_config() };
        let mut manager = build(&s, &colliders, &nodes, config);
        manager.update_bone_is_animated_states(&["a"]);
        assert!(manager.is_animated(0));
        assert!(!manager.is_animated(1));

        for _ in 0..30 {
            manager.update(&mut s, &mut colliders, 1.0 / 60.0);
        }
        assert!(rotation_distance(s.local_rotation(nodes[0]), Quat::IDENTITY) < EPS);
        assert!(rotation_distance(s.local_rotation(nodes[1]), Quat::IDENTITY) > 1e-3);
        assert!(manager.bones()[0].flags().contains(StepFlags::ANIMATED));
    }

    #[test]
    fn test_ground_lifts_tip() {
        let mut s = Skeleton::new();
        let root = s.add_node("root", None, Vec3::ZERO, Quat::IDENTITY).unwrap();
        let bone = s.add_node("bone", Some(root), Vec3::new(0.0, 0.5, 0.0), Quat::IDENTITY).unwrap();
        let tip = s.add_node("tip", Some(bone), Vec3::new(0.3, -1.0, 0.0), Quat::IDENTITY).unwrap();
        let mut colliders = ColliderSet::new();
        let mut manager = build(&s, &colliders, &[bone], SpringConfig::default());

        manager.update(&mut s, &mut colliders, 1.0 / 60.0);
        assert!(manager.bones()[0].flags().contains(StepFlags::GROUND_CONTACT));
        assert!((s.world_position(tip).y - 0.05).abs() < 1e-3);
    }

    #[test]
    fn test_attached_collider_and_log() {
        let (mut s, nodes) = horizontal_chain();
        let mut colliders = ColliderSet::new();
        // 挂在根节点上，跟随角色移动
        let id = colliders.add_attached(SphereCollider::new(Vec3::new(1.0, 1.9, 0.0), 0.3), 0);
        let settings = vec![SpringBoneSettings { colliders: vec![id], ..SpringBoneSettings::new(nodes[0]) }];
        let config = SpringConfig { record_collisions: true, ..test_config() };
        let mut manager = SpringManager::build_with_config(&s, &colliders, settings, config).unwrap();

        manager.update(&mut s, &mut colliders, 1.0 / 60.0);
        assert!(manager.bones()[0].flags().contains(StepFlags::COLLIDED));
        assert_eq!(manager.collision_log().records().len(), 1);
        assert_eq!(manager.bones()[0].collision_cooldown(), 5);

        // 禁用后不再碰撞，记录每帧清空
        colliders.get_mut(id).unwrap().set_enabled(false);
        manager.update(&mut s, &mut colliders, 1.0 / 60.0);
        assert!(manager.collision_log().records().is_empty());
    }

    #[test]
    fn test_childless_bone_skipped() {
        let (s, nodes) = horizontal_chain();
        let manager = build(&s, &ColliderSet::new(), &[nodes[0], 4], test_config());
        assert_eq!(manager.bones().len(), 1);
    }

    #[test]
    fn test_build_errors() {
        let (s, nodes) = horizontal_chain();
        let colliders = ColliderSet::new();

        let settings = vec![SpringBoneSettings::new(nodes[0]), SpringBoneSettings::new(nodes[0])];
        assert!(matches!(
            SpringManager::build_with_config(&s, &colliders, settings, test_config()),
            Err(SpringError::DuplicateBone(_))
        ));

        let settings = vec![SpringBoneSettings { colliders: vec![3], ..SpringBoneSettings::new(nodes[0]) }];
        assert!(matches!(
            SpringManager::build_with_config(&s, &colliders, settings, test_config()),
            Err(SpringError::ColliderOutOfRange(3))
        ));

        let config = SpringConfig { dynamic_ratio: -1.0, ..test_config() };
        assert!(matches!(
            SpringManager::build_with_config(&s, &colliders, Vec::new(), config),
            Err(SpringError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_angle_limits_rejected_at_build() {
        let (s, nodes) = horizontal_chain();
        let colliders = ColliderSet::new();
        for limits in [
            AngleLimits::new(f32::NAN, 10.0),
            AngleLimits { active: true, min: 20.0, max: -20.0 },
        ] {
            let settings = vec![SpringBoneSettings { y_angle_limits: limits, ..SpringBoneSettings::new(nodes[0]) }];
            assert!(matches!(
                SpringManager::build_with_config(&s, &colliders, settings, test_config()),
                Err(SpringError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_find_and_tune_bone() {
        let (mut s, nodes) = horizontal_chain();
        let mut colliders = ColliderSet::new();
        let mut manager = build(&s, &colliders, &nodes, test_config());
        assert_eq!(manager.find_bone("b").map(|b| b.node()), Some(nodes[1]));
        assert!(manager.find_bone("end").is_none());

        // 运行时调参：零刚度、零外力下整条链保持静止
        for bone in manager.bones_mut() {
            bone.stiffness_force = 0.0;
            bone.spring_force = Vec3::ZERO;
        }
        manager.set_gravity(Vec3::ZERO);
        for _ in 0..10 {
            manager.update(&mut s, &mut colliders, 1.0 / 60.0);
        }
        for &n in &nodes {
            assert!(rotation_distance(s.local_rotation(n), Quat::IDENTITY) < 1e-5);
        }
    }

    #[test]
    fn test_toggle_collision_recording() {
        let (mut s, nodes) = horizontal_chain();
        let mut colliders = ColliderSet::new();
        let id = colliders.add(SphereCollider::new(Vec3::new(1.0, 1.9, 0.0), 0.3));
        let settings = vec![SpringBoneSettings { colliders: vec![id], ..SpringBoneSettings::new(nodes[0]) }];
        let mut manager = SpringManager::build_with_config(&s, &colliders, settings, test_config()).unwrap();

        manager.update(&mut s, &mut colliders, 1.0 / 60.0);
        assert!(manager.bones()[0].flags().contains(StepFlags::COLLIDED));
        assert!(manager.collision_log().records().is_empty());

        manager.reset(&s);
        manager.set_record_collisions(true);
        assert!(manager.config().record_collisions);
        manager.update(&mut s, &mut colliders, 1.0 / 60.0);
        assert_eq!(manager.collision_log().records().len(), 1);
    }

    #[test]
    fn test_wall_clock_step_when_fps_unset() {
        let (mut s, nodes) = horizontal_chain();
        let mut colliders = ColliderSet::new();
        let config = SpringConfig { simulation_fps: 0.0, ..test_config() };
        let mut manager = build(&s, &colliders, &nodes, config);

        // 步长为 0 时不推进
        manager.update(&mut s, &mut colliders, 0.0);
        assert!(rotation_distance(s.local_rotation(nodes[0]), Quat::IDENTITY) < 1e-6);

        manager.update(&mut s, &mut colliders, 0.1);
        assert!(rotation_distance(s.local_rotation(nodes[0]), Quat::IDENTITY) > 1e-3);
    }

    #[test]
    fn test_reset_restores_rest_tips() {
        let (mut s, nodes) = horizontal_chain();
        let mut colliders = ColliderSet::new();
        let mut manager = build(&s, &colliders, &nodes, test_config());
        for _ in 0..20 {
            manager.update(&mut s, &mut colliders, 1.0 / 60.0);
        }
        manager.reset(&s);
        let first = &manager.bones()[0];
        assert!((first.current_tip() - Vec3::new(1.0, 2.0, 0.0)).length() < EPS);
        assert_eq!(first.current_tip(), first.previous_tip());
    }

    #[test]
    fn test_setters_validate() {
        let (s, nodes) = horizontal_chain();
        let mut manager = build(&s, &ColliderSet::new(), &nodes, test_config());
        assert!(manager.set_dynamic_ratio(2.0).is_err());
        assert!(manager.set_dynamic_ratio(0.25).is_ok());
        assert_eq!(manager.config().dynamic_ratio, 0.25);
        assert!(manager.set_simulation_fps(f32::NAN).is_err());
        manager.set_ground(true, -1.0);
        assert_eq!(manager.config().ground_height, -1.0);
    }
}
