//! 单骨骼求解器
//!
//! 每根骨骼的尾端是一个质点，用 Verlet 积分推进，并被约束在以头部为球心、
//! 骨骼长度为半径的球面上（刚性摆）。每步依次执行：
//!
//! 积分 → 长度限制 → 地面 / 碰撞体 → 角度限制 → 计算旋转
//!
//! 求解器只通过 `PoseTable` 读取父节点朝向与自身位置，最后写回自身本地旋转。

use bitflags::bitflags;
use glam::{Quat, Vec3};

use crate::collider::{ColliderId, ColliderKind, ColliderSet, CollisionLog, CollisionStatus, GroundPlane};
use crate::skeleton::{NodeId, PoseTable};
use crate::{Result, SpringError};
use super::AngleLimits;

/// 头尾距离低于此值时方向不可靠，改用静止方向
const MIN_BONE_LENGTH: f32 = 0.001;

/// 没有有效方向时的默认骨骼轴
const DEFAULT_BONE_AXIS: Vec3 = Vec3::NEG_X;

/// 碰撞体检测顺序
const COLLIDER_ORDER: [ColliderKind; 3] = [ColliderKind::Capsule, ColliderKind::Sphere, ColliderKind::Panel];

bitflags! {
    /// 单步诊断标志
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct StepFlags: u32 {
        /// 受动画驱动（按管理器的 dynamic_ratio 混合）
        const ANIMATED       = 1 << 0;
        /// 与碰撞体发生碰撞
        const COLLIDED       = 1 << 1;
        /// 与地面接触
        const GROUND_CONTACT = 1 << 2;
        /// 头部嵌入碰撞体
        const HEAD_EMBEDDED  = 1 << 3;
        /// 角度被硬限制夹住
        const ANGLE_CLAMPED  = 1 << 4;
        /// 从 NaN / Inf 恢复
        const RECOVERED      = 1 << 5;
    }
}

// ============================================================================
// 配置
// ============================================================================

/// 骨骼配置（创建 SpringBone 的输入）
#[derive(Clone, Debug)]
pub struct SpringBoneSettings {
    /// 模拟的节点（必须有父节点）
    pub node: NodeId,
    /// 角度限制的参考坐标系，None 时不做角度限制
    pub pivot: Option<NodeId>,
    /// 回到静止姿态的刚度，[0, 5000]
    pub stiffness_force: f32,
    /// 阻尼，[0, 1]
    pub drag_force: f32,
    /// 恒定外力
    pub spring_force: Vec3,
    /// 角度限制的软弹簧刚度
    pub angular_stiffness: f32,
    pub y_angle_limits: AngleLimits,
    pub z_angle_limits: AngleLimits,
    /// 尾端碰撞半径，非负
    pub radius: f32,
    /// 长度限制目标节点
    pub length_limit_targets: Vec<NodeId>,
    /// 参与检测的碰撞体
    pub colliders: Vec<ColliderId>,
}

impl SpringBoneSettings {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            pivot: None,
            stiffness_force: 0.01,
            drag_force: 0.4,
            spring_force: Vec3::new(0.0, -0.0001, 0.0),
            angular_stiffness: 100.0,
            y_angle_limits: AngleLimits::default(),
            z_angle_limits: AngleLimits::default(),
            radius: 0.05,
            length_limit_targets: Vec::new(),
            colliders: Vec::new(),
        }
    }

    /// 校验参数范围
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=5000.0).contains(&self.stiffness_force) {
            return Err(SpringError::InvalidConfig(format!(
                "stiffness_force must be in [0, 5000], got {}",
                self.stiffness_force
            )));
        }
        if !(0.0..=1.0).contains(&self.drag_force) {
            return Err(SpringError::InvalidConfig(format!(
                "drag_force must be in [0, 1], got {}",
                self.drag_force
            )));
        }
        if !(self.radius >= 0.0) {
            return Err(SpringError::InvalidConfig(format!(
                "radius must be non-negative, got {}",
                self.radius
            )));
        }
        for (axis, limits) in [("y", &self.y_angle_limits), ("z", &self.z_angle_limits)] {
            if limits.active && !limits.is_valid() {
                return Err(SpringError::InvalidConfig(format!(
                    "{}_angle_limits must be finite with min <= max, got [{}, {}]",
                    axis, limits.min, limits.max
                )));
            }
        }
        Ok(())
    }
}

/// 单步共享参数
#[derive(Clone, Copy, Debug)]
pub struct StepParams {
    pub dt: f32,
    /// 重力等外力
    pub external_force: Vec3,
    pub ground: Option<GroundPlane>,
    /// 物理旋转的混合比例
    pub dynamic_ratio: f32,
    pub cooldown_frames: u32,
    pub length_limit_spring_constant: f32,
    pub ground_min_length_ratio: f32,
}

impl Default for StepParams {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            external_force: Vec3::ZERO,
            ground: None,
            dynamic_ratio: 1.0,
            cooldown_frames: 5,
            length_limit_spring_constant: 0.5,
            ground_min_length_ratio: 0.5,
        }
    }
}

/// 长度限制：尾端到目标节点的静止距离
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LengthLimit {
    pub target: NodeId,
    pub rest_distance: f32,
}

// ============================================================================
// SpringBone
// ============================================================================

/// 单根骨骼的动态状态
#[derive(Clone, Debug)]
pub struct SpringBone {
    name: String,
    node: NodeId,
    parent: NodeId,
    pivot: Option<NodeId>,

    // 动力学参数
    pub stiffness_force: f32,
    pub drag_force: f32,
    pub spring_force: Vec3,
    pub angular_stiffness: f32,
    pub y_angle_limits: AngleLimits,
    pub z_angle_limits: AngleLimits,
    pub radius: f32,
    pub colliders: Vec<ColliderId>,

    // 静止姿态（创建时确定）
    bone_axis: Vec3,
    spring_length: f32,
    initial_local_rotation: Quat,
    length_limits: Vec<LengthLimit>,

    // 动态状态
    curr_tip: Vec3,
    prev_tip: Vec3,
    animated_rotation: Quat,
    collision_cooldown: u32,
    flags: StepFlags,
}

impl SpringBone {
    /// 按当前姿态创建骨骼
    ///
    /// 静止尾端由子节点推导（忽略 pivot 节点），没有子节点时返回 `NoValidChild`。
    pub fn new<P: PoseTable + ?Sized>(settings: &SpringBoneSettings, pose: &P) -> Result<Self> {
        settings.validate()?;

        let node = settings.node;
        if !pose.contains(node) {
            return Err(SpringError::NodeOutOfRange(node));
        }
        let name = pose.name(node).to_string();
        let parent = pose
            .parent(node)
            .ok_or_else(|| SpringError::MissingParent(name.clone()))?;
        if let Some(pivot) = settings.pivot {
            if !pose.contains(pivot) {
                return Err(SpringError::NodeOutOfRange(pivot));
            }
        }
        if let Some(&target) = settings.length_limit_targets.iter().find(|&&t| !pose.contains(t)) {
            return Err(SpringError::NodeOutOfRange(target));
        }

        let rest_tail = rest_tail_position(pose, node)
            .ok_or_else(|| SpringError::NoValidChild(name.clone()))?;

        let head = pose.world_position(node);
        let local_tail = pose.world_rotation(node).inverse() * (rest_tail - head);
        let bone_axis = local_tail.try_normalize().unwrap_or(DEFAULT_BONE_AXIS);
        let spring_length = head.distance(rest_tail);

        let length_limits = settings
            .length_limit_targets
            .iter()
            .map(|&target| LengthLimit {
                target,
                rest_distance: pose.world_position(target).distance(rest_tail),
            })
            .collect();

        let initial_local_rotation = pose.local_rotation(node);

        Ok(Self {
            name,
            node,
            parent,
            pivot: settings.pivot,
            stiffness_force: settings.stiffness_force,
            drag_force: settings.drag_force,
            spring_force: settings.spring_force,
            angular_stiffness: settings.angular_stiffness,
            y_angle_limits: settings.y_angle_limits,
            z_angle_limits: settings.z_angle_limits,
            radius: settings.radius,
            colliders: settings.colliders.clone(),
            bone_axis,
            spring_length,
            initial_local_rotation,
            length_limits,
            curr_tip: rest_tail,
            prev_tip: rest_tail,
            animated_rotation: initial_local_rotation,
            collision_cooldown: 0,
            flags: StepFlags::empty(),
        })
    }

    // ========== 访问器 ==========

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn pivot(&self) -> Option<NodeId> {
        self.pivot
    }

    /// 静止方向（骨骼本地空间，单位向量）
    pub fn bone_axis(&self) -> Vec3 {
        self.bone_axis
    }

    pub fn spring_length(&self) -> f32 {
        self.spring_length
    }

    pub fn current_tip(&self) -> Vec3 {
        self.curr_tip
    }

    pub fn previous_tip(&self) -> Vec3 {
        self.prev_tip
    }

    pub fn collision_cooldown(&self) -> u32 {
        self.collision_cooldown
    }

    pub fn length_limits(&self) -> &[LengthLimit] {
        &self.length_limits
    }

    pub fn flags(&self) -> StepFlags {
        self.flags
    }

    /// 复制动力学参数（不含静止姿态与动态状态）
    pub fn copy_dynamics_to(&self, target: &mut SpringBone) {
        target.stiffness_force = self.stiffness_force;
        target.drag_force = self.drag_force;
        target.spring_force = self.spring_force;
        target.angular_stiffness = self.angular_stiffness;
        self.y_angle_limits.copy_to(&mut target.y_angle_limits);
        self.z_angle_limits.copy_to(&mut target.z_angle_limits);
        target.radius = self.radius;
        target.colliders = self.colliders.clone();
    }

    // ========== 单步 ==========

    /// 完整执行一步并写回本地旋转
    pub fn step<P: PoseTable + ?Sized>(
        &mut self,
        pose: &mut P,
        colliders: &ColliderSet,
        params: &StepParams,
        animated: bool,
        log: &mut CollisionLog,
    ) {
        self.flags = if animated { StepFlags::ANIMATED } else { StepFlags::empty() };

        self.update_spring(&*pose, params.dt, params.external_force);
        self.apply_length_limits(&*pose, params.dt, params.length_limit_spring_constant);
        self.resolve_collisions(&*pose, colliders, params, log);
        self.apply_angle_limits(&*pose, params.dt);
        let rotation = self.compute_rotation(&*pose, params.dynamic_ratio);
        pose.set_local_rotation(self.node, rotation);
    }

    /// 静止姿态下（由父节点当前朝向驱动）的尾端位置
    pub fn rest_tip_position<P: PoseTable + ?Sized>(&self, pose: &P) -> Vec3 {
        let base_rotation = pose.world_rotation(self.parent) * self.initial_local_rotation;
        pose.world_position(self.node) + base_rotation * self.bone_axis * self.spring_length
    }

    /// 积分：胡克力 + 外力，Verlet 推进后投影回刚性杆长度
    pub fn update_spring<P: PoseTable + ?Sized>(&mut self, pose: &P, dt: f32, external_force: Vec3) {
        self.animated_rotation = pose.local_rotation(self.node);

        let target = self.rest_tip_position(pose);
        let mut force = self.stiffness_force * (target - self.curr_tip);
        force += self.spring_force + external_force;
        force *= 0.5 * dt * dt;

        let temp = self.curr_tip;
        force += (1.0 - self.drag_force) * (self.curr_tip - self.prev_tip);
        self.curr_tip += force;
        self.prev_tip = temp;

        let head = pose.world_position(self.node);
        let to_tip = self.curr_tip - head;
        let length = to_tip.length();
        let direction = if length <= MIN_BONE_LENGTH {
            pose.world_rotation(self.node) * self.bone_axis
        } else {
            to_tip / length
        };
        self.curr_tip = head + self.spring_length * direction;

        self.collision_cooldown = self.collision_cooldown.saturating_sub(1);
    }

    /// 长度限制：对每个目标独立施加胡克拉力，单次累加
    pub fn apply_length_limits<P: PoseTable + ?Sized>(&mut self, pose: &P, dt: f32, spring_constant: f32) {
        if self.length_limits.is_empty() {
            return;
        }

        let multiplier = spring_constant * dt * dt;
        let mut movement = Vec3::ZERO;
        for limit in &self.length_limits {
            let target_to_tip = self.curr_tip - pose.world_position(limit.target);
            let distance = target_to_tip.length();
            let from_equilibrium = distance - limit.rest_distance;
            movement -= multiplier * from_equilibrium * target_to_tip.normalize_or_zero();
        }
        self.curr_tip += movement;
    }

    /// 地面与碰撞体
    ///
    /// 冷却结束时先测地面；地面没有碰撞才依次测胶囊体、球体、面板。
    /// 返回本步是否发生碰撞。
    pub fn resolve_collisions<P: PoseTable + ?Sized>(
        &mut self,
        pose: &P,
        colliders: &ColliderSet,
        params: &StepParams,
        log: &mut CollisionLog,
    ) -> bool {
        let head = pose.world_position(self.node);

        let mut had_collision = false;
        if self.collision_cooldown == 0 {
            if let Some(ground) = &params.ground {
                had_collision = self.check_ground_collision(pose, head, ground, params, log);
            }
        }
        if !had_collision {
            had_collision = self.check_collider_collisions(head, colliders, params, log);
        }
        had_collision
    }

    fn check_ground_collision<P: PoseTable + ?Sized>(
        &mut self,
        pose: &P,
        head: Vec3,
        ground: &GroundPlane,
        params: &StepParams,
        log: &mut CollisionLog,
    ) -> bool {
        let (new_tail, status) = ground.resolve(head, self.curr_tip, self.radius);
        if !status.is_collision() {
            return false;
        }

        self.curr_tip = new_tail;
        self.prev_tip = new_tail;
        self.curr_tip = self.fix_length(
            pose,
            head,
            params.ground_min_length_ratio * self.spring_length,
            self.spring_length,
        );
        self.collision_cooldown = params.cooldown_frames;
        self.flags |= StepFlags::GROUND_CONTACT;
        log.record(self.node, ground.contact_point(self.curr_tip), self.radius, status);
        true
    }

    fn check_collider_collisions(
        &mut self,
        head: Vec3,
        colliders: &ColliderSet,
        params: &StepParams,
        log: &mut CollisionLog,
    ) -> bool {
        let mut had_collision = false;
        for kind in COLLIDER_ORDER {
            for &id in &self.colliders {
                let Some(collider) = colliders.get(id) else {
                    continue;
                };
                if collider.kind() != kind || !collider.is_active() {
                    continue;
                }

                let (new_tail, status) = collider.resolve(head, self.curr_tip, self.radius, self.spring_length);
                if !status.is_collision() {
                    continue;
                }
                self.curr_tip = new_tail;
                had_collision = true;
                if status == CollisionStatus::HeadEmbedded {
                    self.flags |= StepFlags::HEAD_EMBEDDED;
                }
                log.record(self.node, collider.contact_point(new_tail), self.radius, status);
            }
        }

        if had_collision {
            self.prev_tip = self.curr_tip;
            self.collision_cooldown = params.cooldown_frames;
            self.flags |= StepFlags::COLLIDED;
        }
        had_collision
    }

    /// 把尾端到头部的距离夹到 [min_length, max_length]
    fn fix_length<P: PoseTable + ?Sized>(&self, pose: &P, head: Vec3, min_length: f32, max_length: f32) -> Vec3 {
        let head_to_tip = self.curr_tip - head;
        let length = head_to_tip.length();
        if length <= MIN_BONE_LENGTH {
            return self.curr_tip + pose.world_rotation(self.node) * self.bone_axis * min_length;
        }
        let new_length = length.max(min_length).min(max_length);
        head + head_to_tip * (new_length / length)
    }

    /// 角度限制（先 Y 后 Z）
    ///
    /// pivot 的 -X 为前方；Y 限制以 -Y 为侧向、-Z 为上方，Z 限制反之。
    pub fn apply_angle_limits<P: PoseTable + ?Sized>(&mut self, pose: &P, dt: f32) {
        if !self.y_angle_limits.active && !self.z_angle_limits.active {
            return;
        }
        let Some(pivot) = self.pivot else {
            return;
        };

        let head = pose.world_position(self.node);
        let pivot_rotation = pose.world_rotation(pivot);
        let forward = -(pivot_rotation * Vec3::X);
        let pivot_up = pivot_rotation * Vec3::Y;
        let pivot_forward = pivot_rotation * Vec3::Z;

        let mut vector = self.curr_tip - head;
        let mut clamped = false;
        if self.y_angle_limits.active {
            let (v, c) = self.y_angle_limits.constrain(
                -pivot_up, -pivot_forward, forward, self.angular_stiffness, dt, vector,
            );
            vector = v;
            clamped |= c;
        }
        if self.z_angle_limits.active {
            let (v, c) = self.z_angle_limits.constrain(
                -pivot_forward, -pivot_up, forward, self.angular_stiffness, dt, vector,
            );
            vector = v;
            clamped |= c;
        }
        if clamped {
            self.flags |= StepFlags::ANGLE_CLAMPED;
        }
        self.curr_tip = head + vector;
    }

    /// 由尾端位置计算本地旋转，并与动画旋转混合
    ///
    /// 尾端非有限值时重置到静止位置。
    pub fn compute_rotation<P: PoseTable + ?Sized>(&mut self, pose: &P, dynamic_ratio: f32) -> Quat {
        if !self.curr_tip.is_finite() {
            log::warn!("[SpringBone] '{}' 数值发散，重置到静止位置", self.name);
            self.curr_tip = self.rest_tip_position(pose);
            self.prev_tip = self.curr_tip;
            self.flags |= StepFlags::RECOVERED;
        }

        let base_rotation = pose.world_rotation(self.parent) * self.initial_local_rotation;
        let world_bone = self.curr_tip - pose.world_position(self.node);
        let local_bone = (base_rotation.inverse() * world_bone)
            .try_normalize()
            .unwrap_or(self.bone_axis);

        let aim_rotation = Quat::from_rotation_arc(self.bone_axis, local_bone);
        let physical_rotation = (self.initial_local_rotation * aim_rotation).normalize();
        self.animated_rotation.slerp(physical_rotation, dynamic_ratio.clamp(0.0, 1.0))
    }

    // ========== 诊断 / 重置 ==========

    /// 头部是否在任一关联碰撞体内
    pub fn is_head_inside_collider<P: PoseTable + ?Sized>(&self, pose: &P, colliders: &ColliderSet) -> bool {
        let head = pose.world_position(self.node);
        self.colliders
            .iter()
            .filter_map(|&id| colliders.get(id))
            .any(|c| c.is_active() && c.contains(head))
    }

    /// 尾端回到静止位置，清除冷却与标志
    pub fn reset<P: PoseTable + ?Sized>(&mut self, pose: &P) {
        self.curr_tip = self.rest_tip_position(pose);
        self.prev_tip = self.curr_tip;
        self.collision_cooldown = 0;
        self.flags = StepFlags::empty();
    }
}

/// 由子节点推导静止尾端
///
/// 一个子节点取其位置；多个取平均方向乘以平均距离；没有则返回 None。
pub fn rest_tail_position<P: PoseTable + ?Sized>(pose: &P, node: NodeId) -> Option<Vec3> {
    let children: Vec<NodeId> = pose
        .children(node)
        .iter()
        .copied()
        .filter(|&c| !pose.is_pivot(c))
        .collect();

    match children.as_slice() {
        [] => None,
        [only] => Some(pose.world_position(*only)),
        _ => {
            let head = pose.world_position(node);
            let count = children.len() as f32;
            let mut sum = Vec3::ZERO;
            let mut distance = 0.0;
            for &child in &children {
                let position = pose.world_position(child);
                sum += position;
                distance += position.distance(head);
            }
            let direction = (sum / count - head).normalize_or_zero();
            Some(head + direction * (distance / count))
        }
    }
}
