//! 多角色驱动
//!
//! 每个角色拥有独立的骨架、碰撞体集合与调度器，彼此没有共享可变状态，
//! 可以用 rayon 并行步进；角色内部的骨骼始终按深度顺序串行处理。

use rayon::prelude::*;

use crate::collider::ColliderSet;
use crate::skeleton::Skeleton;
use crate::Result;
use super::{get_config, SpringBoneSettings, SpringConfig, SpringManager};

/// 单个角色
#[derive(Clone, Debug)]
pub struct Character {
    pub name: String,
    pub skeleton: Skeleton,
    pub colliders: ColliderSet,
    pub manager: SpringManager,
}

impl Character {
    /// 使用全局配置创建
    pub fn new(
        name: impl Into<String>,
        skeleton: Skeleton,
        colliders: ColliderSet,
        settings: Vec<SpringBoneSettings>,
    ) -> Result<Self> {
        Self::with_config(name, skeleton, colliders, settings, get_config())
    }

    pub fn with_config(
        name: impl Into<String>,
        skeleton: Skeleton,
        colliders: ColliderSet,
        settings: Vec<SpringBoneSettings>,
        config: SpringConfig,
    ) -> Result<Self> {
        let manager = SpringManager::build_with_config(&skeleton, &colliders, settings, config)?;
        Ok(Self {
            name: name.into(),
            skeleton,
            colliders,
            manager,
        })
    }

    /// 推进一帧
    pub fn update(&mut self, delta_time: f32) {
        self.manager.update(&mut self.skeleton, &mut self.colliders, delta_time);
    }

    pub fn reset(&mut self) {
        self.manager.reset(&self.skeleton);
    }
}

/// 多角色集合
#[derive(Clone, Debug, Default)]
pub struct SpringWorld {
    characters: Vec<Character>,
    parallel: bool,
}

impl SpringWorld {
    /// 是否并行取自全局配置
    pub fn new() -> Self {
        Self::with_parallel(get_config().parallel_characters)
    }

    pub fn with_parallel(parallel: bool) -> Self {
        Self {
            characters: Vec::new(),
            parallel,
        }
    }

    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    pub fn add(&mut self, character: Character) -> usize {
        self.characters.push(character);
        self.characters.len() - 1
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Character> {
        self.characters.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Character> {
        self.characters.get_mut(index)
    }

    pub fn find(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    /// 推进所有角色一帧
    pub fn update(&mut self, delta_time: f32) {
        if self.parallel && self.characters.len() > 1 {
            self.characters
                .par_iter_mut()
                .for_each(|character| character.update(delta_time));
        } else {
            for character in &mut self.characters {
                character.update(delta_time);
            }
        }
    }

    pub fn reset(&mut self) {
        for character in &mut self.characters {
            character.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collider::SphereCollider;
    use crate::skeleton::PoseTable;
    use glam::{Quat, Vec3};

    fn character(name: &str, offset: f32) -> Character {
        let mut s = Skeleton::new();
        let root = s.add_node("root", None, Vec3::new(offset, 0.0, 0.0), Quat::IDENTITY).unwrap();
        let hair = s.add_node("hair", Some(root), Vec3::new(0.0, 2.0, 0.0), Quat::IDENTITY).unwrap();
        let hair2 = s.add_node("hair2", Some(hair), Vec3::new(0.5, -0.5, 0.0), Quat::IDENTITY).unwrap();
        s.add_node("hair_end", Some(hair2), Vec3::new(0.5, -0.5, 0.0), Quat::IDENTITY).unwrap();

        let mut colliders = ColliderSet::new();
        let head = colliders.add_attached(SphereCollider::new(Vec3::new(0.6, 1.2, 0.0), 0.3), root);
        let settings = vec![
            SpringBoneSettings { colliders: vec![head], ..SpringBoneSettings::new(hair) },
            SpringBoneSettings { colliders: vec![head], ..SpringBoneSettings::new(hair2) },
        ];
        let config = SpringConfig { collide_with_ground: false, ..SpringConfig::default() };
        Character::with_config(name, s, colliders, settings, config).unwrap()
    }

    fn world(parallel: bool) -> SpringWorld {
        let mut world = SpringWorld::with_parallel(parallel);
        world.add(character("a", 0.0));
        world.add(character("b", 3.0));
        world.add(character("c", -3.0));
        world
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut sequential = world(false);
        let mut parallel = world(true);
        for _ in 0..40 {
            sequential.update(1.0 / 60.0);
            parallel.update(1.0 / 60.0);
        }

        for (a, b) in sequential.characters().iter().zip(parallel.characters()) {
            for node in 0..a.skeleton.node_count() {
                assert!(a.skeleton.world_position(node).distance(b.skeleton.world_position(node)) < 1e-6);
            }
        }
    }

    #[test]
    fn test_characters_are_independent() {
        let mut w = world(true);
        // 移动 b，不影响 a
        let b = w.get_mut(1).unwrap();
        b.skeleton.set_root_transform(0, Vec3::new(3.0, 0.0, 5.0), Quat::IDENTITY);
        w.update(1.0 / 60.0);

        let mut reference = character("a", 0.0);
        reference.update(1.0 / 60.0);
        let a = w.find("a").unwrap();
        for node in 0..a.skeleton.node_count() {
            assert!(a.skeleton.world_position(node).distance(reference.skeleton.world_position(node)) < 1e-6);
        }
    }

    #[test]
    fn test_reset_all() {
        let mut w = world(false);
        for _ in 0..10 {
            w.update(1.0 / 60.0);
        }
        w.reset();
        for c in w.characters() {
            for bone in c.manager.bones() {
                assert_eq!(bone.current_tip(), bone.previous_tip());
                assert_eq!(bone.collision_cooldown(), 0);
            }
        }
        assert_eq!(w.len(), 3);
    }
}
