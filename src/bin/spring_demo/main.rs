//! 无界面演示
//!
//! 一条挂在头部旁的四节头发骨链，头部球体碰撞体跟随根节点。
//! 根节点左右摆动，输出发梢位置与碰撞统计。
//!
//! 运行：RUST_LOG=info cargo run --features demo --bin spring_demo

use glam::{Quat, Vec3};
use spring_bone_engine::{
    Character, ColliderSet, PoseTable, Skeleton, SphereCollider, SpringBoneSettings, SpringConfig,
    SpringWorld, Result,
};

const FRAMES: usize = 180;
const DELTA_TIME: f32 = 1.0 / 60.0;

fn build_character(name: &str, x: f32) -> Result<Character> {
    let mut skeleton = Skeleton::new();
    let root = skeleton.add_node("root", None, Vec3::new(x, 0.0, 0.0), Quat::IDENTITY)?;
    let head = skeleton.add_node("head", Some(root), Vec3::new(0.0, 1.5, 0.0), Quat::IDENTITY)?;

    let mut parent = skeleton.add_node("hair_0", Some(head), Vec3::new(0.0, 0.1, -0.12), Quat::IDENTITY)?;
    let mut hair = vec![parent];
    for i in 1..5 {
        parent = skeleton.add_node(format!("hair_{}", i), Some(parent), Vec3::new(0.0, -0.12, -0.03), Quat::IDENTITY)?;
        hair.push(parent);
    }

    let mut colliders = ColliderSet::new();
    let skull = colliders.add_attached(SphereCollider::new(Vec3::ZERO, 0.11), head);

    // 最后一个节点只作为尾端
    let settings = hair[..hair.len() - 1]
        .iter()
        .map(|&node| SpringBoneSettings {
            colliders: vec![skull],
            stiffness_force: 0.5,
            ..SpringBoneSettings::new(node)
        })
        .collect();

    let config = SpringConfig {
        record_collisions: true,
        ..SpringConfig::default()
    };
    Character::with_config(name, skeleton, colliders, settings, config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut world = SpringWorld::new();
    world.add(build_character("left", -1.0)?);
    world.add(build_character("right", 1.0)?);

    for frame in 0..FRAMES {
        let t = frame as f32 * DELTA_TIME;
        for (i, phase) in [0.0f32, 1.3].into_iter().enumerate() {
            let Some(character) = world.get_mut(i) else {
                continue;
            };
            let base_x = if i == 0 { -1.0 } else { 1.0 };
            let sway = (t * 4.0 + phase).sin() * 0.3;
            let turn = Quat::from_rotation_y((t * 2.0 + phase).sin() * 0.6);
            character.skeleton.set_root_transform(0, Vec3::new(base_x + sway, 0.0, 0.0), turn);
        }

        world.update(DELTA_TIME);

        if frame % 30 == 0 {
            for character in world.characters() {
                let tip = character.skeleton.nodes().len() - 1;
                let p = character.skeleton.world_position(tip);
                log::info!(
                    "[Demo] frame={} {} 发梢=({:.3}, {:.3}, {:.3}) 碰撞记录={}",
                    frame,
                    character.name,
                    p.x,
                    p.y,
                    p.z,
                    character.manager.collision_log().records().len()
                );
            }
        }
    }

    Ok(())
}
