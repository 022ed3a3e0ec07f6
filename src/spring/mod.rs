//! Spring Bone 模拟
//!
//! 核心设计思想：
//! - SpringBone: 单骨骼状态 arena 记录，按节点索引读写姿态表
//! - SpringManager: 构建时一次性按深度排序，之后每帧顺序步进
//! - SpringWorld: 多角色之间并行

mod angle_limits;
mod bone;
mod config;
mod manager;
mod world;

pub use angle_limits::AngleLimits;
pub use bone::{rest_tail_position, LengthLimit, SpringBone, SpringBoneSettings, StepFlags, StepParams};
pub use config::{get_config, reset_config, set_config, SpringConfig};
pub use manager::SpringManager;
pub use world::{Character, SpringWorld};
