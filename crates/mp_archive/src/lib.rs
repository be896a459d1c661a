// crates/mp_archive/src/lib.rs

//! 模拟结果归档
//!
//! 材料点法求解器的结果写出子系统：按可配置的时段表，把粒子与
//! 裂纹段快照写成一系列自描述的二进制归档文件，另有全局量时间
//! 序列与辅助导出挂钩两条旁路。
//!
//! # 管线
//!
//! ```text
//! ArchiveConfig ──> Archiver::begin ──> CompiledLayout（一次编译）
//!                        │
//! 每步: archive_results ─┼─> Scheduler（是否归档，先推进后写盘）
//!                        ├─> GlobalSeries（全局量时间序列）
//!                        ├─> write_particle / write_crack_segment
//!                        │   （共用跨度表，粒子区并行）
//!                        └─> AuxSlot（辅助导出挂钩）
//! ```
//!
//! # 错误约定
//!
//! 配置与时段表违例、记录缓冲分配失败是致命错误，在第一个文件
//! 打开之前浮出；单个文件的 IO 失败可恢复，记录诊断后放弃该文件，
//! 模拟继续。

pub mod archiver;
pub mod config;
pub mod crack;
pub mod error;
pub mod export;
pub mod fields;
pub mod global;
pub mod layout;
pub mod model;
pub mod particle;
pub mod record;
pub mod schedule;

pub use archiver::{Archiver, CrackTerms};
pub use config::ArchiveConfig;
pub use error::{ArchiveError, ArchiveResult};
pub use export::AuxExporter;
pub use fields::{CrackSelection, ParticleSelection};
pub use global::GlobalQuantity;
pub use layout::CompiledLayout;
pub use model::{
    CrackSegmentState, Dim, GridInfo, MaterialTable, ParticleState, SimulationFrame, SymTensor,
};
pub use schedule::{ScheduleBlock, Scheduler};
