// crates/mp_archive/src/config.rs

//! 归档配置
//!
//! 从求解器配置文件反序列化的归档段。所有字段带默认值，缺省配置
//! 即为"默认字段、t=0 起每个间隔归档一次"的最小可用配置。
//! [`ArchiveConfig::validate`] 在模拟开始前执行，所有违例都是致命
//! 配置错误，先于任何文件打开浮出。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, ArchiveResult};
use crate::fields::{CrackSelection, ParticleSelection, DEFAULT_CRACK_ORDER, DEFAULT_PARTICLE_ORDER};
use crate::schedule::ScheduleBlock;
use mp_foundation::units::UnitSystem;

fn default_root() -> String {
    "results".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_particle_order() -> String {
    DEFAULT_PARTICLE_ORDER.to_string()
}

fn default_crack_order() -> String {
    DEFAULT_CRACK_ORDER.to_string()
}

/// 归档配置段
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    /// 归档文件名词根（文件名为 `<root>.<step>`）
    #[serde(default = "default_root")]
    pub archive_root: String,

    /// 输出目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// 粒子字段选择串（过短补 N，过长截断）
    #[serde(default = "default_particle_order")]
    pub particle_order: String,

    /// 裂纹字段选择串
    #[serde(default = "default_crack_order")]
    pub crack_order: String,

    /// 材料历史标量掩码（位 0..=3），0 表示沿用选择串中的历史槽位
    #[serde(default)]
    pub history_mask: u8,

    /// 归档时段表
    #[serde(default)]
    pub blocks: Vec<ScheduleBlock>,

    /// 全局量独立归档间隔（秒）；缺省时全局量跟随粒子归档
    #[serde(default)]
    pub global_interval: Option<f64>,

    /// 写出时反转字节序（为异字节序的下游机器生成文件）
    #[serde(default)]
    pub reverse_bytes: bool,

    /// 单位制
    #[serde(default)]
    pub units: UnitSystem,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            archive_root: default_root(),
            output_dir: default_output_dir(),
            particle_order: default_particle_order(),
            crack_order: default_crack_order(),
            history_mask: 0,
            blocks: Vec::new(),
            global_interval: None,
            reverse_bytes: false,
            units: UnitSystem::default(),
        }
    }
}

impl ArchiveConfig {
    /// 校验配置
    ///
    /// 时段表本身的校验（空表、非单调起点、非正间隔）由调度器构建
    /// 时完成；这里只检查调度之外的字段。
    pub fn validate(&self) -> ArchiveResult<()> {
        if self.archive_root.is_empty() {
            return Err(ArchiveError::config("归档文件名词根不能为空"));
        }
        if self
            .archive_root
            .contains(|c: char| c == '/' || c == '\\')
        {
            return Err(ArchiveError::config(format!(
                "归档文件名词根不能含路径分隔符: {}",
                self.archive_root
            )));
        }
        if self.history_mask > 0x0F {
            return Err(ArchiveError::config(format!(
                "历史标量掩码只允许低 4 位: {:#04x}",
                self.history_mask
            )));
        }
        if let Some(interval) = self.global_interval {
            if interval <= 0.0 {
                return Err(ArchiveError::config(format!(
                    "全局量归档间隔必须为正（实际 {interval}）"
                )));
            }
        }
        Ok(())
    }

    /// 归一化后的粒子字段选择（含历史掩码注入）
    pub fn particle_selection(&self) -> ParticleSelection {
        let mut sel = ParticleSelection::normalize(&self.particle_order);
        if self.history_mask != 0 {
            sel.set_history_mask(self.history_mask);
        }
        sel
    }

    /// 归一化后的裂纹字段选择
    pub fn crack_selection(&self) -> CrackSelection {
        CrackSelection::normalize(&self.crack_order)
    }

    /// 归档文件路径词根（目录 + 词根）
    pub fn root_path(&self) -> PathBuf {
        self.output_dir.join(&self.archive_root)
    }

    /// 全局量文件路径
    pub fn global_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.global", self.archive_root))
    }
}

// ============================================================
// 测试
// ============================================================
