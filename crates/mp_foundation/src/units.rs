// crates/mp_foundation/src/units.rs

//! 单位制换算
//!
//! 求解器内部使用一致单位制计算，而归档文件和文本报告沿用
//! Legacy 单位（mm-g-s 体系：长度 mm、质量 g、应力 Pa、能量 J、
//! 归档时间戳 ms）。下游可视化工具按 Legacy 单位解析二进制归档，
//! 因此换算系数是格式的一部分，不可省略。
//!
//! # 示例
//!
//! ```
//! use mp_foundation::units::UnitSystem;
//!
//! let units = UnitSystem::Legacy;
//! // 能量写入前乘以 1e-9（µJ -> J）
//! assert_eq!(units.scaling(1.0e-9), 1.0e-9);
//!
//! // 一致单位制下不做换算
//! assert_eq!(UnitSystem::Consistent.scaling(1.0e-9), 1.0);
//! ```

use serde::{Deserialize, Serialize};

/// 单位制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Legacy 单位（mm-g-s 体系），与下游分析工具约定一致
    #[default]
    Legacy,
    /// 一致单位制，换算系数恒为 1
    Consistent,
}

impl UnitSystem {
    /// 返回写出量的换算系数
    ///
    /// Legacy 模式返回给定的 Legacy 系数，一致单位制恒返回 1。
    #[inline]
    pub fn scaling(&self, legacy: f64) -> f64 {
        match self {
            Self::Legacy => legacy,
            Self::Consistent => 1.0,
        }
    }

    /// 归档时间戳的单位标签
    pub fn alt_time_label(&self) -> &'static str {
        match self {
            Self::Legacy => "ms",
            Self::Consistent => "s",
        }
    }

    /// 能量写出系数（粒子能量按 质量×比能 累积）
    #[inline]
    pub fn energy_scale(&self) -> f64 {
        self.scaling(1.0e-9)
    }

    /// 时间写出系数（秒 -> 归档时间戳单位）
    #[inline]
    pub fn time_scale(&self) -> f64 {
        self.scaling(1.0e3)
    }
}

impl std::fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "Legacy"),
            Self::Consistent => write!(f, "Consistent"),
        }
    }
}
