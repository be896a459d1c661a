// crates/mp_foundation/src/lib.rs

//! MicroPoint Foundation Layer
//!
//! 基础层，提供整个项目共用的基础抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型
//! - [`units`]: 单位制换算（Legacy / 一致单位制）
//!
//! # 设计原则
//!
//! 1. **最小依赖**: 仅依赖 serde 和 thiserror
//! 2. **跨层传递**: 各子系统错误最终可转换为 [`MpError`]
//!
//! # 示例
//!
//! ```
//! use mp_foundation::{MpError, MpResult, UnitSystem};
//!
//! fn read_config() -> MpResult<()> {
//!     Err(MpError::config("配置文件格式错误"))
//! }
//!
//! let units = UnitSystem::Legacy;
//! assert_eq!(units.scaling(1.0e-9), 1.0e-9);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod units;

// 重导出常用类型
pub use error::{MpError, MpResult};
pub use units::UnitSystem;

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{MpError, MpResult};
    pub use crate::units::UnitSystem;
}
