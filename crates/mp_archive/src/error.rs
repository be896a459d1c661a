// crates/mp_archive/src/error.rs

//! 归档子系统错误类型
//!
//! 错误分为两类：
//!
//! - **致命配置错误**（非单调的归档时段、空时段表、记录缓冲分配失败）：
//!   在任何文件打开之前浮出，终止运行；
//! - **可恢复 IO 错误**（单个归档文件的打开/写入/关闭失败）：
//!   在最窄的作用域捕获，记录诊断后放弃该文件，模拟继续。
//!
//! 通过 [`ArchiveError::is_recoverable`] 区分两类。所有错误最终可
//! 转换为 `MpError` 以实现跨层传递。

use std::path::PathBuf;

use mp_foundation::MpError;
use thiserror::Error;

/// 归档子系统结果类型别名
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// 归档错误枚举
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// 归档配置错误（时段表、字段选择串等），致命
    #[error("归档配置错误: {message}")]
    Config {
        /// 具体错误信息
        message: String,
    },

    /// 归档时段表无效，致命
    #[error("归档时段表无效: {message}")]
    Schedule {
        /// 具体错误信息
        message: String,
    },

    /// 记录缓冲分配失败，致命
    #[error("记录缓冲分配失败: 请求 {bytes} 字节")]
    Allocation {
        /// 请求的字节数
        bytes: usize,
    },

    /// 单个文件的 IO 失败，可恢复
    ///
    /// `source` 的 Display 含操作系统错误码（"os error N"）。
    #[error("文件操作失败 [{op}]: {path}: {source}")]
    Io {
        /// 失败的操作（open/write/close）
        op: &'static str,
        /// 目标文件
        path: PathBuf,
        /// 底层 IO 错误
        #[source]
        source: std::io::Error,
    },

    /// 基础层错误转换
    #[error("基础层错误: {0}")]
    Foundation(#[from] MpError),
}

impl ArchiveError {
    /// 配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// 时段表错误
    pub fn schedule(message: impl Into<String>) -> Self {
        Self::Schedule {
            message: message.into(),
        }
    }

    /// 文件 IO 错误
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// 是否可恢复
    ///
    /// 仅单文件 IO 失败可恢复：放弃该文件、记录诊断后继续运行。
    /// 其余错误均为致命配置/资源错误。
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

impl From<ArchiveError> for MpError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Config { message } => MpError::config(message),
            ArchiveError::Schedule { message } => {
                MpError::config(format!("归档时段表无效: {message}"))
            }
            ArchiveError::Allocation { bytes } => MpError::allocation(bytes, "archive record"),
            ArchiveError::Io { op, path, source } => {
                MpError::io_with_source(format!("文件操作失败 [{op}]: {}", path.display()), source)
            }
            ArchiveError::Foundation(mp_err) => mp_err,
        }
    }
}
