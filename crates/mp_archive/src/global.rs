// crates/mp_archive/src/global.rs

//! 全局量时间序列
//!
//! 除逐粒子归档文件外，模拟可以登记若干标量全局量（总能量、合力、
//! 平均应力等），按自己的节奏追加到一个制表符分隔的文本文件。
//!
//! - 未登记任何全局量时整条路径静默跳过，不创建文件；
//! - 文件惰性创建：首次写入时才打开，并先写 `#setColor` 与
//!   `#setName` 两行头（颜色与列名，下游绘图工具识别）；
//! - 独立间隔模式下到期判定为严格大于（恰好等于下次时间的步不写，
//!   下一步写），无独立间隔时跟随粒子归档事件；
//! - 单行写入失败是可恢复错误，由调用方记录诊断后继续。

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ArchiveError, ArchiveResult};
use crate::model::SimulationFrame;
use mp_foundation::units::UnitSystem;

/// 一个可归档的标量全局量
///
/// 求值在归档屏障处进行，快照只读。实现方负责自己的归约（对粒子
/// 求和、取最值等）。
pub trait GlobalQuantity: Send + Sync {
    /// 列名（写入文件头）
    fn name(&self) -> &str;

    /// 绘图颜色（写入 `#setColor` 头行，下游绘图工具使用）
    fn color(&self) -> &str {
        "black"
    }

    /// 在当前快照上求值
    fn evaluate(&self, frame: &SimulationFrame<'_>, time: f64) -> f64;
}

/// 全局量时间序列写出器
pub struct GlobalSeries {
    path: PathBuf,
    quantities: Vec<Box<dyn GlobalQuantity>>,
    /// 独立归档间隔；None 表示跟随粒子归档事件
    interval: Option<f64>,
    next_time: f64,
    /// 最近一次写出的值（按登记顺序）
    last_values: Vec<f64>,
    header_written: bool,
    units: UnitSystem,
}

impl GlobalSeries {
    /// 创建写出器
    ///
    /// `interval` 为独立归档间隔；None 时跟随粒子归档。文件此时
    /// 不创建。
    pub fn new(path: impl Into<PathBuf>, interval: Option<f64>, units: UnitSystem) -> Self {
        Self {
            path: path.into(),
            quantities: Vec::new(),
            interval,
            next_time: 0.0,
            last_values: Vec::new(),
            header_written: false,
            units,
        }
    }

    /// 登记一个全局量
    pub fn register(&mut self, quantity: Box<dyn GlobalQuantity>) {
        self.quantities.push(quantity);
    }

    /// 是否未登记任何全局量
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// 是否按独立间隔运行
    #[inline]
    pub fn independent(&self) -> bool {
        self.interval.is_some()
    }

    /// 独立间隔模式下是否到期（严格大于）
    pub fn due(&self, time: f64) -> bool {
        !self.is_empty() && self.interval.is_some() && time > self.next_time
    }

    /// 强制下一次检查到期
    pub fn force_next(&mut self) {
        if let Some(interval) = self.interval {
            self.next_time -= interval;
        }
    }

    /// 输出文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 求值并追加一行
    ///
    /// 时间换算到归档时间单位后作为首列。写入失败返回可恢复 IO
    /// 错误；求值结果仍会保留在 `last_values` 中。
    pub fn record(&mut self, frame: &SimulationFrame<'_>, time: f64) -> ArchiveResult<()> {
        if self.is_empty() {
            return Ok(());
        }

        self.last_values.clear();
        for q in &self.quantities {
            self.last_values.push(q.evaluate(frame, time));
        }
        if let Some(interval) = self.interval {
            self.next_time += interval;
        }

        let mut line = format!("{:e}", time * self.units.time_scale());
        for v in &self.last_values {
            line.push('\t');
            line.push_str(&format!("{v:e}"));
        }
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ArchiveError::io("打开全局量文件", &self.path, e))?;
        if !self.header_written {
            // 两行头只罗列登记的全局量，首列时间不占头部槽位
            let mut colors = String::from("#setColor");
            let mut names = String::from("#setName");
            for q in &self.quantities {
                colors.push('\t');
                colors.push_str(q.color());
                names.push('\t');
                names.push_str(q.name());
            }
            let header = format!("{colors}\n{names}\n");
            file.write_all(header.as_bytes())
                .map_err(|e| ArchiveError::io("写全局量文件头", &self.path, e))?;
            self.header_written = true;
        }
        file.write_all(line.as_bytes())
            .map_err(|e| ArchiveError::io("追加全局量", &self.path, e))?;

        Ok(())
    }

    /// 最近一次写出的某列值是否越过判据值
    ///
    /// 用于裂纹扩展等判据：以上一次归档值为参照，而不是当前瞬时值。
    /// 判据值非负时检查 `值 >= 判据`，为负时检查 `值 <= 判据`
    /// （负向判据用于朝负方向增长的量）。
    pub fn passed_last_archived(&self, index: usize, critical: f64) -> bool {
        self.last_values.get(index).is_some_and(|&v| {
            if critical >= 0.0 {
                v >= critical
            } else {
                v <= critical
            }
        })
    }
}

// ============================================================
// 测试
// ============================================================
