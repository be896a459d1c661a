// crates/mp_archive/src/export.rs

//! 辅助导出挂钩
//!
//! 逐粒子归档文件之外的附加导出（可视化切片、自定义抽取等）以
//! 挂钩形式登记。每个挂钩可声明自己的间隔：无间隔时跟随每次粒子
//! 归档事件，有间隔时按自身时间线在每个时间步检查，与粒子归档
//! 是否发生无关。挂钩的 IO 失败与归档文件同级：可恢复，记录诊断
//! 后继续。

use crate::error::ArchiveResult;
use crate::model::SimulationFrame;

/// 一个辅助导出器
///
/// 在粒子归档屏障处被调用，快照只读。实现方自行负责输出文件的
/// 命名与格式。
pub trait AuxExporter: Send {
    /// 导出器名称（诊断用）
    fn name(&self) -> &str;

    /// 在当前快照上执行一次导出
    fn export(&mut self, frame: &SimulationFrame<'_>, time: f64, step: u64) -> ArchiveResult<()>;
}

/// 登记在册的辅助导出挂钩
pub struct AuxSlot {
    exporter: Box<dyn AuxExporter>,
    /// 最小触发间隔；None 表示每次粒子归档都触发
    interval: Option<f64>,
    next_time: f64,
}

impl AuxSlot {
    /// 登记导出器
    pub fn new(exporter: Box<dyn AuxExporter>, interval: Option<f64>) -> Self {
        Self {
            exporter,
            interval,
            next_time: 0.0,
        }
    }

    /// 是否按独立时间线运行（声明了自己的间隔）
    #[inline]
    pub fn independent(&self) -> bool {
        self.interval.is_some()
    }

    /// 当前时间是否触发该挂钩
    pub fn due(&self, time: f64) -> bool {
        match self.interval {
            None => true,
            Some(_) => time >= self.next_time,
        }
    }

    /// 导出器名称
    pub fn name(&self) -> &str {
        self.exporter.name()
    }

    /// 执行导出并推进下次触发时间
    ///
    /// 先推进时间再执行：导出失败不重试，下一次按计划触发。
    pub fn fire(&mut self, frame: &SimulationFrame<'_>, time: f64, step: u64) -> ArchiveResult<()> {
        if let Some(interval) = self.interval {
            self.next_time = time + interval;
        }
        self.exporter.export(frame, time, step)
    }
}

// ============================================================
// 测试
// ============================================================
