// crates/mp_archive/src/schedule.rs

//! 归档调度引擎
//!
//! 归档时间轴由若干连续的时段（block）组成，每个时段有自己的归档
//! 间隔与可选的裂纹扩展次数上限。调度器在每个时间步回答"现在是否
//! 归档"，并在归档后推进内部状态：
//!
//! - 到达 `next_archive_time` 时归档；
//! - 当前时段声明了扩展上限且累计扩展次数达到上限时，提前强制归档；
//! - 进入下一时段时把 `next_archive_time` 钳到该时段声明的起点，
//!   时段切换既不会漏掉归档，也不会使时间倒退；
//! - 最后一个时段无限沿用。
//!
//! # 校验（致命配置错误，先于任何文件打开）
//!
//! - 时段表为空：归档无法进行；
//! - 时段起点未严格递增（含两个时段同起点）：拒绝，不做静默取舍。
//!
//! # 哨兵时段
//!
//! 配置允许 0 号时段以负间隔作哨兵：间隔取 1 号时段的起点（起点归
//! 零）；若 1 号时段起点不大于零，0 号时段整体跳过。

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, ArchiveResult};

/// 一个归档时段
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleBlock {
    /// 归档间隔（秒）；0 号时段允许负值哨兵
    pub interval: f64,
    /// 时段起始时间（秒）
    #[serde(default)]
    pub start: f64,
    /// 强制归档前允许的裂纹扩展次数，0 表示不限制
    #[serde(default)]
    pub max_props: i32,
}

impl ScheduleBlock {
    /// 创建时段
    pub fn new(interval: f64, start: f64) -> Self {
        Self {
            interval,
            start,
            max_props: 0,
        }
    }

    /// 设置扩展次数上限
    pub fn with_max_props(mut self, max_props: i32) -> Self {
        self.max_props = max_props;
        self
    }
}

/// 归档调度器
///
/// 模拟开始时初始化一次，整个运行期间持有；只在"是否归档"检查、
/// 归档完成回调与扩展事件通知中被修改。
#[derive(Debug, Clone)]
pub struct Scheduler {
    blocks: Vec<ScheduleBlock>,
    block: usize,
    next_time: f64,
    prop_count: i32,
}

impl Scheduler {
    /// 由时段表构建调度器
    ///
    /// 先解析哨兵时段，再校验起点严格递增、间隔为正；任何违例都是
    /// 致命配置错误。首次归档安排在 t=0。
    pub fn new(mut blocks: Vec<ScheduleBlock>) -> ArchiveResult<Self> {
        if blocks.is_empty() {
            return Err(ArchiveError::schedule("时段表为空，无法归档"));
        }

        // 哨兵：0 号时段负间隔 -> 以 1 号时段起点为间隔
        let mut first = 0;
        if blocks.len() > 1 && blocks[0].interval < 0.0 {
            blocks[0].interval = blocks[1].start;
            blocks[0].start = 0.0;
            if blocks[1].start <= 0.0 {
                first = 1;
            }
        }

        for i in first..blocks.len() {
            let b = &blocks[i];
            if b.interval <= 0.0 {
                return Err(ArchiveError::schedule(format!(
                    "时段 {i} 的归档间隔必须为正（实际 {}）",
                    b.interval
                )));
            }
            if i + 1 < blocks.len() && b.start >= blocks[i + 1].start {
                return Err(ArchiveError::schedule(format!(
                    "时段起点必须严格递增: 时段 {i} 起点 {} >= 时段 {} 起点 {}",
                    b.start,
                    i + 1,
                    blocks[i + 1].start
                )));
            }
        }

        Ok(Self {
            blocks,
            block: first,
            next_time: 0.0,
            prop_count: 0,
        })
    }

    /// 现在是否应当归档
    ///
    /// 到达下一归档时间，或当前时段的扩展上限已被累计扩展次数达到
    /// （允许裂纹扩展在计划时间之前触发带外归档）。
    pub fn should_archive(&self, time: f64) -> bool {
        if time >= self.next_time {
            return true;
        }
        let cap = self.blocks[self.block].max_props;
        cap > 0 && self.prop_count >= cap
    }

    /// 归档完成回调
    ///
    /// 清零扩展计数。计划内归档从上一个 `next` 沿原时间格点推进一个
    /// 间隔；只有扩展计数强制的带外归档（时间尚未到 `next`）才以当前
    /// 时间重新起算。若推进后已到达下一时段的声明起点，切换时段并把
    /// `next` 钳到该起点。
    pub fn on_archived(&mut self, time: f64) {
        self.prop_count = 0;
        if time < self.next_time {
            self.next_time = time;
        }
        self.next_time += self.blocks[self.block].interval;
        if let Some(next_block) = self.blocks.get(self.block + 1) {
            if self.next_time >= next_block.start {
                self.block += 1;
                self.next_time = self.blocks[self.block].start;
            }
        }
    }

    /// 裂纹扩展事件通知（由裂纹扩展逻辑调用）
    pub fn notify_propagation(&mut self) {
        self.prop_count += 1;
    }

    /// 强制下一次检查触发归档
    ///
    /// 把 `next_archive_time` 回拨恰好一个当前时段间隔；之后的归档
    /// 仍落在原时间格点上，而不是以"现在"重新起算。
    pub fn force_next_archive(&mut self) {
        self.next_time -= self.blocks[self.block].interval;
    }

    /// 下一计划归档时间
    #[inline]
    pub fn next_archive_time(&self) -> f64 {
        self.next_time
    }

    /// 下一个时间步（步长 dt）是否会归档
    #[inline]
    pub fn will_archive(&self, time: f64, dt: f64) -> bool {
        time + dt >= self.next_time
    }

    /// 当前时段下标
    #[inline]
    pub fn active_block(&self) -> usize {
        self.block
    }

    /// 当前累计扩展次数
    #[inline]
    pub fn propagation_count(&self) -> i32 {
        self.prop_count
    }
}

// ============================================================
// 测试
// ============================================================
