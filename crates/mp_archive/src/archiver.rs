// crates/mp_archive/src/archiver.rs

//! 归档编排
//!
//! [`Archiver`] 把调度、布局、序列化与文件写出串成一条归档管线。
//! 每个时间步结束后求解器调用一次 [`Archiver::archive_results`]：
//!
//! 1. 独立间隔的全局量先于粒子归档判定，两条时间线互不依赖；
//! 2. 未到归档时间则整步为空操作；
//! 3. 到期时**先**推进调度状态，再执行文件 IO：单个文件写失败不会
//!    让调度器退回重试，该时间点的文件直接放弃，下一次归档照常；
//! 4. 粒子与裂纹段写入同一个定长记录文件，粒子区并行序列化；
//! 5. 辅助导出挂钩最后触发。
//!
//! 单文件 IO 失败记录诊断后吞掉；分配失败与配置错误照常向上传播。

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, error, info};

use crate::config::ArchiveConfig;
use crate::crack::write_crack_segment;
use crate::error::{ArchiveError, ArchiveResult};
use crate::export::{AuxExporter, AuxSlot};
use crate::fields::CrackField;
use crate::global::{GlobalQuantity, GlobalSeries};
use crate::layout::{CompiledLayout, HEADER_LENGTH};
use crate::model::{GridInfo, SimulationFrame};
use crate::particle::write_particle;
use crate::schedule::Scheduler;
use mp_foundation::units::UnitSystem;

/// 下一时间步需要计算的裂纹尖端量
///
/// J 积分与应力强度因子只在即将归档的步上才值得计算，求解器据此
/// 决定是否执行昂贵的围道积分。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrackTerms {
    /// 需要 J 积分
    pub need_j: bool,
    /// 需要应力强度因子
    pub need_k: bool,
}

/// 归档编排器
///
/// 模拟开始时构建一次，生命周期覆盖整个运行。
pub struct Archiver {
    layout: CompiledLayout,
    scheduler: Scheduler,
    global: GlobalSeries,
    exporters: Vec<AuxSlot>,
    output_dir: PathBuf,
    archive_root: String,
    units: UnitSystem,
    archived_count: u64,
}

impl Archiver {
    /// 由配置与网格描述构建归档器
    ///
    /// 配置校验与时段表校验都在这里完成，任何违例在第一个文件打开
    /// 之前以致命错误返回。
    pub fn begin(config: &ArchiveConfig, grid: &GridInfo) -> ArchiveResult<Self> {
        config.validate()?;
        let scheduler = Scheduler::new(config.blocks.clone())?;
        let layout = CompiledLayout::compile(
            config.particle_selection(),
            config.crack_selection(),
            grid.dim,
            grid.structured,
            config.reverse_bytes,
        );
        let global = GlobalSeries::new(config.global_path(), config.global_interval, config.units);

        info!(
            root = %config.root_path().display(),
            particle_record = layout.particle_record_size,
            crack_record = layout.crack_record_size,
            common_record = layout.common_record_size,
            reverse = layout.reverse,
            time_unit = config.units.alt_time_label(),
            "archiver ready"
        );

        Ok(Self {
            layout,
            scheduler,
            global,
            exporters: Vec::new(),
            output_dir: config.output_dir.clone(),
            archive_root: config.archive_root.clone(),
            units: config.units,
            archived_count: 0,
        })
    }

    /// 登记一个全局量
    pub fn register_global(&mut self, quantity: Box<dyn GlobalQuantity>) {
        self.global.register(quantity);
    }

    /// 登记一个辅助导出挂钩
    pub fn register_exporter(&mut self, exporter: Box<dyn AuxExporter>, interval: Option<f64>) {
        self.exporters.push(AuxSlot::new(exporter, interval));
    }

    /// 裂纹扩展事件通知
    pub fn notify_propagation(&mut self) {
        self.scheduler.notify_propagation();
    }

    /// 强制下一次检查触发归档（粒子与全局量时间线都回拨）
    pub fn force_archiving(&mut self) {
        self.scheduler.force_next_archive();
        self.global.force_next();
    }

    /// 下一个时间步是否会归档
    pub fn will_archive(&self, time: f64, dt: f64) -> bool {
        self.scheduler.will_archive(time, dt)
    }

    /// 下一个时间步需要计算的裂纹尖端量
    ///
    /// 只有下一步会归档且对应字段被选中时才要求计算。
    pub fn crack_terms_needed(&self, time: f64, dt: f64) -> CrackTerms {
        if !self.scheduler.will_archive(time, dt) {
            return CrackTerms::default();
        }
        CrackTerms {
            need_j: self.layout.crack_selection.is_on(CrackField::JIntegral),
            need_k: self.layout.crack_selection.is_on(CrackField::StressIntensity),
        }
    }

    /// 下一计划归档时间
    pub fn next_archive_time(&self) -> f64 {
        self.scheduler.next_archive_time()
    }

    /// 已成功写出的归档文件数
    pub fn archived_count(&self) -> u64 {
        self.archived_count
    }

    /// 编译后的记录布局
    pub fn layout(&self) -> &CompiledLayout {
        &self.layout
    }

    /// 最近一次写出的全局量某列是否超过阈值
    pub fn global_passed(&self, index: usize, threshold: f64) -> bool {
        self.global.passed_last_archived(index, threshold)
    }

    /// 时间步结束后的归档检查与执行
    ///
    /// 可恢复的单文件 IO 失败在此吞掉（记录诊断，模拟继续）；
    /// 致命错误向上传播。
    pub fn archive_results(
        &mut self,
        time: f64,
        step: u64,
        frame: &SimulationFrame<'_>,
    ) -> ArchiveResult<()> {
        // 独立时间线的全局量与辅助导出：先于粒子归档判定
        if self.global.due(time) {
            if let Err(err) = self.global.record(frame, time) {
                self.report(err)?;
            }
        }
        self.run_exporters(true, frame, time, step)?;

        if !self.scheduler.should_archive(time) {
            return Ok(());
        }

        // 调度状态先于 IO 推进：写失败不重试该时间点
        self.scheduler.on_archived(time);

        if !self.global.independent() {
            if let Err(err) = self.global.record(frame, time) {
                self.report(err)?;
            }
        }

        let path = self.archive_path(step);
        info!(
            step,
            time_stamp = time * self.units.time_scale(),
            particles = frame.particles.len(),
            cracks = frame.cracks.len(),
            file = %path.display(),
            "archiving snapshot"
        );

        match self.write_archive_file(&path, time, frame) {
            Ok(bytes) => {
                self.archived_count += 1;
                debug!(step, bytes, "archive file written");
            }
            Err(err) => self.report(err)?,
        }

        // 跟随归档事件的辅助导出
        self.run_exporters(false, frame, time, step)?;

        Ok(())
    }

    /// 触发一类辅助导出挂钩（独立时间线或跟随归档事件）
    fn run_exporters(
        &mut self,
        independent: bool,
        frame: &SimulationFrame<'_>,
        time: f64,
        step: u64,
    ) -> ArchiveResult<()> {
        for slot in &mut self.exporters {
            if slot.independent() != independent || !slot.due(time) {
                continue;
            }
            let name = slot.name().to_string();
            if let Err(err) = slot.fire(frame, time, step) {
                error!(exporter = %name, %err, "auxiliary export failed");
                if !err.is_recoverable() {
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// 归档文件路径（`<dir>/<root>.<step>`）
    pub fn archive_path(&self, step: u64) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.archive_root, step))
    }

    /// 写出一个归档文件，返回字节数
    ///
    /// 整个文件先在内存中组装（分配失败为致命错误），粒子区按记录
    /// 并行序列化，随后一次性写盘。
    fn write_archive_file(
        &self,
        path: &std::path::Path,
        time: f64,
        frame: &SimulationFrame<'_>,
    ) -> ArchiveResult<usize> {
        let record = self.layout.common_record_size;
        let total = HEADER_LENGTH + (frame.particles.len() + frame.cracks.len()) * record;

        let mut buf: Vec<u8> = Vec::new();
        buf.try_reserve_exact(total)
            .map_err(|_| ArchiveError::Allocation { bytes: total })?;
        buf.resize(total, 0);

        let stamp = (time * self.units.time_scale()) as f32;
        buf[..HEADER_LENGTH].copy_from_slice(&self.layout.stamped_header(stamp));

        let (particle_region, crack_region) =
            buf[HEADER_LENGTH..].split_at_mut(frame.particles.len() * record);

        // 闭包只捕获布局与单位制，不把整个归档器带进并行域
        let layout = &self.layout;
        let units = self.units;
        particle_region
            .par_chunks_exact_mut(record)
            .zip(frame.particles.par_iter())
            .for_each(|(chunk, particle)| {
                write_particle(chunk, layout, particle, frame.materials, units);
            });

        for (chunk, segment) in crack_region.chunks_exact_mut(record).zip(frame.cracks) {
            write_crack_segment(chunk, layout, segment);
        }

        let mut file =
            File::create(path).map_err(|e| ArchiveError::io("create", path, e))?;
        file.write_all(&buf)
            .map_err(|e| ArchiveError::io("write", path, e))?;
        file.flush()
            .map_err(|e| ArchiveError::io("close", path, e))?;

        Ok(total)
    }

    /// 可恢复错误记诊断后吞掉，致命错误向上传播
    fn report(&self, err: ArchiveError) -> ArchiveResult<()> {
        if err.is_recoverable() {
            error!(%err, "archive output failed, continuing");
            Ok(())
        } else {
            Err(err)
        }
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CrackSegmentState, Dim, MaterialTable, ParticleState};
    use crate::schedule::ScheduleBlock;
    use glam::DVec3;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct CountingExporter(Arc<AtomicU32>);

    impl AuxExporter for CountingExporter {
        fn name(&self) -> &str {
            "counting"
        }
        fn export(
            &mut self,
            _: &SimulationFrame<'_>,
            _: f64,
            _: u64,
        ) -> ArchiveResult<()> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    struct UnitMaterials;
    impl MaterialTable for UnitMaterials {
        fn reference_density(&self, _: &ParticleState) -> f64 {
            1.0
        }
        fn relative_volume(&self, _: &ParticleState) -> f64 {
            1.0
        }
        fn history_value(&self, _: u32, _: &ParticleState) -> f64 {
            0.0
        }
        fn saturation(&self, _: &ParticleState) -> f64 {
            1.0
        }
    }

    fn test_grid() -> GridInfo {
        GridInfo::structured(Dim::Two, [5, 5, 1], DVec3::ZERO, DVec3::ONE)
    }

    fn test_config(dir: &std::path::Path) -> ArchiveConfig {
        ArchiveConfig {
            archive_root: "run".to_string(),
            output_dir: dir.to_path_buf(),
            blocks: vec![ScheduleBlock::new(1.0, 0.0)],
            ..Default::default()
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mp_archiver_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_begin_rejects_bad_schedule() {
        let config = ArchiveConfig {
            blocks: Vec::new(),
            ..Default::default()
        };
        let err = Archiver::begin(&config, &test_grid()).err().unwrap();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_archive_writes_file_with_header_and_records() {
        let dir = temp_dir("write");
        let grid = test_grid();
        let mut archiver = Archiver::begin(&test_config(&dir), &grid).unwrap();

        let materials = UnitMaterials;
        let particles = vec![ParticleState::default(), ParticleState::default()];
        let cracks = vec![CrackSegmentState::default()];
        let frame = SimulationFrame {
            particles: &particles,
            materials: &materials,
            cracks: &cracks,
            grid: &grid,
        };

        archiver.archive_results(0.0, 0, &frame).unwrap();
        assert_eq!(archiver.archived_count(), 1);

        let path = archiver.archive_path(0);
        let bytes = std::fs::read(&path).unwrap();
        let record = archiver.layout().common_record_size;
        assert_eq!(bytes.len(), HEADER_LENGTH + 3 * record);
        assert_eq!(&bytes[0..4], b"ver6");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_no_op_between_scheduled_times() {
        let dir = temp_dir("noop");
        let grid = test_grid();
        let mut archiver = Archiver::begin(&test_config(&dir), &grid).unwrap();
        let materials = UnitMaterials;
        let frame = SimulationFrame {
            particles: &[],
            materials: &materials,
            cracks: &[],
            grid: &grid,
        };

        archiver.archive_results(0.0, 0, &frame).unwrap();
        archiver.archive_results(0.5, 1, &frame).unwrap();
        assert_eq!(archiver.archived_count(), 1);
        assert!(!archiver.archive_path(1).exists());

        archiver.archive_results(1.0, 2, &frame).unwrap();
        assert_eq!(archiver.archived_count(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_failed_write_advances_schedule_anyway() {
        // 输出目录不存在：写失败是可恢复错误，调度状态照常推进
        let dir = std::env::temp_dir().join(format!("mp_archiver_missing_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let grid = test_grid();
        let mut archiver = Archiver::begin(&test_config(&dir), &grid).unwrap();
        let materials = UnitMaterials;
        let frame = SimulationFrame {
            particles: &[],
            materials: &materials,
            cracks: &[],
            grid: &grid,
        };

        archiver.archive_results(0.0, 0, &frame).unwrap();
        assert_eq!(archiver.archived_count(), 0);
        assert_eq!(archiver.next_archive_time(), 1.0);
    }

    #[test]
    fn test_timestamp_in_header_uses_legacy_units() {
        let dir = temp_dir("stamp");
        let grid = test_grid();
        let mut archiver = Archiver::begin(&test_config(&dir), &grid).unwrap();
        let materials = UnitMaterials;
        let frame = SimulationFrame {
            particles: &[],
            materials: &materials,
            cracks: &[],
            grid: &grid,
        };

        // 强制在 t=0.25 s 归档：Legacy 时间戳为 250 ms
        archiver.force_archiving();
        archiver.archive_results(0.25, 3, &frame).unwrap();

        let bytes = std::fs::read(archiver.archive_path(3)).unwrap();
        let at = archiver.layout().timestamp_offset();
        let stamp = f32::from_ne_bytes(bytes[at..at + 4].try_into().unwrap());
        assert_eq!(stamp, 250.0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_parallel_write_with_registered_exporter() {
        // 登记了挂钩的归档器仍能并行序列化粒子区
        let dir = temp_dir("parallel");
        let grid = test_grid();
        let mut archiver = Archiver::begin(&test_config(&dir), &grid).unwrap();
        let hits = Arc::new(AtomicU32::new(0));
        archiver.register_exporter(Box::new(CountingExporter(hits.clone())), None);

        let materials = UnitMaterials;
        let particles: Vec<ParticleState> = (0..64)
            .map(|i| ParticleState {
                elem_id: i + 1,
                mass: (i + 1) as f64,
                ..Default::default()
            })
            .collect();
        let frame = SimulationFrame {
            particles: &particles,
            materials: &materials,
            cracks: &[],
            grid: &grid,
        };

        archiver.archive_results(0.0, 0, &frame).unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 1);

        let record = archiver.layout().common_record_size;
        let bytes = std::fs::read(archiver.archive_path(0)).unwrap();
        for i in 0..64usize {
            let at = HEADER_LENGTH + i * record;
            let id = i32::from_ne_bytes(bytes[at..at + 4].try_into().unwrap());
            assert_eq!(id, i as i32 + 1);
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_independent_exporter_fires_between_archives() {
        // 自带间隔的挂钩按自身时间线触发，不受粒子归档间隔限制
        let dir = temp_dir("indep");
        let grid = test_grid();
        let mut archiver = Archiver::begin(&test_config(&dir), &grid).unwrap();
        let hits = Arc::new(AtomicU32::new(0));
        archiver.register_exporter(Box::new(CountingExporter(hits.clone())), Some(0.5));

        let materials = UnitMaterials;
        let frame = SimulationFrame {
            particles: &[],
            materials: &materials,
            cracks: &[],
            grid: &grid,
        };

        // 粒子归档间隔 1.0；挂钩间隔 0.5 在中间步也触发
        archiver.archive_results(0.0, 0, &frame).unwrap();
        archiver.archive_results(0.5, 1, &frame).unwrap();
        archiver.archive_results(1.0, 2, &frame).unwrap();

        assert_eq!(archiver.archived_count(), 2);
        assert_eq!(hits.load(Ordering::Relaxed), 3);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_crack_terms_only_when_archiving_next_step() {
        let dir = temp_dir("terms");
        let grid = test_grid();
        let mut config = test_config(&dir);
        config.crack_order = "mYYY".to_string(); // J 积分 + 应力强度
        let mut archiver = Archiver::begin(&config, &grid).unwrap();
        let materials = UnitMaterials;
        let frame = SimulationFrame {
            particles: &[],
            materials: &materials,
            cracks: &[],
            grid: &grid,
        };
        archiver.archive_results(0.0, 0, &frame).unwrap(); // next = 1.0

        assert_eq!(archiver.crack_terms_needed(0.5, 0.1), CrackTerms::default());
        let terms = archiver.crack_terms_needed(0.95, 0.1);
        assert!(terms.need_j);
        assert!(terms.need_k);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
