// crates/mp_archive/src/layout.rs

//! 记录布局编译
//!
//! 由归一化后的字段选择与计算维度，编译出粒子/裂纹记录的精确字节
//! 布局与定长文件头。粒子记录与裂纹记录共用同一个定长记录文件，
//! 记录长度取两者的最大值，不足部分显式补零。
//!
//! # 文件头（64 字节，ver6）
//!
//! ```text
//! [0..4)   版本标签 "ver6"
//! [4]      粒子标志串长度 (18)
//! [5..23)  粒子标志串（槽位 0 为实际输出字节序标记）
//! [23]     裂纹标志串长度 (5)
//! [24..29) 裂纹标志串
//! [29]     维度字符 '2'/'3'
//! [30]     结构化网格字符 '0'/'1'
//! [31..35) f32 时间戳槽位（写文件时填入，按实际输出字节序）
//! [35..64) 零填充
//! ```
//!
//! # 设计
//!
//! 每个字段编译为一个跨度（字段号 + 字长序列）。同一张跨度表同时
//! 驱动三件事：记录长度求和、写出顺序、以及逐字段的字节序反转，
//! 三条路径共用同一个维度判定，不允许各自分叉。
//!
//! 字长固定（整数 4 字节、短整数 2 字节、浮点 8 字节），不随平台
//! `size_of` 变化，保证归档文件跨机器一致。

use crate::fields::{
    CrackField, CrackSelection, ParticleField, ParticleSelection, CRACK_FIELD_COUNT,
    PARTICLE_FIELD_COUNT,
};
use crate::model::Dim;

/// 文件头定长（一次运行内所有归档文件相同，读取方可直接跳过）
pub const HEADER_LENGTH: usize = 64;

/// 格式版本标签
pub const VERSION_TAG: &[u8; 4] = b"ver6";

// ============================================================
// 字节序
// ============================================================

/// 字节序标记
///
/// 文件头记录的是*实际输出*的字节序：本机字节序与反转开关共同
/// 决定，读取方据此解析，无需了解写出机器。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrderMark {
    /// 小端（标记字符 'i'）
    Little,
    /// 大端（标记字符 'm'）
    Big,
}

impl ByteOrderMark {
    /// 本机字节序
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::Little
        } else {
            Self::Big
        }
    }

    /// 相反字节序
    pub fn flipped(&self) -> Self {
        match self {
            Self::Little => Self::Big,
            Self::Big => Self::Little,
        }
    }

    /// 标志串/文件头中的标记字符
    pub fn mark(&self) -> u8 {
        match self {
            Self::Little => b'i',
            Self::Big => b'm',
        }
    }
}

// ============================================================
// 字与跨度
// ============================================================

/// 记录中的一个字（定宽）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Word {
    /// 4 字节有符号整数
    I32,
    /// 2 字节有符号整数
    I16,
    /// 8 字节浮点
    F64,
    /// 4 字节浮点
    F32,
    /// 对齐填充（不参与字节序反转）
    Pad(u8),
}

impl Word {
    /// 字节宽度
    #[inline]
    pub fn size(&self) -> usize {
        match self {
            Self::I32 | Self::F32 => 4,
            Self::I16 => 2,
            Self::F64 => 8,
            Self::Pad(n) => *n as usize,
        }
    }

    /// 是否需要字节序反转
    #[inline]
    pub fn is_multibyte(&self) -> bool {
        !matches!(self, Self::Pad(_))
    }
}

/// 一个字段在记录中的跨度
#[derive(Debug, Clone)]
pub struct Span<F> {
    /// 字段号
    pub field: F,
    /// 字长序列
    pub words: Vec<Word>,
}

impl<F> Span<F> {
    fn new(field: F, words: Vec<Word>) -> Self {
        Self { field, words }
    }

    /// 跨度字节数
    pub fn byte_len(&self) -> usize {
        self.words.iter().map(Word::size).sum()
    }
}

fn spans_byte_len<F>(spans: &[Span<F>]) -> usize {
    spans.iter().map(Span::byte_len).sum()
}

// ============================================================
// 跨度表构建
// ============================================================

fn f64s(n: usize) -> Vec<Word> {
    vec![Word::F64; n]
}

/// 粒子记录的规范跨度表（仅含启用字段，按记录顺序）
fn particle_spans(sel: &ParticleSelection, dim: Dim) -> Vec<Span<ParticleField>> {
    let v = dim.vector_components();
    let t = dim.tensor_components();
    let mut spans = Vec::new();

    // 固定前导：单元号、质量、材料号(+2 对齐)、转角（3D 三个角，
    // 2D 一个角加厚度）、位置、初始位置
    let mut defaults = vec![Word::I32, Word::F64, Word::I16, Word::Pad(2)];
    if dim.is_three() {
        defaults.extend(f64s(3));
    } else {
        defaults.extend(f64s(2));
    }
    defaults.extend(f64s(v)); // pos
    defaults.extend(f64s(v)); // orig pos
    spans.push(Span::new(ParticleField::Defaults, defaults));

    if sel.is_on(ParticleField::Velocity) {
        spans.push(Span::new(ParticleField::Velocity, f64s(v)));
    }
    if sel.is_on(ParticleField::Stress) {
        spans.push(Span::new(ParticleField::Stress, f64s(t)));
    }
    if sel.is_on(ParticleField::ElasticStrain) {
        spans.push(Span::new(ParticleField::ElasticStrain, f64s(t)));
    }
    if sel.is_on(ParticleField::PlasticStrain) {
        spans.push(Span::new(ParticleField::PlasticStrain, f64s(t)));
    }
    if sel.is_on(ParticleField::WorkEnergy) {
        spans.push(Span::new(ParticleField::WorkEnergy, f64s(1)));
    }
    if sel.is_on(ParticleField::Temperature) {
        spans.push(Span::new(ParticleField::Temperature, f64s(1)));
    }
    if sel.is_on(ParticleField::PlasticEnergy) {
        spans.push(Span::new(ParticleField::PlasticEnergy, f64s(1)));
    }
    if sel.is_on(ParticleField::ShearComponents) {
        spans.push(Span::new(ParticleField::ShearComponents, f64s(2)));
    }
    if sel.is_on(ParticleField::StrainEnergy) {
        spans.push(Span::new(ParticleField::StrainEnergy, f64s(1)));
    }
    let history_count = sel.history().value_count();
    if history_count > 0 {
        spans.push(Span::new(ParticleField::History, f64s(history_count)));
    }
    if sel.is_on(ParticleField::Concentration) {
        spans.push(Span::new(ParticleField::Concentration, f64s(1 + v)));
    }
    if sel.is_on(ParticleField::HeatEnergy) {
        spans.push(Span::new(ParticleField::HeatEnergy, f64s(1)));
    }
    if sel.is_on(ParticleField::ElementCrossings) {
        spans.push(Span::new(ParticleField::ElementCrossings, vec![Word::I32]));
    }
    if sel.is_on(ParticleField::RotStrain) {
        let n = if dim.is_three() { 3 } else { 1 };
        spans.push(Span::new(ParticleField::RotStrain, f64s(n)));
    }

    spans
}

/// 裂纹记录的规范跨度表
///
/// 裂纹几何为平面几何，位置向量固定两个分量，与计算维度无关。
fn crack_spans(sel: &CrackSelection) -> Vec<Span<CrackField>> {
    let mut spans = Vec::new();

    // 固定前导：裂纹面单元号、内聚区能量槽位、新裂纹标记(+2 对齐)、
    // 位置、初始位置、上表面单元号与位置、下表面单元号与位置
    let mut defaults = vec![Word::I32, Word::F64, Word::I16, Word::Pad(2)];
    defaults.extend(f64s(2)); // pos
    defaults.extend(f64s(2)); // orig pos
    defaults.push(Word::I32);
    defaults.extend(f64s(2)); // above
    defaults.push(Word::I32);
    defaults.extend(f64s(2)); // below
    spans.push(Span::new(CrackField::Defaults, defaults));

    if sel.is_on(CrackField::JIntegral) {
        spans.push(Span::new(CrackField::JIntegral, f64s(2)));
    }
    if sel.is_on(CrackField::StressIntensity) {
        spans.push(Span::new(CrackField::StressIntensity, f64s(2)));
    }
    if sel.is_on(CrackField::BalanceResults) {
        spans.push(Span::new(
            CrackField::BalanceResults,
            vec![Word::I32, Word::F64, Word::F64],
        ));
    }

    spans
}

// ============================================================
// 编译结果
// ============================================================

/// 编译后的记录布局
///
/// 一次运行编译一次，之后所有归档文件共用。
#[derive(Debug, Clone)]
pub struct CompiledLayout {
    /// 计算维度
    pub dim: Dim,
    /// 写出时是否逐字段反转字节
    pub reverse: bool,
    /// 实际输出字节序
    pub order: ByteOrderMark,
    /// 归一化后的粒子字段选择（含字节序标记）
    pub particle_selection: ParticleSelection,
    /// 归一化后的裂纹字段选择
    pub crack_selection: CrackSelection,
    /// 粒子跨度表
    pub particle_spans: Vec<Span<ParticleField>>,
    /// 裂纹跨度表
    pub crack_spans: Vec<Span<CrackField>>,
    /// 粒子记录字节数
    pub particle_record_size: usize,
    /// 裂纹记录字节数
    pub crack_record_size: usize,
    /// 共用记录字节数（两者最大值）
    pub common_record_size: usize,
    /// 文件头（时间戳槽位为零）
    header: [u8; HEADER_LENGTH],
    /// 时间戳槽位偏移
    timestamp_offset: usize,
}

impl CompiledLayout {
    /// 编译记录布局
    ///
    /// `reverse` 为反转开关：开启时输出与本机相反的字节序，文件头
    /// 记录反转后的实际字节序。
    pub fn compile(
        mut particle_selection: ParticleSelection,
        mut crack_selection: CrackSelection,
        dim: Dim,
        structured: bool,
        reverse: bool,
    ) -> Self {
        let order = if reverse {
            ByteOrderMark::native().flipped()
        } else {
            ByteOrderMark::native()
        };
        particle_selection.set_byte_order(order.mark());
        crack_selection.set_byte_order(order.mark());

        let particle_spans = particle_spans(&particle_selection, dim);
        let crack_spans = crack_spans(&crack_selection);
        let particle_record_size = spans_byte_len(&particle_spans);
        let crack_record_size = spans_byte_len(&crack_spans);
        let common_record_size = particle_record_size.max(crack_record_size);

        let (header, timestamp_offset) =
            build_header(&particle_selection, &crack_selection, dim, structured);

        Self {
            dim,
            reverse,
            order,
            particle_selection,
            crack_selection,
            particle_spans,
            crack_spans,
            particle_record_size,
            crack_record_size,
            common_record_size,
            header,
            timestamp_offset,
        }
    }

    /// 带时间戳的文件头
    ///
    /// `stamp` 为归档时间（已换算到归档时间单位）；时间戳按实际
    /// 输出字节序写入槽位。
    pub fn stamped_header(&self, stamp: f32) -> [u8; HEADER_LENGTH] {
        let mut header = self.header;
        let mut bytes = stamp.to_ne_bytes();
        if self.reverse {
            bytes.reverse();
        }
        header[self.timestamp_offset..self.timestamp_offset + 4].copy_from_slice(&bytes);
        header
    }

    /// 时间戳槽位偏移（读取方用）
    pub fn timestamp_offset(&self) -> usize {
        self.timestamp_offset
    }
}

/// 构建定长文件头，返回（头部，时间戳槽位偏移）
fn build_header(
    particle_selection: &ParticleSelection,
    crack_selection: &CrackSelection,
    dim: Dim,
    structured: bool,
) -> ([u8; HEADER_LENGTH], usize) {
    let mut header = [0u8; HEADER_LENGTH];
    let mut at = 0;

    header[at..at + 4].copy_from_slice(VERSION_TAG);
    at += 4;

    header[at] = PARTICLE_FIELD_COUNT as u8;
    at += 1;
    header[at..at + PARTICLE_FIELD_COUNT].copy_from_slice(particle_selection.as_bytes());
    at += PARTICLE_FIELD_COUNT;

    header[at] = CRACK_FIELD_COUNT as u8;
    at += 1;
    header[at..at + CRACK_FIELD_COUNT].copy_from_slice(crack_selection.as_bytes());
    at += CRACK_FIELD_COUNT;

    header[at] = dim.header_char();
    at += 1;
    header[at] = if structured { b'1' } else { b'0' };
    at += 1;

    // 时间戳槽位保持为零，写文件时填入
    (header, at)
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{DEFAULT_CRACK_ORDER, DEFAULT_PARTICLE_ORDER};

    fn compile(particle: &str, crack: &str, dim: Dim) -> CompiledLayout {
        CompiledLayout::compile(
            ParticleSelection::normalize(particle),
            CrackSelection::normalize(crack),
            dim,
            true,
            false,
        )
    }

    #[test]
    fn test_defaults_only_sizes() {
        // 仅固定前导：2D 64 字节，3D 88 字节
        let l2 = compile("mY", "mY", Dim::Two);
        assert_eq!(l2.particle_record_size, 64);
        let l3 = compile("mY", "mY", Dim::Three);
        assert_eq!(l3.particle_record_size, 88);
        // 裂纹前导固定 88 字节
        assert_eq!(l2.crack_record_size, 88);
        assert_eq!(l3.crack_record_size, 88);
    }

    #[test]
    fn test_common_is_max() {
        let l = compile("mY", "mYYYY", Dim::Two);
        assert_eq!(l.crack_record_size, 88 + 16 + 16 + 20);
        assert_eq!(l.common_record_size, l.crack_record_size.max(l.particle_record_size));
        assert!(l.particle_record_size <= l.common_record_size);
        assert!(l.crack_record_size <= l.common_record_size);
    }

    #[test]
    fn test_default_order_sizes() {
        // 默认串：前导 + 速度 + 应力 + 弹性应变 + 塑性应变 + 功 +
        // 温度 + 塑性能 + RotStrain（派生）
        let l2 = compile(DEFAULT_PARTICLE_ORDER, DEFAULT_CRACK_ORDER, Dim::Two);
        assert_eq!(
            l2.particle_record_size,
            64 + 16 + 32 + 32 + 32 + 8 + 8 + 8 + 8
        );
        let l3 = compile(DEFAULT_PARTICLE_ORDER, DEFAULT_CRACK_ORDER, Dim::Three);
        assert_eq!(
            l3.particle_record_size,
            88 + 24 + 48 + 48 + 48 + 8 + 8 + 8 + 24
        );
    }

    #[test]
    fn test_3d_size_delta_matches_added_components() {
        // 同一字段集下，3D 超出 2D 的字节数 = 每向量 1 分量 +
        // 每张量 2 分量 + 前导 1 个转角 + RotStrain 2 个角
        let order = "mYYYYYNYYYNYYNYYYN"; // 开启大部分字段
        let l2 = compile(order, DEFAULT_CRACK_ORDER, Dim::Two);
        let l3 = compile(order, DEFAULT_CRACK_ORDER, Dim::Three);

        // 向量字段：前导两个位置 + 速度 + 浓度梯度 = 4 个向量
        // 张量字段：应力 + 弹性应变 + 塑性应变 = 3 个张量
        // 额外转角：前导 1 个 + RotStrain 2 个
        let expected = 8 * (4 + 2 * 3 + 1 + 2);
        assert_eq!(l3.particle_record_size - l2.particle_record_size, expected);
    }

    #[test]
    fn test_short_string_same_layout_as_padded() {
        let short = compile("mYY", "mY", Dim::Two);
        let padded = compile("mYYNNNNNNNNNNNNNNN", "mYNNN", Dim::Two);
        assert_eq!(short.particle_record_size, padded.particle_record_size);
        assert_eq!(short.particle_selection, padded.particle_selection);
    }

    #[test]
    fn test_header_contents() {
        let l = compile(DEFAULT_PARTICLE_ORDER, DEFAULT_CRACK_ORDER, Dim::Three);
        let h = l.stamped_header(0.0);
        assert_eq!(&h[0..4], b"ver6");
        assert_eq!(h[4] as usize, PARTICLE_FIELD_COUNT);
        assert_eq!(h[23] as usize, CRACK_FIELD_COUNT);
        assert_eq!(h[29], b'3');
        assert_eq!(h[30], b'1');
        assert_eq!(l.timestamp_offset(), 31);
        // 槽位后全部为零
        assert!(h[35..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_header_byte_order_mark() {
        let plain = CompiledLayout::compile(
            ParticleSelection::default(),
            CrackSelection::default(),
            Dim::Two,
            true,
            false,
        );
        let reversed = CompiledLayout::compile(
            ParticleSelection::default(),
            CrackSelection::default(),
            Dim::Two,
            true,
            true,
        );
        // 文件头记录实际输出字节序：反转开关翻转标记
        assert_eq!(plain.order, ByteOrderMark::native());
        assert_eq!(reversed.order, ByteOrderMark::native().flipped());
        assert_eq!(plain.stamped_header(0.0)[5], plain.order.mark());
        assert_eq!(reversed.stamped_header(0.0)[5], reversed.order.mark());
    }

    #[test]
    fn test_stamped_header_reversal() {
        let l = CompiledLayout::compile(
            ParticleSelection::default(),
            CrackSelection::default(),
            Dim::Two,
            true,
            true,
        );
        let h = l.stamped_header(1.5);
        let at = l.timestamp_offset();
        let mut bytes: [u8; 4] = h[at..at + 4].try_into().unwrap();
        bytes.reverse();
        assert_eq!(f32::from_ne_bytes(bytes), 1.5);
    }

    #[test]
    fn test_history_mask_widens_record() {
        let mut sel = ParticleSelection::normalize("mY");
        sel.set_history_mask(0b1011);
        let l = CompiledLayout::compile(
            sel,
            CrackSelection::default(),
            Dim::Two,
            true,
            false,
        );
        assert_eq!(l.particle_record_size, 64 + 3 * 8);
    }
}
