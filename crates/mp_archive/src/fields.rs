// crates/mp_archive/src/fields.rs

//! 归档字段选择
//!
//! 两条相互独立的定长标志串：一条控制粒子记录的可选字段，一条控制
//! 裂纹记录的可选字段。每个槽位一个字节，`'Y'` 表示启用，其余字符
//! 一律按 `'N'` 处理；历史变量槽位例外，`0x01..=0x0F` 的字节按
//! 4 位掩码解释，选择 1~4 号材料历史标量。
//!
//! # 格式不变量（版本 ver6）
//!
//! - 标志串长度固定：粒子 18 槽、裂纹 5 槽；输入过短补 `'N'`，过长截断
//! - 槽位 0 为字节序标记，布局编译时由实际输出字节序覆写
//! - 强制槽位：Defaults 恒为 `'Y'`，OldOrigPosition 与 Ver2Empty 恒为 `'N'`
//! - 派生槽位：RotStrain 跟随 ElasticStrain，用户输入被覆盖

/// 粒子标志串长度
pub const PARTICLE_FIELD_COUNT: usize = 18;

/// 裂纹标志串长度
pub const CRACK_FIELD_COUNT: usize = 5;

/// 启用标记
pub const ENABLED: u8 = b'Y';

/// 禁用标记
pub const DISABLED: u8 = b'N';

/// 默认粒子字段串（字节序占位 + defaults + 16 个可选项）
pub const DEFAULT_PARTICLE_ORDER: &str = "mYYYYYNYYYNNNNNNNN";

/// 默认裂纹字段串（字节序占位 + defaults + 3 个可选项）
pub const DEFAULT_CRACK_ORDER: &str = "mYNNN";

// ============================================================
// 字段枚举
// ============================================================

/// 粒子记录字段（规范顺序，即记录内的排列顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum ParticleField {
    /// 字节序标记（'i' 小端 / 'm' 大端）
    ByteOrder = 0,
    /// 固定前导（单元号、质量、材料号、转角、位置、初始位置）
    Defaults = 1,
    /// 速度向量
    Velocity = 2,
    /// 应力张量
    Stress = 3,
    /// 弹性应变张量（绝对值）
    ElasticStrain = 4,
    /// 塑性（或替代）应变张量
    PlasticStrain = 5,
    /// 旧版初始位置槽位（强制禁用）
    OldOrigPosition = 6,
    /// 累积外力功
    WorkEnergy = 7,
    /// 温度
    Temperature = 8,
    /// 累积塑性耗散能
    PlasticEnergy = 9,
    /// ver2 空槽位（强制禁用）
    Ver2Empty = 10,
    /// 剪切位移梯度分量（两项）
    ShearComponents = 11,
    /// 累积应变能
    StrainEnergy = 12,
    /// 材料历史标量（'Y' 单值，或 4 位掩码）
    History = 13,
    /// 浓度及其空间梯度
    Concentration = 14,
    /// 累积热能
    HeatEnergy = 15,
    /// 累积跨单元次数
    ElementCrossings = 16,
    /// 初始取向角（派生自 ElasticStrain）
    RotStrain = 17,
}

impl ParticleField {
    /// 槽位下标
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// 裂纹记录字段（规范顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum CrackField {
    /// 字节序标记
    ByteOrder = 0,
    /// 固定前导（段所在单元、上下表面位置等）
    Defaults = 1,
    /// J 积分两分量
    JIntegral = 2,
    /// 应力强度因子 K_I/K_II
    StressIntensity = 3,
    /// 能量平衡标量
    BalanceResults = 4,
}

impl CrackField {
    /// 槽位下标
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// 历史变量槽位的解释结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    /// 不归档历史变量
    Off,
    /// 单值模式（1 号历史标量）
    Single,
    /// 掩码模式，位 0..=3 对应 1~4 号历史标量
    Mask(u8),
}

impl HistoryMode {
    /// 该模式下写出的标量个数
    pub fn value_count(&self) -> usize {
        match self {
            Self::Off => 0,
            Self::Single => 1,
            Self::Mask(m) => (m & 0x0F).count_ones() as usize,
        }
    }

    /// 该模式下选中的历史槽号（1 起）
    pub fn slots(&self) -> Vec<u32> {
        match self {
            Self::Off => Vec::new(),
            Self::Single => vec![1],
            Self::Mask(m) => (0..4u32).filter(|b| m & (1 << b) != 0).map(|b| b + 1).collect(),
        }
    }
}

// ============================================================
// 粒子字段选择
// ============================================================

/// 归一化后的粒子字段选择
///
/// 保存完整的标志字节串（含字节序槽位），原样写入文件头。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticleSelection {
    flags: [u8; PARTICLE_FIELD_COUNT],
}

impl ParticleSelection {
    /// 由原始输入串归一化
    ///
    /// 过短补 `'N'`，过长截断；除历史槽位外，非 `'Y'` 字符一律视为
    /// `'N'`；随后应用强制槽位与派生槽位。
    pub fn normalize(raw: &str) -> Self {
        let mut flags = [DISABLED; PARTICLE_FIELD_COUNT];
        for (slot, &b) in flags.iter_mut().zip(raw.as_bytes()) {
            *slot = b;
        }

        for (i, slot) in flags.iter_mut().enumerate() {
            if i == ParticleField::ByteOrder.index() {
                continue; // 布局编译时覆写
            }
            if i == ParticleField::History.index() {
                // 'Y'、'N' 或 4 位掩码之外的值一律禁用
                if *slot != ENABLED && !(0x01..=0x0F).contains(slot) {
                    *slot = DISABLED;
                }
            } else if *slot != ENABLED {
                *slot = DISABLED;
            }
        }

        // 格式版本强制槽位
        flags[ParticleField::Defaults.index()] = ENABLED;
        flags[ParticleField::OldOrigPosition.index()] = DISABLED;
        flags[ParticleField::Ver2Empty.index()] = DISABLED;

        // RotStrain 跟随 ElasticStrain
        flags[ParticleField::RotStrain.index()] = flags[ParticleField::ElasticStrain.index()];

        Self { flags }
    }

    /// 槽位是否启用（历史槽位的掩码模式也视为启用）
    #[inline]
    pub fn is_on(&self, field: ParticleField) -> bool {
        if field == ParticleField::History {
            !matches!(self.history(), HistoryMode::Off)
        } else {
            self.flags[field.index()] == ENABLED
        }
    }

    /// 历史槽位的解释
    pub fn history(&self) -> HistoryMode {
        match self.flags[ParticleField::History.index()] {
            ENABLED => HistoryMode::Single,
            m @ 0x01..=0x0F => HistoryMode::Mask(m),
            _ => HistoryMode::Off,
        }
    }

    /// 设置历史掩码（位 0..=3），0 表示关闭
    ///
    /// 配置文件无法直接书写控制字符，由此方法在归一化后注入。
    pub fn set_history_mask(&mut self, mask: u8) {
        self.flags[ParticleField::History.index()] = match mask & 0x0F {
            0 => DISABLED,
            m => m,
        };
    }

    /// 覆写字节序标记
    pub fn set_byte_order(&mut self, mark: u8) {
        self.flags[ParticleField::ByteOrder.index()] = mark;
    }

    /// 标志字节串（写入文件头）
    #[inline]
    pub fn as_bytes(&self) -> &[u8; PARTICLE_FIELD_COUNT] {
        &self.flags
    }
}

impl Default for ParticleSelection {
    fn default() -> Self {
        Self::normalize(DEFAULT_PARTICLE_ORDER)
    }
}

// ============================================================
// 裂纹字段选择
// ============================================================

/// 归一化后的裂纹字段选择
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrackSelection {
    flags: [u8; CRACK_FIELD_COUNT],
}

impl CrackSelection {
    /// 由原始输入串归一化（规则同粒子串，无历史槽位）
    pub fn normalize(raw: &str) -> Self {
        let mut flags = [DISABLED; CRACK_FIELD_COUNT];
        for (slot, &b) in flags.iter_mut().zip(raw.as_bytes()) {
            *slot = b;
        }

        for (i, slot) in flags.iter_mut().enumerate() {
            if i != CrackField::ByteOrder.index() && *slot != ENABLED {
                *slot = DISABLED;
            }
        }

        flags[CrackField::Defaults.index()] = ENABLED;

        Self { flags }
    }

    /// 槽位是否启用
    #[inline]
    pub fn is_on(&self, field: CrackField) -> bool {
        self.flags[field.index()] == ENABLED
    }

    /// 覆写字节序标记
    pub fn set_byte_order(&mut self, mark: u8) {
        self.flags[CrackField::ByteOrder.index()] = mark;
    }

    /// 标志字节串（写入文件头）
    #[inline]
    pub fn as_bytes(&self) -> &[u8; CRACK_FIELD_COUNT] {
        &self.flags
    }
}

impl Default for CrackSelection {
    fn default() -> Self {
        Self::normalize(DEFAULT_CRACK_ORDER)
    }
}

// ============================================================
// 测试
// ============================================================
