// crates/mp_archive/src/model.rs

//! 归档所消费的数据模型
//!
//! 物理求解器在每个时间步结束后提供只读快照：粒子状态、裂纹段
//! 几何、网格描述与材料访问接口。归档过程不修改任何粒子状态。

use glam::{DVec2, DVec3};

// ============================================================
// 维度
// ============================================================

/// 计算维度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dim {
    /// 平面（2D）
    Two,
    /// 三维
    Three,
}

impl Dim {
    /// 是否三维
    #[inline]
    pub fn is_three(&self) -> bool {
        matches!(self, Self::Three)
    }

    /// 向量分量数
    #[inline]
    pub fn vector_components(&self) -> usize {
        match self {
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    /// 对称张量分量数（2D 含 zz 共 4 项，3D 共 6 项）
    #[inline]
    pub fn tensor_components(&self) -> usize {
        match self {
            Self::Two => 4,
            Self::Three => 6,
        }
    }

    /// 文件头中的维度字符（'2'/'3'）
    #[inline]
    pub fn header_char(&self) -> u8 {
        match self {
            Self::Two => b'2',
            Self::Three => b'3',
        }
    }
}

// ============================================================
// 网格描述
// ============================================================

/// 背景网格描述（归档与辅助导出所需的访问面）
#[derive(Debug, Clone)]
pub struct GridInfo {
    /// 计算维度
    pub dim: Dim,
    /// 是否结构化网格
    pub structured: bool,
    /// 各方向网格点数
    pub points: [u32; 3],
    /// 网格原点
    pub origin: DVec3,
    /// 单元尺寸
    pub cell_size: DVec3,
}

impl GridInfo {
    /// 创建结构化网格描述
    pub fn structured(dim: Dim, points: [u32; 3], origin: DVec3, cell_size: DVec3) -> Self {
        Self {
            dim,
            structured: true,
            points,
            origin,
            cell_size,
        }
    }

    /// 文件头中的结构化标记（'0'/'1'）
    #[inline]
    pub fn header_char(&self) -> u8 {
        if self.structured {
            b'1'
        } else {
            b'0'
        }
    }
}

// ============================================================
// 对称张量
// ============================================================

/// 对称二阶张量（应力/应变）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SymTensor {
    /// xx 分量
    pub xx: f64,
    /// yy 分量
    pub yy: f64,
    /// zz 分量
    pub zz: f64,
    /// xy 分量
    pub xy: f64,
    /// xz 分量
    pub xz: f64,
    /// yz 分量
    pub yz: f64,
}

impl SymTensor {
    /// 归档顺序的分量（2D 写前 4 项，3D 写全部 6 项）
    #[inline]
    pub fn archive_components(&self) -> [f64; 6] {
        [self.xx, self.yy, self.zz, self.xy, self.xz, self.yz]
    }

    /// 整体缩放
    #[inline]
    pub fn scaled(&self, s: f64) -> Self {
        Self {
            xx: s * self.xx,
            yy: s * self.yy,
            zz: s * self.zz,
            xy: s * self.xy,
            xz: s * self.xz,
            yz: s * self.yz,
        }
    }
}

// ============================================================
// 粒子状态
// ============================================================

/// 单个粒子的归档快照
///
/// 应力为求解器内部追踪量（Kirchhoff 应力 / 参考密度），写出时由
/// 序列化器换算为真实应力。能量为比能（单位质量），写出时乘以
/// 粒子质量与单位系数。
#[derive(Debug, Clone)]
pub struct ParticleState {
    /// 所在网格单元号（1 起）
    pub elem_id: i32,
    /// 质量（Legacy 单位 g）
    pub mass: f64,
    /// 材料号（1 起）
    pub material: i16,
    /// 当前转角 z（度）
    pub angle_z: f64,
    /// 当前转角 y（度，仅 3D）
    pub angle_y: f64,
    /// 当前转角 x（度，仅 3D）
    pub angle_x: f64,
    /// 厚度（仅 2D，Legacy 单位 mm）
    pub thickness: f64,
    /// 当前位置
    pub pos: DVec3,
    /// 初始位置
    pub orig_pos: DVec3,
    /// 速度
    pub vel: DVec3,
    /// 追踪应力（Kirchhoff / ρ₀）
    pub stress: SymTensor,
    /// 弹性应变（绝对值）
    pub elastic_strain: SymTensor,
    /// 塑性（或替代）应变
    pub plastic_strain: SymTensor,
    /// 累积外力功（比能）
    pub work_energy: f64,
    /// 温度（K）
    pub temperature: f64,
    /// 累积塑性耗散（比能）
    pub plastic_energy: f64,
    /// 位移梯度分量 ∂u/∂y
    pub grad_u_xy: f64,
    /// 位移梯度分量 ∂v/∂x
    pub grad_u_yx: f64,
    /// 累积应变能（比能）
    pub strain_energy: f64,
    /// 累积热能（比能）
    pub heat_energy: f64,
    /// 浓度（势形式，写出时乘以饱和浓度）
    pub concentration: f64,
    /// 浓度梯度；无扩散状态的粒子为 None（写出时补零）
    pub conc_gradient: Option<DVec3>,
    /// 累积跨单元次数
    pub element_crossings: i32,
    /// 初始取向角 z（度）
    pub angle_z0: f64,
    /// 初始取向角 y（度，仅 3D）
    pub angle_y0: f64,
    /// 初始取向角 x（度，仅 3D）
    pub angle_x0: f64,
}

impl Default for ParticleState {
    fn default() -> Self {
        Self {
            elem_id: 1,
            mass: 1.0,
            material: 1,
            angle_z: 0.0,
            angle_y: 0.0,
            angle_x: 0.0,
            thickness: 1.0,
            pos: DVec3::ZERO,
            orig_pos: DVec3::ZERO,
            vel: DVec3::ZERO,
            stress: SymTensor::default(),
            elastic_strain: SymTensor::default(),
            plastic_strain: SymTensor::default(),
            work_energy: 0.0,
            temperature: 0.0,
            plastic_energy: 0.0,
            grad_u_xy: 0.0,
            grad_u_yx: 0.0,
            strain_energy: 0.0,
            heat_energy: 0.0,
            concentration: 0.0,
            conc_gradient: None,
            element_crossings: 0,
            angle_z0: 0.0,
            angle_y0: 0.0,
            angle_x0: 0.0,
        }
    }
}

// ============================================================
// 裂纹段状态
// ============================================================

/// 单个裂纹段的归档快照
///
/// 裂纹几何始终为平面几何，位置向量固定两个分量。
#[derive(Debug, Clone, Default)]
pub struct CrackSegmentState {
    /// 裂纹面所在单元号（1 起）
    pub plane_elem: i32,
    /// 内聚区能量释放槽位
    pub czm_delta_g: f64,
    /// 新裂纹起始标记
    pub new_crack: i16,
    /// 当前位置
    pub pos: DVec2,
    /// 初始位置
    pub orig_pos: DVec2,
    /// 上表面所在单元号
    pub above_elem: i32,
    /// 上表面位置
    pub above: DVec2,
    /// 下表面所在单元号
    pub below_elem: i32,
    /// 下表面位置
    pub below: DVec2,
    /// J 积分第一分量
    pub j1: f64,
    /// J 积分第二分量
    pub j2: f64,
    /// 应力强度因子 K_I
    pub k1: f64,
    /// 应力强度因子 K_II
    pub k2: f64,
    /// 能量平衡：扩展计数
    pub balance_count: i32,
    /// 能量平衡：累计释放能量
    pub energy_released: f64,
    /// 能量平衡：累计耗散能量
    pub energy_dissipated: f64,
}

// ============================================================
// 材料访问接口
// ============================================================

/// 材料属性访问接口
///
/// 粒子记录序列化依赖的最小材料访问面。实现方为求解器的材料表。
/// 并行序列化要求 `Sync`。
pub trait MaterialTable: Sync {
    /// 参考密度 ρ₀
    fn reference_density(&self, particle: &ParticleState) -> f64;

    /// 当前相对体积 J（ρ = ρ₀ / J）
    fn relative_volume(&self, particle: &ParticleState) -> f64;

    /// 材料历史标量（slot 为 1 起的历史槽号）
    fn history_value(&self, slot: u32, particle: &ParticleState) -> f64;

    /// 饱和浓度（浓度写出换算系数）
    fn saturation(&self, particle: &ParticleState) -> f64;
}

// ============================================================
// 帧快照
// ============================================================

/// 一次归档事件消费的只读快照
///
/// 在所有粒子物理更新完成后的天然屏障处取得，归档期间无其他
/// 线程修改粒子状态。
pub struct SimulationFrame<'a> {
    /// 全部粒子
    pub particles: &'a [ParticleState],
    /// 材料访问接口
    pub materials: &'a dyn MaterialTable,
    /// 全部裂纹段（裂纹协作方展开后的序列）
    pub cracks: &'a [CrackSegmentState],
    /// 网格描述
    pub grid: &'a GridInfo,
}
