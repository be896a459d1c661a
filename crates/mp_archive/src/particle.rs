// crates/mp_archive/src/particle.rs

//! 粒子记录序列化
//!
//! 把单个粒子的快照按编译好的跨度表写入一条定长记录。写出即换算：
//!
//! - 应力 = 当前密度 × 追踪应力（追踪量为 Kirchhoff 应力 / 参考密度，
//!   当前密度 ρ = ρ₀ / 相对体积 J）；
//! - 能量 = 单位系数 × 粒子质量 × 比能；
//! - 浓度与浓度梯度乘以材料饱和浓度，还原为真实浓度。
//!
//! 粒子内部状态不因归档而改变。记录尾部不足共用长度的部分显式
//! 补零，字节序反转（若开启）沿同一张跨度表逐字段进行。

use crate::fields::ParticleField;
use crate::layout::CompiledLayout;
use crate::model::{MaterialTable, ParticleState};
use crate::record::{reverse_fields, RecordSink};
use mp_foundation::units::UnitSystem;

/// 把一个粒子写入一条共用长度的记录
///
/// `buf` 长度为共用记录长度；写入顺序严格跟随 `layout.particle_spans`。
pub fn write_particle(
    buf: &mut [u8],
    layout: &CompiledLayout,
    particle: &ParticleState,
    materials: &dyn MaterialTable,
    units: UnitSystem,
) {
    let three = layout.dim.is_three();
    let tensor_n = layout.dim.tensor_components();
    let energy_scale = units.energy_scale() * particle.mass;

    let mut sink = RecordSink::new(buf);
    for span in &layout.particle_spans {
        match span.field {
            ParticleField::Defaults => {
                sink.put_i32(particle.elem_id);
                sink.put_f64(particle.mass);
                sink.put_i16(particle.material);
                sink.pad(2);
                if three {
                    sink.put_f64(particle.angle_z);
                    sink.put_f64(particle.angle_y);
                    sink.put_f64(particle.angle_x);
                } else {
                    sink.put_f64(particle.angle_z);
                    sink.put_f64(particle.thickness);
                }
                put_vector(&mut sink, particle.pos.to_array(), three);
                put_vector(&mut sink, particle.orig_pos.to_array(), three);
            }
            ParticleField::Velocity => {
                put_vector(&mut sink, particle.vel.to_array(), three);
            }
            ParticleField::Stress => {
                // 追踪应力换算为真实应力
                let density =
                    materials.reference_density(particle) / materials.relative_volume(particle);
                put_tensor(&mut sink, particle.stress.scaled(density), tensor_n);
            }
            ParticleField::ElasticStrain => {
                put_tensor(&mut sink, particle.elastic_strain, tensor_n);
            }
            ParticleField::PlasticStrain => {
                put_tensor(&mut sink, particle.plastic_strain, tensor_n);
            }
            ParticleField::WorkEnergy => {
                sink.put_f64(energy_scale * particle.work_energy);
            }
            ParticleField::Temperature => {
                sink.put_f64(particle.temperature);
            }
            ParticleField::PlasticEnergy => {
                sink.put_f64(energy_scale * particle.plastic_energy);
            }
            ParticleField::ShearComponents => {
                sink.put_f64(particle.grad_u_xy);
                sink.put_f64(particle.grad_u_yx);
            }
            ParticleField::StrainEnergy => {
                sink.put_f64(energy_scale * particle.strain_energy);
            }
            ParticleField::History => {
                for slot in layout.particle_selection.history().slots() {
                    sink.put_f64(materials.history_value(slot, particle));
                }
            }
            ParticleField::Concentration => {
                let saturation = materials.saturation(particle);
                sink.put_f64(saturation * particle.concentration);
                let grad = particle.conc_gradient.unwrap_or_default();
                put_vector(
                    &mut sink,
                    (saturation * grad).to_array(),
                    three,
                );
            }
            ParticleField::HeatEnergy => {
                sink.put_f64(energy_scale * particle.heat_energy);
            }
            ParticleField::ElementCrossings => {
                sink.put_i32(particle.element_crossings);
            }
            ParticleField::RotStrain => {
                if three {
                    sink.put_f64(particle.angle_z0);
                    sink.put_f64(particle.angle_y0);
                    sink.put_f64(particle.angle_x0);
                } else {
                    sink.put_f64(particle.angle_z0);
                }
            }
            // 字节序槽位与强制禁用槽位不进入跨度表
            ParticleField::ByteOrder
            | ParticleField::OldOrigPosition
            | ParticleField::Ver2Empty => {}
        }
    }
    sink.fill_zero();

    if layout.reverse {
        reverse_fields(buf, &layout.particle_spans);
    }
}

#[inline]
fn put_vector(sink: &mut RecordSink<'_>, v: [f64; 3], three: bool) {
    sink.put_f64(v[0]);
    sink.put_f64(v[1]);
    if three {
        sink.put_f64(v[2]);
    }
}

#[inline]
fn put_tensor(sink: &mut RecordSink<'_>, t: crate::model::SymTensor, n: usize) {
    for &c in t.archive_components().iter().take(n) {
        sink.put_f64(c);
    }
}

// ============================================================
// 测试
// ============================================================
