// crates/mp_archive/src/crack.rs

//! 裂纹段记录序列化
//!
//! 裂纹段与粒子共用同一个记录文件与同一个定长记录：裂纹几何始终为
//! 平面几何，记录按裂纹跨度表写出，尾部补零到共用记录长度。J 积分、
//! 应力强度因子与能量平衡结果按字段选择附加在固定前导之后。

use crate::fields::CrackField;
use crate::layout::CompiledLayout;
use crate::model::CrackSegmentState;
use crate::record::{reverse_fields, RecordSink};

/// 把一个裂纹段写入一条共用长度的记录
///
/// `buf` 长度为共用记录长度；写入顺序严格跟随 `layout.crack_spans`。
pub fn write_crack_segment(buf: &mut [u8], layout: &CompiledLayout, segment: &CrackSegmentState) {
    let mut sink = RecordSink::new(buf);
    for span in &layout.crack_spans {
        match span.field {
            CrackField::Defaults => {
                sink.put_i32(segment.plane_elem);
                sink.put_f64(segment.czm_delta_g);
                sink.put_i16(segment.new_crack);
                sink.pad(2);
                sink.put_f64(segment.pos.x);
                sink.put_f64(segment.pos.y);
                sink.put_f64(segment.orig_pos.x);
                sink.put_f64(segment.orig_pos.y);
                sink.put_i32(segment.above_elem);
                sink.put_f64(segment.above.x);
                sink.put_f64(segment.above.y);
                sink.put_i32(segment.below_elem);
                sink.put_f64(segment.below.x);
                sink.put_f64(segment.below.y);
            }
            CrackField::JIntegral => {
                sink.put_f64(segment.j1);
                sink.put_f64(segment.j2);
            }
            CrackField::StressIntensity => {
                sink.put_f64(segment.k1);
                sink.put_f64(segment.k2);
            }
            CrackField::BalanceResults => {
                sink.put_i32(segment.balance_count);
                sink.put_f64(segment.energy_released);
                sink.put_f64(segment.energy_dissipated);
            }
            CrackField::ByteOrder => {}
        }
    }
    sink.fill_zero();

    if layout.reverse {
        reverse_fields(buf, &layout.crack_spans);
    }
}

// ============================================================
// 测试
// ============================================================
