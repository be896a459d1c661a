// crates/mp_archive/src/record.rs

//! 记录字节写入
//!
//! [`RecordSink`] 按本机字节序把定宽字段写入预先分配的记录缓冲；
//! 需要反转字节序时，[`reverse_fields`] 沿同一张跨度表逐字段反转，
//! 字段边界保持不变，填充字节保持为零。整条记录绝不作为单块反转。

use crate::layout::Span;

/// 面向单条记录的定宽字段写入器
///
/// 写入按本机字节序进行；游标越界说明跨度表与写入序列不一致，
/// 属于内部错误。
pub struct RecordSink<'a> {
    buf: &'a mut [u8],
    at: usize,
}

impl<'a> RecordSink<'a> {
    /// 包装一条记录的缓冲
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, at: 0 }
    }

    /// 写入 4 字节整数
    #[inline]
    pub fn put_i32(&mut self, v: i32) {
        self.buf[self.at..self.at + 4].copy_from_slice(&v.to_ne_bytes());
        self.at += 4;
    }

    /// 写入 2 字节整数
    #[inline]
    pub fn put_i16(&mut self, v: i16) {
        self.buf[self.at..self.at + 2].copy_from_slice(&v.to_ne_bytes());
        self.at += 2;
    }

    /// 写入 8 字节浮点
    #[inline]
    pub fn put_f64(&mut self, v: f64) {
        self.buf[self.at..self.at + 8].copy_from_slice(&v.to_ne_bytes());
        self.at += 8;
    }

    /// 写入 4 字节浮点
    #[inline]
    pub fn put_f32(&mut self, v: f32) {
        self.buf[self.at..self.at + 4].copy_from_slice(&v.to_ne_bytes());
        self.at += 4;
    }

    /// 写入 n 个零字节（对齐填充）
    #[inline]
    pub fn pad(&mut self, n: usize) {
        self.buf[self.at..self.at + n].fill(0);
        self.at += n;
    }

    /// 当前写入位置
    #[inline]
    pub fn position(&self) -> usize {
        self.at
    }

    /// 把剩余字节显式置零（补足到共用记录长度）
    pub fn fill_zero(&mut self) {
        let len = self.buf.len();
        self.buf[self.at..len].fill(0);
        self.at = len;
    }
}

/// 沿跨度表逐字段反转记录字节序
///
/// 与写入路径共用同一张跨度表，避免写出顺序与反转顺序各自分叉。
/// 跨度表之后的填充字节不动（全零，反转无意义）。
pub fn reverse_fields<F>(buf: &mut [u8], spans: &[Span<F>]) {
    let mut at = 0;
    for span in spans {
        for word in &span.words {
            let size = word.size();
            if word.is_multibyte() {
                buf[at..at + size].reverse();
            }
            at += size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::ParticleField;
    use crate::layout::Word;

    #[test]
    fn test_sink_layout() {
        let mut buf = [0xAAu8; 16];
        let mut sink = RecordSink::new(&mut buf);
        sink.put_i32(7);
        sink.put_i16(-2);
        sink.pad(2);
        sink.put_f64(1.5);
        assert_eq!(sink.position(), 16);

        assert_eq!(i32::from_ne_bytes(buf[0..4].try_into().unwrap()), 7);
        assert_eq!(i16::from_ne_bytes(buf[4..6].try_into().unwrap()), -2);
        assert_eq!(&buf[6..8], &[0, 0]);
        assert_eq!(f64::from_ne_bytes(buf[8..16].try_into().unwrap()), 1.5);
    }

    #[test]
    fn test_fill_zero() {
        let mut buf = [0xAAu8; 8];
        let mut sink = RecordSink::new(&mut buf);
        sink.put_i32(1);
        sink.fill_zero();
        assert_eq!(&buf[4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_reverse_fields_roundtrip() {
        // 写入后反转，再按相反字节序读取应逐位还原
        let spans = vec![Span {
            field: ParticleField::Defaults,
            words: vec![Word::I32, Word::I16, Word::Pad(2), Word::F64],
        }];

        let mut buf = [0u8; 16];
        {
            let mut sink = RecordSink::new(&mut buf);
            sink.put_i32(0x0102_0304);
            sink.put_i16(0x0506);
            sink.pad(2);
            sink.put_f64(-3.25);
        }
        reverse_fields(&mut buf, &spans);

        let swapped = |b: &[u8]| -> Vec<u8> {
            let mut v = b.to_vec();
            v.reverse();
            v
        };
        assert_eq!(
            i32::from_ne_bytes(swapped(&buf[0..4]).try_into().unwrap()),
            0x0102_0304
        );
        assert_eq!(
            i16::from_ne_bytes(swapped(&buf[4..6]).try_into().unwrap()),
            0x0506
        );
        // 填充不参与反转
        assert_eq!(&buf[6..8], &[0, 0]);
        assert_eq!(
            f64::from_ne_bytes(swapped(&buf[8..16]).try_into().unwrap()),
            -3.25
        );
    }

    #[test]
    fn test_double_reverse_is_identity() {
        let spans = vec![Span {
            field: ParticleField::Defaults,
            words: vec![Word::I32, Word::F64, Word::I16, Word::Pad(2)],
        }];
        let mut buf = [0u8; 16];
        {
            let mut sink = RecordSink::new(&mut buf);
            sink.put_i32(42);
            sink.put_f64(2.75);
            sink.put_i16(-1);
            sink.pad(2);
        }
        let original = buf;
        reverse_fields(&mut buf, &spans);
        assert_ne!(buf, original);
        reverse_fields(&mut buf, &spans);
        assert_eq!(buf, original);
    }
}
