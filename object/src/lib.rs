mod value;
mod header;

pub use value::Value;
pub use header::{ClosureHeader, HEADER_WORDS, Header, ObjectType, RecordHeader};

#[cfg(test)]
mod tests {
    use super::*;

    // ── Value reinterpretation ─────────────────────────────────────

    #[test]
    fn i64_round_trip() {
        for &n in &[0i64, 1, -1, 42, -42, i64::MAX, i64::MIN] {
            assert_eq!(Value::from_i64(n).as_i64(), n);
        }
    }

    #[test]
    fn f64_round_trip() {
        for &f in &[0.0f64, -0.0, 1.5, -3.25, f64::MAX, f64::INFINITY] {
            assert_eq!(Value::from_f64(f).as_f64().to_bits(), f.to_bits());
        }
        assert!(Value::from_f64(f64::NAN).as_f64().is_nan());
    }

    #[test]
    fn zero_is_all_zero_bits() {
        assert_eq!(Value::ZERO.raw(), 0);
        assert_eq!(Value::default(), Value::ZERO);
        assert_eq!(Value::from_i64(0), Value::ZERO);
        assert_eq!(Value::from_bool(false), Value::ZERO);
    }

    #[test]
    fn bool_uses_byte_zero() {
        assert_eq!(Value::from_bool(true).to_le_bytes(), [1, 0, 0, 0, 0, 0, 0, 0]);
        assert!(Value::from_bool(true).as_bool());
        assert!(!Value::from_bool(false).as_bool());
        // only the exact byte value 1 is true
        assert!(!Value::from_i64(2).as_bool());
        // high bytes are ignored
        assert!(Value::from_raw(0xff00_0000_0000_0001).as_bool());
    }

    #[test]
    fn halves_are_little_endian() {
        let v = Value::from_halves(0x0000_F000, 1);
        assert_eq!(v.read_i32_at(0), 0xF000);
        assert_eq!(v.read_i32_at(4), 1);
        assert_eq!(v.raw(), 0x0000_0001_0000_F000);

        let neg = Value::from_halves(-1, -2);
        assert_eq!(neg.read_i32_at(0), -1);
        assert_eq!(neg.read_i32_at(4), -2);
    }

    #[test]
    fn from_i32_zeroes_high_half() {
        let v = Value::from_i32(-7);
        assert_eq!(v.as_i32(), -7);
        assert_eq!(v.read_u32_at(4), 0);
    }

    #[test]
    fn sub_field_writes_do_not_disturb_neighbours() {
        let v = Value::from_raw(u64::MAX)
            .with_u16_at(4, 0x1234)
            .with_u8_at(0, 0);
        assert_eq!(v.read_u16_at(4), 0x1234);
        assert_eq!(v.read_u8_at(0), 0);
        assert_eq!(v.read_u8_at(1), 0xff);
        assert_eq!(v.read_u16_at(6), 0xffff);
    }

    #[test]
    fn chars() {
        assert_eq!(Value::from_char('λ').as_char(), Some('λ'));
        assert_eq!(Value::from_i32(0xD800).as_char(), None);
    }

    // ── Headers ────────────────────────────────────────────────────

    #[test]
    fn header_encoding() {
        let hdr = Header::new(ObjectType::Closure, 3);
        let word = hdr.encode();
        assert_eq!(word.read_u8_at(0), ObjectType::Closure as u8);
        assert_eq!(word.read_u32_at(4), 3);
        assert_eq!(Header::decode(word), Ok(hdr));
    }

    #[test]
    fn header_rejects_unknown_tag() {
        let word = Value::ZERO.with_u8_at(0, 0x7f);
        assert_eq!(Header::decode(word), Err(0x7f));
    }

    #[test]
    fn sub_headers() {
        let rec = RecordHeader { field_count: 9 };
        assert_eq!(RecordHeader::decode(rec.encode()), rec);

        let clo = ClosureHeader {
            procedure: 0xDEAD_BEEF,
            arg_count: 513,
        };
        let word = clo.encode();
        assert_eq!(word.read_u32_at(0), 0xDEAD_BEEF);
        assert_eq!(word.read_u16_at(4), 513);
        assert_eq!(ClosureHeader::decode(word), clo);
    }

    #[test]
    fn object_type_count() {
        assert_eq!(ObjectType::COUNT, 2);
        assert_eq!(ObjectType::try_from(2u8), Err(2));
    }
}
