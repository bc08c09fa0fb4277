//! Property-based tests for rust_log_writer using proptest

use chrono::DateTime;
use proptest::prelude::*;
use rust_log_writer::core::{Dsn, Field, LogEntry, LogLevel};
use rust_log_writer::encoder::{DurationEncoding, Encoder, EncoderConfig, MixedEncoder, TimeEncoding};

fn level_strategy() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::ALL.to_vec())
}

fn json_encoder() -> MixedEncoder {
    MixedEncoder::json(EncoderConfig::new(TimeEncoding::Epoch, DurationEncoding::Seconds))
}

fn encode(entry: &LogEntry, fields: &[Field]) -> serde_json::Value {
    let buf = json_encoder().encode_entry(entry, fields).unwrap();
    let value = serde_json::from_slice(buf.as_bytes()).unwrap();
    buf.release();
    value
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Level names parse back from both the display and the config form
    #[test]
    fn test_log_level_str_roundtrip(level in level_strategy()) {
        prop_assert_eq!(level.to_str().parse::<LogLevel>().unwrap(), level);
        prop_assert_eq!(level.as_config_str().parse::<LogLevel>().unwrap(), level);
    }

    /// Ordering matches the numeric discriminants
    #[test]
    fn test_log_level_ordering(a in level_strategy(), b in level_strategy()) {
        prop_assert_eq!(a <= b, (a as u8) <= (b as u8));
    }

    /// Arbitrary words are either a known level or an error, never a panic
    #[test]
    fn test_log_level_parse_never_panics(s in "\\PC{0,12}") {
        let known = ["", "debug", "info", "warn", "warning", "error", "dpanic", "panic", "fatal"];
        let parsed = s.parse::<LogLevel>();
        prop_assert_eq!(parsed.is_ok(), known.contains(&s.to_lowercase().as_str()));
    }
}

// ============================================================================
// Encoder Tests
// ============================================================================

proptest! {
    /// Any message and field value survives a JSON round trip unchanged
    #[test]
    fn test_string_escaping_decodes_to_original(message in any::<String>(), value in any::<String>()) {
        let entry = LogEntry::new(LogLevel::Info, message.clone());
        let decoded = encode(&entry, &[Field::new("value", value.clone())]);

        prop_assert_eq!(decoded["message"].as_str().unwrap(), message.as_str());
        prop_assert_eq!(decoded["value"].as_str().unwrap(), value.as_str());
    }

    /// Keys are escaped like values
    #[test]
    fn test_keys_are_escaped(key in "[\\x00-\\x7f]{1,16}") {
        let entry = LogEntry::new(LogLevel::Info, "");
        let decoded = encode(&entry, &[Field::new(key.clone(), true)]);
        prop_assert_eq!(&decoded[key.as_str()], &serde_json::Value::Bool(true));
    }

    /// Byte strings decode to their lossy UTF-8 form
    #[test]
    fn test_byte_strings_replace_invalid_utf8(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let entry = LogEntry::new(LogLevel::Info, "bytes");
        let decoded = encode(&entry, &[Field::byte_string("raw", bytes.clone())]);

        // One U+FFFD per invalid byte
        let mut expected = String::new();
        for chunk in bytes.utf8_chunks() {
            expected.push_str(chunk.valid());
            for _ in chunk.invalid() {
                expected.push('\u{fffd}');
            }
        }
        prop_assert_eq!(decoded["raw"].as_str().unwrap(), expected.as_str());
    }

    /// Finite floats stay numeric
    #[test]
    fn test_finite_floats_are_numbers(value in -1.0e12f64..1.0e12f64) {
        let entry = LogEntry::new(LogLevel::Info, "");
        let decoded = encode(&entry, &[Field::new("v", value)]);
        let parsed = decoded["v"].as_f64().unwrap();
        prop_assert!((parsed - value).abs() <= value.abs() * 1e-12);
    }

    /// Every encoded entry is exactly one line
    #[test]
    fn test_entry_is_one_line(message in any::<String>(), level in level_strategy()) {
        let entry = LogEntry::new(level, message);
        let buf = json_encoder().encode_entry(&entry, &[]).unwrap();
        let text = String::from_utf8(buf.as_bytes().to_vec()).unwrap();
        buf.release();

        prop_assert!(text.ends_with('\n'));
        prop_assert_eq!(text.matches('\n').count(), 1);
    }

    /// The mixed layout prefix is `[time] LEVEL [name]` for any name
    #[test]
    fn test_mixed_prefix(name in "[a-z]{1,8}(\\.[a-z]{1,8}){0,2}", millis in 0i64..4_102_444_800_000) {
        let time = DateTime::from_timestamp_millis(millis).unwrap();
        let entry = LogEntry::new(LogLevel::Warn, "m")
            .with_logger_name(name.clone())
            .with_timestamp(time);
        let encoder = MixedEncoder::new(EncoderConfig::new(TimeEncoding::EpochMillis, DurationEncoding::Seconds));
        let buf = encoder.encode_entry(&entry, &[]).unwrap();
        let text = String::from_utf8(buf.as_bytes().to_vec()).unwrap();
        buf.release();

        prop_assert_eq!(text, format!("[{}] WARN [{}] m {{}}\n", millis, name));
    }
}

#[test]
fn test_non_finite_floats_are_strings() {
    let entry = LogEntry::new(LogLevel::Info, "");
    let decoded = encode(
        &entry,
        &[
            Field::new("nan", f64::NAN),
            Field::new("inf", f64::INFINITY),
            Field::new("ninf", f32::NEG_INFINITY),
        ],
    );
    assert_eq!(decoded["nan"], "NaN");
    assert_eq!(decoded["inf"], "+Inf");
    assert_eq!(decoded["ninf"], "-Inf");
}

// ============================================================================
// Destination Tests
// ============================================================================

proptest! {
    /// Query parameters never change the destination key
    #[test]
    fn test_destination_key_ignores_query(
        path in "/[a-z]{1,8}(/[a-z0-9_]{1,8}){0,3}\\.log",
        level in level_strategy(),
    ) {
        let plain = Dsn::parse(&path).unwrap();
        let with_query = Dsn::parse(&format!("{}?level={}", path, level.as_config_str())).unwrap();
        let as_url = Dsn::parse(&format!("file://{}", path)).unwrap();

        prop_assert_eq!(plain.destination_key(), with_query.destination_key());
        prop_assert_eq!(plain.destination_key(), as_url.destination_key());
        prop_assert_eq!(with_query.params().get("level"), Some(level.as_config_str()));
    }
}
