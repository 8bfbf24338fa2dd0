//! Canonical JSON encoding for deterministic hashing.
//!
//! Follows the spirit of RFC 8785 (JSON Canonicalization Scheme):
//! - Object keys sorted by their UTF-8 bytes, recursively
//! - No insignificant whitespace
//! - Strings escaped minimally
//! - Integral floats below 2^53 printed as integers, `-0` printed as `0`
//!
//! Two payloads that differ only in key order, whitespace, or `1` vs `1.0`
//! produce identical bytes, and therefore identical content hashes.

use serde_json::{Map, Number, Value};

/// Largest magnitude at which every integer is exactly representable as f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Encode a JSON value to its canonical bytes.
pub fn canonical_json(value: &Value) -> Vec<u8> {
    canonical_string(value).into_bytes()
}

/// Encode a JSON value to its canonical text.
pub fn canonical_string(value: &Value) -> String {
    let mut buf = String::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Recursively encode a JSON value.
fn encode_value_to(buf: &mut String, value: &Value) {
    match value {
        Value::Null => buf.push_str("null"),
        Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => encode_number(buf, n),
        Value::String(s) => encode_string(buf, s),
        Value::Array(arr) => encode_array(buf, arr),
        Value::Object(map) => encode_object_canonical(buf, map),
    }
}

fn encode_number(buf: &mut String, n: &Number) {
    if let Some(i) = n.as_i64() {
        buf.push_str(&i.to_string());
    } else if let Some(u) = n.as_u64() {
        buf.push_str(&u.to_string());
    } else if let Some(f) = n.as_f64() {
        encode_float(buf, f);
    }
}

/// Encode a finite float.
///
/// `f64`'s `Display` is the shortest representation that round-trips, and
/// never uses exponent notation, so it is stable across platforms.
fn encode_float(buf: &mut String, f: f64) {
    if f == 0.0 {
        // covers -0.0
        buf.push('0');
    } else if f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER {
        buf.push_str(&(f as i64).to_string());
    } else {
        buf.push_str(&f.to_string());
    }
}

/// Encode a string literal with minimal escaping.
fn encode_string(buf: &mut String, s: &str) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\u{08}' => buf.push_str("\\b"),
            '\u{0c}' => buf.push_str("\\f"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                buf.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => buf.push(c),
        }
    }
    buf.push('"');
}

fn encode_array(buf: &mut String, arr: &[Value]) {
    buf.push('[');
    for (i, item) in arr.iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        encode_value_to(buf, item);
    }
    buf.push(']');
}

/// Encode an object with keys sorted by their UTF-8 bytes.
///
/// `serde_json::Map` is already ordered unless `preserve_order` is enabled
/// somewhere in the dependency graph, so the sort is done explicitly.
fn encode_object_canonical(buf: &mut String, map: &Map<String, Value>) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    buf.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        encode_string(buf, key);
        buf.push(':');
        encode_value_to(buf, value);
    }
    buf.push('}');
}
