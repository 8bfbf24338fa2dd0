//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Number, Value};

use geosync_core::DatasetId;
use geosync_server::Point;

/// Generate a valid dataset id.
pub fn dataset_id() -> impl Strategy<Value = DatasetId> {
    "[a-z][a-z0-9_-]{0,31}".prop_map(DatasetId::new)
}

/// Generate a coordinate with micro-degree precision.
pub fn coordinate() -> impl Strategy<Value = f64> {
    (-180_000_000i64..=180_000_000).prop_map(|n| n as f64 / 1_000_000.0)
}

/// Generate a point list.
pub fn point_list(max_len: usize) -> impl Strategy<Value = Vec<Point>> {
    prop::collection::vec((coordinate(), coordinate()), 0..=max_len)
        .prop_map(|coords| coords.into_iter().map(|(x, y)| Point::new(x, y)).collect())
}

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        coordinate().prop_map(|f| Number::from_f64(f).map_or(Value::Null, Value::Number)),
        ".{0,12}".prop_map(Value::String),
    ]
}

/// Generate an arbitrary JSON value: nested arrays and objects over finite leaves.
pub fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Generate a value together with a differently formatted rendering of it.
pub fn reformatted_json() -> impl Strategy<Value = (Value, String)> {
    (json_value(), any::<u64>()).prop_map(|(value, seed)| {
        let text = render_scrambled(&value, seed);
        (value, text)
    })
}

/// Render JSON with permuted object keys and varying whitespace.
///
/// The output parses back to a value equal to `value`; only key order and
/// formatting differ, driven deterministically by `seed`.
pub fn render_scrambled(value: &Value, seed: u64) -> String {
    let mut out = String::new();
    let mut state = seed | 1;
    render_to(&mut out, value, &mut state);
    out
}

fn next(state: &mut u64) -> u64 {
    // xorshift64
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

fn whitespace(out: &mut String, state: &mut u64) {
    match next(state) % 4 {
        0 => {}
        1 => out.push(' '),
        2 => out.push_str("\n  "),
        _ => out.push('\t'),
    }
}

fn render_to(out: &mut String, value: &Value, state: &mut u64) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                whitespace(out, state);
                render_to(out, item, state);
            }
            whitespace(out, state);
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            if !entries.is_empty() {
                let shift = (next(state) as usize) % entries.len();
                entries.rotate_left(shift);
                if next(state) % 2 == 0 {
                    entries.reverse();
                }
            }
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                whitespace(out, state);
                out.push_str(&Value::String(key.clone()).to_string());
                whitespace(out, state);
                out.push(':');
                whitespace(out, state);
                render_to(out, item, state);
            }
            whitespace(out, state);
            out.push('}');
        }
        leaf => out.push_str(&leaf.to_string()),
    }
}
