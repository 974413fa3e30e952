//! Canonical JSON encoding for deterministic sign bytes.
//!
//! The canonical form is:
//! - Object keys sorted recursively by byte comparison
//! - Compact separators, no insignificant whitespace
//! - `<`, `>` and `&` escaped as `\u003c`, `\u003e`, `\u0026`
//!
//! The escaping matches the ledger's own JSON encoder, so that bytes produced
//! here are identical to the bytes a ledger-side verifier reconstructs.
//!
//! Canonicalization of a document that cannot be represented as JSON panics.
//! Such a document can only come from a construction-time contract violation
//! (e.g. a map with non-string keys), never from runtime input.

use serde::Serialize;
use serde_json::Value;

/// Serialize `value` to canonical JSON bytes.
///
/// # Panics
///
/// Panics if `value` is not representable as JSON.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    let tree = to_value(value);
    encode_value(&tree)
}

/// Convert `value` into a JSON tree.
///
/// # Panics
///
/// Panics if `value` is not representable as JSON.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| panic!("document is not JSON-serializable: {e}"))
}

/// Re-sort already encoded JSON bytes into canonical form.
///
/// # Panics
///
/// Panics if `bytes` is not valid JSON.
pub fn sort_json(bytes: &[u8]) -> Vec<u8> {
    let tree: Value = serde_json::from_slice(bytes)
        .unwrap_or_else(|e| panic!("cannot canonicalize malformed JSON: {e}"));
    encode_value(&tree)
}

/// Encode a JSON tree with sorted keys.
fn encode_value(tree: &Value) -> Vec<u8> {
    let mut out = String::new();
    write_value(&mut out, tree);
    escape_html(&out).into_bytes()
}

/// Recursively write a JSON value.
///
/// Object entries are sorted here rather than relying on the map's own
/// iteration order, which depends on serde_json feature flags.
fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_scalar(out, &Value::String(key.clone()));
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        scalar => write_scalar(out, scalar),
    }
}

/// Write a string, number, bool or null.
fn write_scalar(out: &mut String, value: &Value) {
    out.push_str(&value.to_string());
}

/// Escape HTML-significant characters and the JavaScript line separators.
///
/// These characters can only occur inside JSON string literals, so the
/// replacement never alters document structure.
fn escape_html(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Unsorted {
        zeta: u32,
        alpha: &'static str,
        middle: Nested,
    }

    #[derive(Serialize)]
    struct Nested {
        b: bool,
        a: Vec<u8>,
    }

    #[test]
    fn test_keys_sorted_recursively() {
        let doc = Unsorted {
            zeta: 1,
            alpha: "x",
            middle: Nested {
                b: true,
                a: vec![3, 2, 1],
            },
        };
        let bytes = canonical_json(&doc);
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            r#"{"alpha":"x","middle":{"a":[3,2,1],"b":true},"zeta":1}"#
        );
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let mut first = HashMap::new();
        first.insert("memo", "m");
        first.insert("chain_id", "c");
        first.insert("fee", "f");

        let mut second = HashMap::new();
        second.insert("fee", "f");
        second.insert("memo", "m");
        second.insert("chain_id", "c");

        assert_eq!(canonical_json(&first), canonical_json(&second));
    }

    #[test]
    fn test_sort_json_reorders_raw_bytes() {
        let sorted = sort_json(br#"{ "b": {"d": 1, "c": 2}, "a": [ {"y": 0, "x": 0} ] }"#);
        assert_eq!(
            std::str::from_utf8(&sorted).unwrap(),
            r#"{"a":[{"x":0,"y":0}],"b":{"c":2,"d":1}}"#
        );
    }

    #[test]
    fn test_html_characters_escaped() {
        let bytes = canonical_json(&serde_json::json!({"memo": "a<b>&c"}));
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            r#"{"memo":"a\u003cb\u003e\u0026c"}"#
        );
    }

    #[test]
    fn test_escaped_output_is_stable() {
        let once = canonical_json(&serde_json::json!({"k": "<tag>"}));
        let twice = sort_json(&once);
        assert_eq!(once, twice);
    }

    #[test]
    #[should_panic(expected = "not JSON-serializable")]
    fn test_non_string_map_keys_panic() {
        let mut map = HashMap::new();
        map.insert(vec![1u8], 1u8);
        canonical_json(&map);
    }
}
