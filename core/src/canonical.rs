//! Canonical encoding of signed payloads.
//!
//! This is the byte-exact encoding that signatures are computed over (spec
//! §4.1): objects emit keys in ascending lexicographic order, arrays and
//! strings follow ordinary JSON escaping, integers are printed in their
//! shortest decimal form, and non-integer numbers are rejected — they are
//! not part of the data model. The encoder operates on `serde_json::Value`
//! rather than introducing a second data model, the same way the DSSE
//! reference implementations in this ecosystem layer PAE encoding on top of
//! plain serde structs instead of a bespoke AST.

use serde_json::Value;

use crate::error::{InTotoError, Result};

/// Encode `value` as canonical JSON bytes.
pub fn canonicalize(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode(value, &mut out)?;
    Ok(out)
}

fn encode(value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.extend_from_slice(i.to_string().as_bytes());
            } else if let Some(u) = n.as_u64() {
                out.extend_from_slice(u.to_string().as_bytes());
            } else {
                return Err(InTotoError::FormatError(format!(
                    "non-integer number '{n}' is not part of the canonical data model"
                )));
            }
        }
        Value::String(s) => encode_string(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                encode(item, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            out.push(b'{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                encode_string(key, out);
                out.push(b':');
                encode(&map[*key], out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

fn encode_string(s: &str, out: &mut Vec<u8>) {
    // serde_json's string serializer already produces the minimal JSON
    // escaping we need; reuse it rather than hand-rolling escape rules.
    let encoded = serde_json::to_string(s).expect("string serialization cannot fail");
    out.extend_from_slice(encoded.as_bytes());
}

/// The DSSE `PAE(type, body)` Pre-Authentication Encoding:
/// `"DSSEv1" + SP + LEN(type) + SP + type + SP + LEN(body) + SP + body`.
pub fn dsse_pae(payload_type: &str, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + payload_type.len() + 32);
    out.extend_from_slice(b"DSSEv1 ");
    out.extend_from_slice(payload_type.len().to_string().as_bytes());
    out.push(b' ');
    out.extend_from_slice(payload_type.as_bytes());
    out.push(b' ');
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.push(b' ');
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn orders_object_keys_lexicographically() {
        let value = json!({"b": 1, "a": 2, "c": {"z": 1, "a": 2}});
        let bytes = canonicalize(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":2,"b":1,"c":{"a":2,"z":1}}"#
        );
    }

    #[test]
    fn round_trips_through_reparse() {
        let value = json!({"_type": "link", "materials": {"a.py": {"sha256": "aa"}}, "n": 42});
        let first = canonicalize(&value).unwrap();
        let reparsed: Value = serde_json::from_slice(&first).unwrap();
        let second = canonicalize(&reparsed).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_non_integer_numbers() {
        let value = json!({"x": 1.5});
        assert!(canonicalize(&value).is_err());
    }

    #[test]
    fn pae_matches_reference_vector() {
        let pae = dsse_pae("http://example.com/HelloWorld", b"hello world");
        assert_eq!(pae, b"DSSEv1 29 http://example.com/HelloWorld 11 hello world");
    }
}
