//! Structural payload hashing.
//!
//! djb2-family hash over a parsed payload tree. Object keys are visited in
//! sorted order and whitespace never reaches the hash, so two renderings of
//! the same payload structure always collide on purpose.

use serde_json::Value;

const START_STATE: i64 = 5381;
const CONST_NULL: i64 = 982_452_847;
const CONST_TRUE: i64 = 982_453_247;
const CONST_FALSE: i64 = 982_454_243;
const CONST_ARRAY: i64 = 982_452_259;
const CONST_STRING: i64 = 982_453_601;
const CONST_OBJECT: i64 = 982_454_533;

#[inline]
fn update_num(state: i64, num: i64) -> i64 {
    state.wrapping_shl(5).wrapping_add(state).wrapping_add(num)
}

fn update_str(mut state: i64, s: &str) -> i64 {
    state = update_num(state, CONST_STRING);
    state = update_num(state, s.len() as i64);
    for u in s.encode_utf16() {
        state = update_num(state, i64::from(u));
    }
    state
}

fn update_value(mut state: i64, value: &Value) -> i64 {
    match value {
        Value::Null => update_num(state, CONST_NULL),
        Value::Bool(v) => update_num(state, if *v { CONST_TRUE } else { CONST_FALSE }),
        Value::Number(v) => {
            if let Some(i) = v.as_i64() {
                update_num(state, i)
            } else if let Some(u) = v.as_u64() {
                update_num(state, u as i64)
            } else if let Some(f) = v.as_f64() {
                update_num(state, f.to_bits() as i64)
            } else {
                state
            }
        }
        Value::String(s) => update_str(state, s),
        Value::Array(items) => {
            state = update_num(state, CONST_ARRAY);
            for item in items {
                state = update_value(state, item);
            }
            state
        }
        Value::Object(map) => {
            state = update_num(state, CONST_OBJECT);
            let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
            keys.sort_unstable();
            for key in keys {
                state = update_str(state, key);
                state = update_value(state, &map[key]);
            }
            state
        }
    }
}

/// Hashes a payload tree into a 64-bit structural digest.
pub fn hash_value(value: &Value) -> u64 {
    update_value(START_STATE, value) as u64
}

#[cfg(test)]
mod tests {
    use super::hash_value;
    use serde_json::json;

    #[test]
    fn key_order_does_not_change_the_hash() {
        let a: serde_json::Value = serde_json::from_str(r#"{"a":1,"b":[true,null]}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"b":[true,null],"a":1}"#).unwrap();
        assert_eq!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn distinct_shapes_hash_differently() {
        assert_ne!(hash_value(&json!({"a": 1})), hash_value(&json!({"a": 2})));
        assert_ne!(hash_value(&json!([1, 2])), hash_value(&json!([2, 1])));
        assert_ne!(hash_value(&json!(null)), hash_value(&json!(false)));
    }
}
