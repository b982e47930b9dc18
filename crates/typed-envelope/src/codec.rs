//! Envelope encode/decode entry points.
//!
//! Encoding renders a value into JSON text with a type marker embedded on
//! every polymorphic object node. Decoding either coerces the payload into
//! an explicit target type (tolerating added and dropped fields) or walks
//! the payload and resolves each node from its own embedded marker.
//!
//! All functions are pure aside from read access to the type registry, so
//! arbitrarily many calls may run concurrently.

use serde_json::{Map, Value};

use crate::constants::TYPE_MARKER_KEY;
use crate::dynamic::{Dynamic, Tagged};
use crate::envelope::{Envelope, Meta};
use crate::error::{DecodeError, EncodeError};
use crate::registry;

/// Result of a marker-driven decode: the null value, a single
/// registry-resolved value, or an ordered sequence of either.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Null,
    One(Dynamic),
    Many(Vec<Decoded>),
}

impl Decoded {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_one(&self) -> Option<&Dynamic> {
        match self {
            Self::One(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_many(&self) -> Option<&[Decoded]> {
        match self {
            Self::Many(items) => Some(items),
            _ => None,
        }
    }
}

/// Encodes a value, or the null value, into an envelope.
///
/// `type_hint` is stored on the envelope as advisory metadata only; decode
/// never consults it. The null value is represented by absent bytes and
/// never carries a hint.
pub fn encode<T: Tagged>(
    value: Option<&T>,
    type_hint: Option<&str>,
    meta: Option<Meta>,
) -> Result<Envelope, EncodeError> {
    let (bytes, declared_type) = match value {
        None => (None, None),
        Some(value) => (
            Some(serde_json::to_vec(&tagged_value(value)?)?),
            type_hint.map(str::to_owned),
        ),
    };
    Ok(Envelope::new(bytes, declared_type, meta))
}

/// Encodes an ordered sequence; each element carries its own marker.
pub fn encode_seq<T: Tagged>(
    values: Option<&[T]>,
    type_hint: Option<&str>,
    meta: Option<Meta>,
) -> Result<Envelope, EncodeError> {
    let (bytes, declared_type) = match values {
        None => (None, None),
        Some(items) => {
            let payload: Vec<Value> = items.iter().map(tagged_value).collect::<Result<_, _>>()?;
            (
                Some(serde_json::to_vec(&Value::Array(payload))?),
                type_hint.map(str::to_owned),
            )
        }
    };
    Ok(Envelope::new(bytes, declared_type, meta))
}

/// Encodes an erased value; a null [`Dynamic`] yields a null envelope.
pub fn encode_dynamic(
    value: &Dynamic,
    type_hint: Option<&str>,
    meta: Option<Meta>,
) -> Result<Envelope, EncodeError> {
    let bytes = if value.is_null() {
        None
    } else {
        Some(serde_json::to_vec(&value.to_payload()?)?)
    };
    Ok(Envelope::new(bytes, type_hint.map(str::to_owned), meta))
}

/// Encodes a heterogeneous sequence of erased values. Null elements are
/// kept in place as JSON `null`.
pub fn encode_dynamic_seq(
    values: &[Dynamic],
    type_hint: Option<&str>,
    meta: Option<Meta>,
) -> Result<Envelope, EncodeError> {
    let payload: Vec<Value> = values
        .iter()
        .map(Dynamic::to_payload)
        .collect::<Result<_, _>>()?;
    let bytes = serde_json::to_vec(&Value::Array(payload))?;
    Ok(Envelope::new(Some(bytes), type_hint.map(str::to_owned), meta))
}

/// Decodes an envelope with no target type, resolving the concrete type of
/// every node from its own embedded marker.
pub fn decode(envelope: &Envelope) -> Result<Decoded, DecodeError> {
    let bytes = match envelope.bytes() {
        None => return Ok(Decoded::Null),
        Some(bytes) => bytes,
    };
    let value: Value = serde_json::from_slice(bytes)?;
    decode_value(&value)
}

/// Decodes an envelope into an explicit target type.
///
/// Payload fields the target does not declare are dropped; target fields
/// missing from the payload take the target's default value. Field-set
/// mismatch alone never fails. Absent bytes decode to `None` regardless of
/// the target.
pub fn decode_as<T: Tagged>(envelope: &Envelope) -> Result<Option<T>, DecodeError> {
    let bytes = match envelope.bytes() {
        None => return Ok(None),
        Some(bytes) => bytes,
    };
    let value: Value = serde_json::from_slice(bytes)?;
    from_tagged::<T>(&value).map(Some)
}

/// Decodes an envelope as a sequence of `T`, pushing the target down to
/// each element.
pub fn decode_seq_as<T: Tagged>(envelope: &Envelope) -> Result<Option<Vec<T>>, DecodeError> {
    let bytes = match envelope.bytes() {
        None => return Ok(None),
        Some(bytes) => bytes,
    };
    match serde_json::from_slice(bytes)? {
        Value::Array(items) => items
            .iter()
            .map(from_tagged::<T>)
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        other => Err(DecodeError::TypeMismatch {
            expected: "sequence",
            found: json_kind(&other).to_owned(),
        }),
    }
}

fn decode_value(value: &Value) -> Result<Decoded, DecodeError> {
    match value {
        Value::Null => Ok(Decoded::Null),
        Value::Array(items) => items
            .iter()
            .map(decode_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Decoded::Many),
        Value::Object(_) => Dynamic::from_tagged_value(value).map(Decoded::One),
        other => Err(DecodeError::TypeMismatch {
            expected: "tagged object, sequence or null",
            found: json_kind(other).to_owned(),
        }),
    }
}

/// Renders a value as a marker-tagged field map, marker first.
pub(crate) fn tagged_value<T: Tagged>(value: &T) -> Result<Value, EncodeError> {
    let fields = match serde_json::to_value(value)? {
        Value::Object(map) => map,
        other => return Err(EncodeError::NotAnObject(json_kind(&other))),
    };
    let mut tagged = Map::new();
    tagged.insert(
        TYPE_MARKER_KEY.to_owned(),
        Value::String(T::TYPE_NAME.to_owned()),
    );
    for (key, value) in fields {
        tagged.insert(key, value);
    }
    Ok(Value::Object(tagged))
}

/// Coerces an object-shaped payload node into `T`.
///
/// The payload's own top-level marker is ignored; the caller has already
/// committed to a concrete type. Markers nested in kept fields are checked
/// against the registry first so an unknown nested type surfaces as
/// [`DecodeError::UnresolvedType`].
pub(crate) fn from_tagged<T: Tagged>(value: &Value) -> Result<T, DecodeError> {
    let incoming = match value {
        Value::Object(map) => map,
        other => {
            return Err(DecodeError::TypeMismatch {
                expected: "object",
                found: json_kind(other).to_owned(),
            })
        }
    };
    let mut base = match serde_json::to_value(T::default()) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(DecodeError::TypeMismatch {
                expected: "object-shaped target type",
                found: json_kind(&other).to_owned(),
            })
        }
        Err(err) => {
            return Err(DecodeError::TypeMismatch {
                expected: T::TYPE_NAME,
                found: err.to_string(),
            })
        }
    };
    for (key, val) in incoming {
        if key == TYPE_MARKER_KEY {
            continue;
        }
        if base.contains_key(key) {
            base.insert(key.clone(), val.clone());
        }
    }
    let merged = Value::Object(base);
    verify_markers(&merged)?;
    serde_json::from_value(merged).map_err(|err| DecodeError::TypeMismatch {
        expected: T::TYPE_NAME,
        found: err.to_string(),
    })
}

/// Walks a payload subtree and fails on the first marker the registry does
/// not know, before any construction happens.
fn verify_markers(value: &Value) -> Result<(), DecodeError> {
    match value {
        Value::Object(map) => {
            if let Some(marker) = map.get(TYPE_MARKER_KEY) {
                let marker = marker.as_str().ok_or(DecodeError::MissingMarker)?;
                if !registry::is_registered(marker) {
                    return Err(DecodeError::UnresolvedType(marker.to_owned()));
                }
            }
            for nested in map.values() {
                verify_markers(nested)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                verify_markers(item)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::{decode, encode, json_kind, tagged_value, Decoded};
    use crate::dynamic::Tagged;
    use crate::envelope::Envelope;
    use crate::error::{DecodeError, EncodeError};
    use crate::registry;

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
    struct Point {
        x: i64,
        y: i64,
    }

    impl Tagged for Point {
        const TYPE_NAME: &'static str = "Point";
    }

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
    #[serde(transparent)]
    struct Raw(i64);

    impl Tagged for Raw {
        const TYPE_NAME: &'static str = "Raw";
    }

    #[test]
    fn marker_is_rendered_first() {
        registry::register::<Point>().unwrap();

        let envelope = encode(Some(&Point { x: 1, y: 2 }), None, None).unwrap();
        let text = envelope.to_text(false).unwrap();
        assert!(text.starts_with(r#"{"@type":"Point""#), "got {text}");
    }

    #[test]
    fn non_object_values_cannot_be_tagged() {
        let err = tagged_value(&Raw(7)).unwrap_err();
        assert!(matches!(err, EncodeError::NotAnObject("number")));

        let err = encode(Some(&Raw(7)), None, None).unwrap_err();
        assert!(matches!(err, EncodeError::NotAnObject("number")));
    }

    #[test]
    fn bare_scalar_payload_is_a_shape_mismatch() {
        let envelope = Envelope::new(Some(b"42".to_vec()), None, None);
        let err = decode(&envelope).unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { .. }));
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        let envelope = Envelope::new(Some(b"{not json".to_vec()), None, None);
        let err = decode(&envelope).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn null_elements_survive_inside_sequences() {
        registry::register::<Point>().unwrap();

        let envelope = Envelope::new(
            Some(br#"[{"@type":"Point","x":1,"y":2},null]"#.to_vec()),
            None,
            None,
        );
        let decoded = decode(&envelope).unwrap();
        let items = decoded.as_many().expect("sequence");
        assert_eq!(items.len(), 2);
        assert!(items[1].is_null());
    }

    #[test]
    fn json_kind_names_every_shape() {
        assert_eq!(json_kind(&serde_json::json!(null)), "null");
        assert_eq!(json_kind(&serde_json::json!(true)), "boolean");
        assert_eq!(json_kind(&serde_json::json!(1)), "number");
        assert_eq!(json_kind(&serde_json::json!("s")), "string");
        assert_eq!(json_kind(&serde_json::json!([])), "array");
        assert_eq!(json_kind(&serde_json::json!({})), "object");
    }

    #[test]
    fn decoded_accessors() {
        assert!(Decoded::Null.is_null());
        assert!(Decoded::Null.as_one().is_none());
        assert!(Decoded::Many(vec![]).as_many().is_some());
    }
}
