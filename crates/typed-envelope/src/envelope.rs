//! The serialized-data envelope.

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::Value;

use crate::error::DecodeError;
use crate::hash;

/// Out-of-band metadata carried alongside a payload. The codec never
/// interprets it.
pub type Meta = BTreeMap<String, String>;

/// Immutable carrier of serialized bytes plus an optional declared-type
/// hint and optional metadata.
///
/// Absent bytes are the distinguished representation of the null value:
/// `bytes` is `None` if and only if the encoded value was null, and such
/// an envelope always decodes to null regardless of any requested target.
///
/// The declared-type hint is advisory only. It is recorded at encode time
/// for collaborators that want to route without parsing the payload;
/// decode never consults it — the payload is self-describing.
///
/// An envelope is never mutated in place. The `with_*` methods build a new
/// envelope overriding one field and keeping the others; no validation of
/// overridden bytes against the hint happens until a later decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    bytes: Option<Vec<u8>>,
    declared_type: Option<String>,
    meta: Option<Meta>,
}

impl Envelope {
    /// Builds an envelope from its raw parts, e.g. as received from a
    /// transport.
    pub fn new(bytes: Option<Vec<u8>>, declared_type: Option<String>, meta: Option<Meta>) -> Self {
        Self {
            bytes,
            declared_type,
            meta,
        }
    }

    /// Raw serialized payload, or `None` for the null value.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    pub fn is_null(&self) -> bool {
        self.bytes.is_none()
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    /// New envelope with the payload replaced.
    pub fn with_bytes(&self, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
            declared_type: self.declared_type.clone(),
            meta: self.meta.clone(),
        }
    }

    /// New envelope with the payload replaced by the absent marker.
    pub fn with_absent_bytes(&self) -> Self {
        Self {
            bytes: None,
            declared_type: self.declared_type.clone(),
            meta: self.meta.clone(),
        }
    }

    /// New envelope with the declared-type hint replaced.
    pub fn with_declared_type(&self, declared_type: impl Into<String>) -> Self {
        Self {
            bytes: self.bytes.clone(),
            declared_type: Some(declared_type.into()),
            meta: self.meta.clone(),
        }
    }

    /// New envelope with the metadata replaced.
    pub fn with_meta(&self, meta: Meta) -> Self {
        Self {
            bytes: self.bytes.clone(),
            declared_type: self.declared_type.clone(),
            meta: Some(meta),
        }
    }

    /// Renders the payload as human-diffable JSON text.
    ///
    /// Absent bytes render as `null`. Unparseable bytes are a
    /// malformed-payload error.
    pub fn to_text(&self, pretty: bool) -> Result<String, DecodeError> {
        let value = self.parse()?;
        let text = if pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(text)
    }

    /// Structural digest of the payload, rendered as URL-safe base64.
    ///
    /// Two envelopes whose payloads are structurally equal hash the same,
    /// independent of field order or whitespace in the bytes.
    pub fn content_hash(&self) -> Result<String, DecodeError> {
        let value = self.parse()?;
        let digest = hash::hash_value(&value);
        Ok(URL_SAFE_NO_PAD.encode(digest.to_be_bytes()))
    }

    fn parse(&self) -> Result<Value, DecodeError> {
        match &self.bytes {
            None => Ok(Value::Null),
            Some(bytes) => Ok(serde_json::from_slice(bytes)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Envelope, Meta};
    use crate::error::DecodeError;

    fn meta(pairs: &[(&str, &str)]) -> Meta {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn with_overrides_keep_the_other_fields() {
        let original = Envelope::new(
            Some(br#"{"a":1}"#.to_vec()),
            Some("A".to_owned()),
            Some(meta(&[("origin", "test")])),
        );

        let rebound = original.with_bytes(br#"{"a":2}"#.to_vec());
        assert_eq!(rebound.declared_type(), Some("A"));
        assert_eq!(rebound.meta(), original.meta());
        assert_eq!(rebound.bytes(), Some(br#"{"a":2}"#.as_slice()));

        let retyped = original.with_declared_type("B");
        assert_eq!(retyped.bytes(), original.bytes());
        assert_eq!(retyped.declared_type(), Some("B"));

        let nulled = original.with_absent_bytes();
        assert!(nulled.is_null());
        assert_eq!(nulled.meta(), original.meta());

        let remetad = original.with_meta(meta(&[("origin", "elsewhere")]));
        assert_eq!(remetad.bytes(), original.bytes());
        assert_eq!(remetad.meta(), Some(&meta(&[("origin", "elsewhere")])));

        // The original is untouched throughout.
        assert_eq!(original.declared_type(), Some("A"));
        assert_eq!(original.bytes(), Some(br#"{"a":1}"#.as_slice()));
    }

    #[test]
    fn to_text_renders_null_for_absent_bytes() {
        let envelope = Envelope::new(None, None, None);
        assert_eq!(envelope.to_text(false).unwrap(), "null");
        assert_eq!(envelope.to_text(true).unwrap(), "null");
    }

    #[test]
    fn to_text_pretty_and_compact_agree_structurally() {
        let envelope = Envelope::new(Some(br#"{"a":[1,2],"b":"x"}"#.to_vec()), None, None);
        let compact = envelope.to_text(false).unwrap();
        let pretty = envelope.to_text(true).unwrap();
        assert_ne!(compact, pretty);

        let a: serde_json::Value = serde_json::from_str(&compact).unwrap();
        let b: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn to_text_rejects_garbage_bytes() {
        let envelope = Envelope::new(Some(b"\xff\xfe".to_vec()), None, None);
        assert!(matches!(
            envelope.to_text(false),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn content_hash_ignores_rendering_differences() {
        let compact = Envelope::new(Some(br#"{"a":1,"b":2}"#.to_vec()), None, None);
        let spaced = Envelope::new(Some(b"{ \"b\": 2, \"a\": 1 }".to_vec()), None, None);
        assert_eq!(
            compact.content_hash().unwrap(),
            spaced.content_hash().unwrap()
        );

        let different = Envelope::new(Some(br#"{"a":1,"b":3}"#.to_vec()), None, None);
        assert_ne!(
            compact.content_hash().unwrap(),
            different.content_hash().unwrap()
        );
    }
}
