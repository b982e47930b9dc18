//! Polymorphic values resolved through the type registry.
//!
//! [`Tagged`] is the registration-facing trait: any serde-capable,
//! defaultable struct can pick a marker string and become decodable by
//! name. [`Dynamic`] is the erased carrier for fields whose static type is
//! abstract; its serde impls embed the marker on the way out and consult
//! the registry on the way back in, so nesting depth never matters.

use std::any::Any;
use std::fmt;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::codec;
use crate::constants::TYPE_MARKER_KEY;
use crate::error::{DecodeError, EncodeError};
use crate::registry;

/// A concrete type the codec can embed and recover by marker.
///
/// `Default` supplies the per-field fill values used when a payload is
/// narrower than the target type, and is also how the registry enumerates
/// a type's declared fields. The type must serialize to a JSON object.
pub trait Tagged:
    Serialize + DeserializeOwned + Clone + fmt::Debug + PartialEq + Default + Send + Sync + 'static
{
    /// Marker string embedded in payloads for this type.
    const TYPE_NAME: &'static str;
}

/// Object-safe face of [`Tagged`], carried inside [`Dynamic`].
pub trait ErasedTagged: Any + fmt::Debug + Send + Sync {
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn clone_box(&self) -> Box<dyn ErasedTagged>;
    fn eq_box(&self, other: &dyn ErasedTagged) -> bool;
    fn to_tagged_json(&self) -> Result<Value, EncodeError>;
}

impl<T: Tagged> ErasedTagged for T {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn ErasedTagged> {
        Box::new(self.clone())
    }

    fn eq_box(&self, other: &dyn ErasedTagged) -> bool {
        other.as_any().downcast_ref::<T>().is_some_and(|other| self == other)
    }

    fn to_tagged_json(&self) -> Result<Value, EncodeError> {
        codec::tagged_value(self)
    }
}

/// A registry-resolved polymorphic value.
///
/// `Dynamic` also models the absent value, mirroring the envelope's
/// absent-bytes convention one level down: a defaulted `Dynamic` field is
/// null and round-trips as JSON `null`.
#[derive(Debug, Default)]
pub struct Dynamic(Option<Box<dyn ErasedTagged>>);

impl Dynamic {
    pub fn new<T: Tagged>(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    pub fn null() -> Self {
        Self(None)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Marker of the held value, if any.
    pub fn type_name(&self) -> Option<&'static str> {
        self.0.as_deref().map(ErasedTagged::type_name)
    }

    pub fn downcast_ref<T: Tagged>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|value| value.as_any().downcast_ref())
    }

    pub fn is<T: Tagged>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    /// Resolves a parsed payload node into a `Dynamic` via the registry.
    ///
    /// The node must be `null` or an object carrying a registered marker.
    pub fn from_tagged_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(Self::null()),
            Value::Object(map) => {
                let marker = match map.get(TYPE_MARKER_KEY) {
                    Some(Value::String(marker)) => marker,
                    _ => return Err(DecodeError::MissingMarker),
                };
                let entry = registry::resolve(marker).ok_or_else(|| {
                    debug!("no registered type for marker `{marker}`");
                    DecodeError::UnresolvedType(marker.clone())
                })?;
                entry.decode(value)
            }
            other => Err(DecodeError::TypeMismatch {
                expected: "tagged object or null",
                found: codec::json_kind(other).to_owned(),
            }),
        }
    }

    /// Payload tree for the held value: `null` or a marker-tagged object.
    pub(crate) fn to_payload(&self) -> Result<Value, EncodeError> {
        match &self.0 {
            None => Ok(Value::Null),
            Some(value) => value.to_tagged_json(),
        }
    }
}

impl Clone for Dynamic {
    fn clone(&self) -> Self {
        Self(self.0.as_deref().map(ErasedTagged::clone_box))
    }
}

impl PartialEq for Dynamic {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_box(b.as_ref()),
            _ => false,
        }
    }
}

impl<T: Tagged> From<T> for Dynamic {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl Serialize for Dynamic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            None => serializer.serialize_none(),
            Some(value) => {
                let tagged = value.to_tagged_json().map_err(serde::ser::Error::custom)?;
                tagged.serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_tagged_value(&value).map_err(serde::de::Error::custom)
    }
}
