//! Process-wide type registry.
//!
//! Maps marker strings to decodable type entries. Registration is expected
//! at process start-up, before encode/decode traffic; steady-state lookups
//! only take the read lock. Re-registering a marker replaces the previous
//! entry (last registration wins).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::debug;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::codec;
use crate::dynamic::{Dynamic, Tagged};
use crate::error::{DecodeError, RegistryError};

static REGISTRY: Lazy<RwLock<HashMap<String, Arc<TypeEntry>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

type DecodeFn = fn(&Value) -> Result<Dynamic, DecodeError>;

/// Registry-held descriptor for one decodable type: its marker, its
/// declared field names, and a decode hook applying the tolerant field
/// coercion for that concrete type.
pub struct TypeEntry {
    marker: &'static str,
    fields: Vec<String>,
    decode: DecodeFn,
}

impl TypeEntry {
    pub fn marker(&self) -> &'static str {
        self.marker
    }

    /// Field names the type declares, in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub(crate) fn decode(&self, value: &Value) -> Result<Dynamic, DecodeError> {
        (self.decode)(value)
    }
}

/// Registers `T` under its marker.
///
/// # Errors
///
/// Fails when `T::default()` does not serialize to a field map; such a
/// type could not carry an embedded marker.
pub fn register<T: Tagged>() -> Result<(), RegistryError> {
    let fields = declared_fields::<T>()?;
    let entry = Arc::new(TypeEntry {
        marker: T::TYPE_NAME,
        fields,
        decode: decode_entry::<T>,
    });
    REGISTRY
        .write()
        .map_err(|_| RegistryError::LockPoisoned)?
        .insert(T::TYPE_NAME.to_owned(), entry);
    debug!("registered type marker `{}`", T::TYPE_NAME);
    Ok(())
}

/// Looks up the entry registered for `marker`.
///
/// A missing marker is not an error at this layer; the codec turns it into
/// an unresolved-type decode failure.
pub fn resolve(marker: &str) -> Option<Arc<TypeEntry>> {
    // A panicking writer cannot tear the map, so a poisoned lock is still
    // readable and must not masquerade as an unknown marker.
    let table = REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    table.get(marker).cloned()
}

pub fn is_registered(marker: &str) -> bool {
    resolve(marker).is_some()
}

fn decode_entry<T: Tagged>(value: &Value) -> Result<Dynamic, DecodeError> {
    codec::from_tagged::<T>(value).map(Dynamic::new)
}

fn declared_fields<T: Tagged>() -> Result<Vec<String>, RegistryError> {
    match serde_json::to_value(T::default()) {
        Ok(Value::Object(map)) => Ok(map.keys().cloned().collect()),
        Ok(_) => Err(RegistryError::NonObjectType(T::TYPE_NAME)),
        Err(source) => Err(RegistryError::FieldEnumeration {
            marker: T::TYPE_NAME,
            source,
        }),
    }
}
