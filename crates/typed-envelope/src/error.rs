//! Envelope codec and registry error types.

use thiserror::Error;

/// Errors raised while encoding a value into an [`crate::Envelope`].
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The value does not serialize to a JSON object, so no type marker can
    /// be embedded into it.
    #[error("value does not serialize to a field map (got {0})")]
    NotAnObject(&'static str),
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while decoding an [`crate::Envelope`] back into a value.
///
/// Every failure is local to the decode call that raised it; the type
/// registry and concurrent calls are unaffected.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload bytes are not parseable as structural data at all.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    /// An object-shaped payload node carries no type marker, so it cannot
    /// be resolved without an explicit target type.
    #[error("payload node carries no type marker")]
    MissingMarker,
    /// A type marker embedded in the payload has no registered entry. The
    /// data is well-formed; the receiver just does not know this type.
    #[error("unresolved type marker `{0}`")]
    UnresolvedType(String),
    /// The payload shape is incompatible with the requested target beyond
    /// the tolerated field add/drop rule.
    #[error("payload shape mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },
}

/// Errors raised while registering a type into the process-wide registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Registered types must serialize to a field map; scalars and
    /// sequences cannot carry an embedded marker.
    #[error("type `{0}` does not serialize to a field map")]
    NonObjectType(&'static str),
    #[error("could not enumerate declared fields of `{marker}`: {source}")]
    FieldEnumeration {
        marker: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("type registry lock poisoned")]
    LockPoisoned,
}
