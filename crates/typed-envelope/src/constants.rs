//! Payload constants.

/// Key under which a tagged payload node stores its type marker.
///
/// The marker is embedded inside the payload itself, so an envelope can be
/// decoded without the receiver knowing the concrete type up front.
pub const TYPE_MARKER_KEY: &str = "@type";
