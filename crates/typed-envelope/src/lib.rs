//! Self-describing serialization envelope.
//!
//! Carries arbitrary values — including polymorphic object graphs and
//! ordered sequences — across a process, storage, or network boundary
//! while staying decodable without the receiver knowing the concrete type
//! up front. Every polymorphic payload node embeds its own type marker;
//! a process-wide [`registry`] maps markers back to constructible types.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use typed_envelope::{codec, registry, Tagged};
//!
//! #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
//! struct Greeting {
//!     text: String,
//! }
//!
//! impl Tagged for Greeting {
//!     const TYPE_NAME: &'static str = "Greeting";
//! }
//!
//! registry::register::<Greeting>().unwrap();
//!
//! let value = Greeting { text: "hi".into() };
//! let envelope = codec::encode(Some(&value), None, None).unwrap();
//!
//! // The receiver needs no target type; the payload says what it is.
//! let decoded = codec::decode(&envelope).unwrap();
//! assert_eq!(decoded.as_one().unwrap().downcast_ref::<Greeting>(), Some(&value));
//! ```

pub mod codec;
pub mod constants;
pub mod dynamic;
pub mod envelope;
pub mod error;
pub mod hash;
pub mod registry;

pub use codec::{
    decode, decode_as, decode_seq_as, encode, encode_dynamic, encode_dynamic_seq, encode_seq,
    Decoded,
};
pub use constants::TYPE_MARKER_KEY;
pub use dynamic::{Dynamic, ErasedTagged, Tagged};
pub use envelope::{Envelope, Meta};
pub use error::{DecodeError, EncodeError, RegistryError};
pub use registry::{is_registered, register, resolve, TypeEntry};
