//! # Structured Codec
//!
//! Strict JSON request/response codec for the API surface.
//!
//! Decoding enforces a fixed failure taxonomy ([`DecodeError`]) instead of
//! leaking transport or serde internals to clients: size limit, unknown
//! fields, malformed syntax, type mismatches, empty bodies and trailing data
//! are all classified into exactly one variant per failure. Encoding wraps
//! every response in a single-object JSON [`Envelope`] with a fixed header
//! discipline.

pub mod decode;
pub mod encode;
pub mod envelope;
pub mod errors;

pub use decode::{decode, decode_with_limit, MAX_BODY_BYTES};
pub use encode::{write_json, EncodeError};
pub use envelope::Envelope;
pub use errors::DecodeError;
