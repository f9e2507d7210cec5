//! Strict request-body decoding
//!
//! Decodes exactly one JSON document into a typed destination, classifying
//! every failure into a [`DecodeError`] variant. Request shapes are expected
//! to carry `#[serde(deny_unknown_fields)]` so fields that do not map to the
//! destination are rejected rather than silently dropped.
//!
//! Destination misuse cannot happen here: the destination is an owned value
//! produced by the type system (`T: DeserializeOwned`), so there is no
//! "non-addressable target" failure mode to classify.

use serde::de::DeserializeOwned;

use super::errors::DecodeError;

/// Default request-body size limit: 1 MiB
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// Decode a single JSON document from `body` with the default size limit
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    decode_with_limit(body, MAX_BODY_BYTES)
}

/// Decode a single JSON document from `body`, rejecting bodies larger than
/// `limit` before any parsing happens
pub fn decode_with_limit<T: DeserializeOwned>(body: &[u8], limit: usize) -> Result<T, DecodeError> {
    if body.len() > limit {
        return Err(DecodeError::TooLarge { limit });
    }

    // An empty (or whitespace-only) body is its own condition, distinct from
    // JSON that ends mid-value.
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(DecodeError::EmptyBody);
    }

    let mut de = serde_json::Deserializer::from_slice(body);

    // serde_path_to_error records the path to the failing field, which the
    // taxonomy needs for TypeMismatch and serde_json alone does not expose.
    let value: T = match serde_path_to_error::deserialize(&mut de) {
        Ok(value) => value,
        Err(err) => return Err(classify(err, body)),
    };

    // The first document parsed; anything left beyond it means the body held
    // more than one JSON value.
    if de.end().is_err() {
        return Err(DecodeError::TrailingData);
    }

    Ok(value)
}

/// Map a serde_json failure onto the taxonomy
fn classify(err: serde_path_to_error::Error<serde_json::Error>, body: &[u8]) -> DecodeError {
    use serde_json::error::Category;

    let path = err.path().to_string();
    let inner = err.into_inner();
    let offset = byte_offset(body, inner.line(), inner.column());

    match inner.classify() {
        Category::Eof => DecodeError::UnexpectedEof,
        Category::Syntax => DecodeError::Syntax { offset },
        Category::Io => DecodeError::Other(inner.to_string()),
        Category::Data => {
            // serde reports unknown fields as data errors; the field name is
            // only available from the rendered message, so it is extracted
            // here, once, at the boundary. Everything downstream switches on
            // the variant.
            if let Some(name) = unknown_field_name(&inner.to_string()) {
                return DecodeError::UnknownField(name);
            }

            // A path that is empty, the bare root, or a root-level index
            // ("[1]") names a position, not a field; fall back to the offset.
            let field = if path.is_empty() || path == "." || path.starts_with('[') {
                None
            } else {
                Some(path)
            };

            DecodeError::TypeMismatch { field, offset }
        }
    }
}

/// Extract `name` from serde's "unknown field `name`, expected ..." message
fn unknown_field_name(message: &str) -> Option<String> {
    let rest = message.strip_prefix("unknown field `")?;
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}

/// Convert serde_json's 1-based line/column position into a byte offset
fn byte_offset(body: &[u8], line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }

    let mut remaining_newlines = line - 1;
    let mut offset = 0;

    for (i, b) in body.iter().enumerate() {
        if remaining_newlines == 0 {
            break;
        }
        if *b == b'\n' {
            remaining_newlines -= 1;
            offset = i + 1;
        }
    }

    offset + column
}
