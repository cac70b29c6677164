//! Byte codecs for file-backed stores.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Raised when stored bytes cannot be decoded.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CodecError(pub String);

/// Encodes and decodes the value held by a [`DataStore`](super::DataStore).
///
/// `encode` must be deterministic: equal values produce equal bytes.
pub trait Codec<T>: Send + Sync {
    /// Decodes stored bytes.
    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError>;

    /// Encodes a value for storage.
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError>;
}

/// JSON codec backed by `serde_json`.
///
/// An empty file decodes to the default value, matching a store that was
/// created but never written.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned + Default,
{
    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        serde_json::from_slice(bytes).map_err(|e| CodecError(e.to_string()))
    }

    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec_pretty(value).map_err(|e| CodecError(e.to_string()))
    }
}
