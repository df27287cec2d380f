//! Base64 text as it travels in x402 headers and payloads.
//!
//! Servers are not consistent about the alphabet: most send standard padded
//! base64, a few send the URL-safe alphabet without padding. Decoding accepts
//! both; encoding always produces standard padded text.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Base64 text, kept as raw ASCII bytes as it came off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes(pub Vec<u8>);

impl Base64Bytes {
    /// Encodes binary data.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Self {
        Self(STANDARD.encode(input).into_bytes())
    }

    /// Decodes to binary, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`base64::DecodeError`] if the text is neither standard nor
    /// URL-safe base64. The error reported is the one for the standard alphabet.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let text = self.0.trim_ascii();
        STANDARD.decode(text).or_else(|err| {
            let unpadded = text
                .strip_suffix(b"==")
                .or_else(|| text.strip_suffix(b"="))
                .unwrap_or(text);
            URL_SAFE_NO_PAD.decode(unpadded).map_err(|_| err)
        })
    }
}

impl AsRef<[u8]> for Base64Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Base64Bytes {
    fn from(raw: &[u8]) -> Self {
        Self(raw.to_vec())
    }
}

impl fmt::Display for Base64Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Errors raised by the JSON-in-base64 helpers.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// Input was not valid base64.
    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// Decoded bytes were not the expected JSON.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializes `value` as JSON and base64-encodes the result.
///
/// # Errors
///
/// Returns [`EncodingError::Json`] if serialization fails.
pub fn encode_json<T: Serialize>(value: &T) -> Result<String, EncodingError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64Bytes::encode(json).to_string())
}

/// Decodes a base64 header value holding JSON.
///
/// # Errors
///
/// Returns [`EncodingError`] if the value is not base64 or not the expected JSON.
pub fn decode_json<T: DeserializeOwned>(value: &[u8]) -> Result<T, EncodingError> {
    let bytes = Base64Bytes::from(value).decode()?;
    Ok(serde_json::from_slice(&bytes)?)
}
