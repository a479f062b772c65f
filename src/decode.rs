//! Turning raw HTTP bodies into typed results.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::client::ClientError;
use crate::http::HttpResponse;

/// Decode a complete response.
///
/// A non-success status yields [`ClientError::RemoteCall`] carrying the raw
/// body, whether or not that body is structured JSON.
pub fn decode_response<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ClientError> {
    if !response.is_success() {
        tracing::error!(
            "Gemini API error (status {}): {}",
            response.status,
            response.body
        );
        return Err(ClientError::RemoteCall {
            status: response.status,
            body: response.body,
        });
    }

    if let Some(err) = remote_error(response.body.as_bytes(), response.status) {
        return Err(err);
    }
    decode_json(&response.body)
}

/// Decode one message of a streamed response.
///
/// The API reports failures after the stream has started as an `error`
/// object in place of the next message.
pub fn decode_message<T: DeserializeOwned>(content: &[u8]) -> Result<T, ClientError> {
    if let Some(err) = remote_error(content, 200) {
        return Err(err);
    }
    decode_json_bytes(content)
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<Value>,
}

/// A `RemoteCall` for a body whose top-level object carries an `error` member.
///
/// The status comes from `error.code` when present.
fn remote_error(content: &[u8], status: u16) -> Option<ClientError> {
    let error = serde_json::from_slice::<ErrorEnvelope>(content).ok()?.error?;
    let status = error
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(status);
    let body = String::from_utf8_lossy(content).into_owned();
    tracing::error!("Gemini API error (status {}): {}", status, body);
    Some(ClientError::RemoteCall { status, body })
}

/// Parse one JSON document, keeping the raw text on failure.
pub fn decode_json<T: DeserializeOwned>(content: &str) -> Result<T, ClientError> {
    serde_json::from_str(content).map_err(|source| {
        tracing::error!("Failed to parse Gemini response: {}\nBody: {}", source, content);
        ClientError::Decode {
            content: content.to_string(),
            source,
        }
    })
}

/// Like [`decode_json`], for a byte slice that may not be valid UTF-8.
pub fn decode_json_bytes<T: DeserializeOwned>(content: &[u8]) -> Result<T, ClientError> {
    serde_json::from_slice(content).map_err(|source| {
        let content = String::from_utf8_lossy(content).into_owned();
        tracing::error!("Failed to parse Gemini message: {}\nBody: {}", source, content);
        ClientError::Decode { content, source }
    })
}
