//! Response-body handling shared by the session manager and the gateway.
//!
//! The Sweet Shop service is inconsistent about its body shapes: most
//! endpoints return the resource bare, a few wrap it in `{"data": ...}`, and
//! mutation confirmations are plain text. Everything here normalizes those
//! shapes so callers never see the difference.

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Unwrap a `{"data": T}` envelope to `T`; pass anything else through.
#[must_use]
pub fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Deserialize a success body, unwrapping the envelope when present.
///
/// # Errors
///
/// Returns [`ApiError::Network`]/[`ApiError::Timeout`] if the body cannot be
/// read, or [`ApiError::Parse`] if it does not match `T`.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(ApiError::from_transport)?;
    let body: Value = serde_json::from_slice(&bytes)?;
    Ok(serde_json::from_value(unwrap_envelope(body))?)
}

/// Turn a non-success response into [`ApiError::Server`].
///
/// Prefers a structured `{"message": ...}` body, falls back to the raw text,
/// and finally to the status code's canonical reason.
pub async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let fallback = status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string();

    let message = match response.text().await {
        Ok(text) if !text.trim().is_empty() => {
            match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map
                    .get("message")
                    .or_else(|| map.get("error"))
                    .and_then(Value::as_str)
                    .map_or(text, ToOwned::to_owned),
                _ => text,
            }
        }
        _ => fallback,
    };

    ApiError::Server {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_data_envelope() {
        let wrapped = json!({"data": {"id": "1"}, "success": true});
        assert_eq!(unwrap_envelope(wrapped), json!({"id": "1"}));
    }

    #[test]
    fn passes_bare_bodies_through() {
        let bare = json!([{"id": "1"}]);
        assert_eq!(unwrap_envelope(bare.clone()), bare);

        // An object without a `data` key is not an envelope.
        let object = json!({"id": "1", "name": "Fudge"});
        assert_eq!(unwrap_envelope(object.clone()), object);
    }

    #[test]
    fn null_data_unwraps_to_null() {
        assert_eq!(unwrap_envelope(json!({"data": null})), Value::Null);
    }
}
