use serde::Deserialize;
use serde_json::Value;

use crate::error::BridgeError;

/// Maps a Google error envelope to [`BridgeError::Upstream`].
///
/// The code is the Google RPC status (`INVALID_ARGUMENT`, `NOT_FOUND`, ...)
/// when present, otherwise the HTTP status. Bodies that are not an error
/// envelope are kept verbatim in the message.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::error::BridgeError;
/// use kotoba_bridge::provider::google_gemini::error::parse_gemini_error;
///
/// let err = parse_gemini_error(429, r#"{"error": {"code": 429, "message": "quota exhausted", "status": "RESOURCE_EXHAUSTED"}}"#);
/// assert_eq!(err.to_string(), "upstream error (RESOURCE_EXHAUSTED): quota exhausted");
/// ```
pub fn parse_gemini_error(status: u16, body: &str) -> BridgeError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        code: Option<i32>,
        message: Option<String>,
        status: Option<String>,
        #[allow(dead_code)]
        details: Option<Value>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(error) = parsed.error {
            let code = error
                .status
                .filter(|status| !status.is_empty())
                .or_else(|| error.code.map(|code| code.to_string()))
                .unwrap_or_else(|| status.to_string());
            let message = error
                .message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| "unknown error".to_string());
            return BridgeError::upstream(Some(code), message);
        }
    }

    // 无法解析时保留原始 body
    BridgeError::upstream(Some(status.to_string()), format!("status {status}: {body}"))
}
