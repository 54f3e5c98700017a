use serde_json::{Value, json};
use shared::Error;

const INSTAGRAM_AUTH_FAILED: &str = "Instagram account authentication failed. Please reconnect your Instagram account in Settings → Accounts.";
const INSTAGRAM_TOKEN_MISSING: &str = "Instagram account is missing access token. Please reconnect your Instagram account in Settings → Accounts. Make sure your Instagram Business account is linked to your Facebook Page.";
const SESSION_EXPIRED: &str = "Authentication failed. Please log in again.";

/// Map a non-2xx response to an [`Error`].
///
/// `body` is the parsed response body, or the synthetic failure envelope when
/// the body was not JSON.
pub fn normalize_error(status: u16, endpoint: &str, body: &Value) -> Error {
    if status == 429 {
        return Error::RateLimited;
    }

    if let Some(error) = text_field(body, "error") {
        if error.contains("Missing Instagram") || error.contains("Instagram account is missing") {
            return Error::PlatformReconnect(INSTAGRAM_TOKEN_MISSING.to_string());
        }
    }

    let message = text_field(body, "message")
        .or_else(|| text_field(body, "error"))
        .or_else(|| text_field(body, "detail"))
        .map(str::to_string)
        .unwrap_or_else(|| fallback_message(status));

    if status == 401 && (message.contains("token") || message.contains("authorization")) {
        return if endpoint.contains("instagram") || endpoint.contains("post") {
            Error::PlatformReconnect(INSTAGRAM_AUTH_FAILED.to_string())
        } else {
            Error::Unauthorized(SESSION_EXPIRED.to_string())
        };
    }

    Error::Http { status, message }
}

/// Envelope standing in for a body that could not be parsed.
pub(crate) fn unparseable_body(status: u16) -> Value {
    let message = fallback_message(status);
    json!({ "success": false, "message": message, "error": message })
}

fn fallback_message(status: u16) -> String {
    format!("HTTP error! status: {}", status)
}

fn text_field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
