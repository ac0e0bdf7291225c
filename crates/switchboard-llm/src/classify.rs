//! Provider failure classification
//!
//! Every failure, whatever its origin, goes through one shared rule table:
//! explicit HTTP status first, then keywords in the message, then `unknown`.
//! Each protocol family nests its error body differently, so each gets a
//! small extractor that pulls `{status, message}` out before classification.

use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::error::{CanonicalError, DEFAULT_RATE_LIMIT_WAIT_SECS, ErrorCode};

/// A failure before classification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFailure {
    pub status: Option<u16>,
    pub message: String,
    /// Seconds from a `retry-after` style header
    pub retry_after: Option<u64>,
    pub request_id: Option<String>,
    pub original: Option<String>,
}

impl RawFailure {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Pulls status and message out of a family-specific error body
pub type Extractor = fn(Option<u16>, &Value) -> RawFailure;

/// Apply the shared rule table
pub fn classify(provider: &str, failure: RawFailure) -> CanonicalError {
    let code = failure
        .status
        .and_then(code_for_status)
        .or_else(|| code_for_message(&failure.message))
        .unwrap_or(ErrorCode::Unknown);

    let retry_after = failure
        .retry_after
        .or_else(|| (code == ErrorCode::RateLimit).then_some(DEFAULT_RATE_LIMIT_WAIT_SECS));

    let message = if failure.message.trim().is_empty() {
        failure.status.map_or_else(
            || "unknown provider error".to_owned(),
            |status| format!("provider returned status {status}"),
        )
    } else {
        failure.message
    };

    let mut error = CanonicalError::new(code, provider, message)
        .with_request_id(failure.request_id)
        .with_original(failure.original);
    error.retry_after_seconds = retry_after;
    error
}

fn code_for_status(status: u16) -> Option<ErrorCode> {
    match status {
        401 => Some(ErrorCode::AuthFailed),
        404 => Some(ErrorCode::ModelNotFound),
        429 => Some(ErrorCode::RateLimit),
        402 | 403 => Some(ErrorCode::QuotaExceeded),
        500 | 502 | 503 => Some(ErrorCode::ServerError),
        408 | 504 => Some(ErrorCode::Timeout),
        400 | 422 => Some(ErrorCode::InvalidRequest),
        _ => None,
    }
}

fn code_for_message(message: &str) -> Option<ErrorCode> {
    let lower = message.to_lowercase();

    if lower.contains("rate limit") {
        Some(ErrorCode::RateLimit)
    } else if lower.contains("auth") || lower.contains("api key") {
        Some(ErrorCode::AuthFailed)
    } else if lower.contains("quota") || lower.contains("limit") {
        Some(ErrorCode::QuotaExceeded)
    } else if lower.contains("timeout") || lower.contains("timed out") {
        Some(ErrorCode::Timeout)
    } else {
        None
    }
}

/// Classify a non-success HTTP response
pub fn http_failure(provider: &str, extract: Extractor, status: u16, headers: &HeaderMap, body: &str) -> CanonicalError {
    let parsed = serde_json::from_str::<Value>(body).unwrap_or_else(|_| Value::String(body.to_owned()));

    let mut raw = extract(Some(status), &parsed);
    raw.retry_after = parse_retry_after(headers);
    raw.request_id = request_id(headers);
    raw.original = Some(body.to_owned());

    classify(provider, raw)
}

/// Classify an error frame that arrived inside an otherwise healthy stream
pub fn stream_failure(provider: &str, extract: Extractor, frame: &Value) -> CanonicalError {
    let mut raw = extract(None, frame);
    raw.original = Some(frame.to_string());
    classify(provider, raw)
}

/// Classify a `reqwest` transport failure
///
/// Timeouts map to `timeout`; everything else is a `network_error`.
pub fn transport(provider: &str, error: &reqwest::Error) -> CanonicalError {
    let code = if error.is_timeout() {
        ErrorCode::Timeout
    } else {
        ErrorCode::NetworkError
    };
    CanonicalError::new(code, provider, error.to_string())
}

/// Classify a failure while reading an already-open body
pub fn read_failure(provider: &str, message: String) -> CanonicalError {
    let lower = message.to_lowercase();
    let code = if lower.contains("timeout") || lower.contains("timed out") {
        ErrorCode::Timeout
    } else {
        ErrorCode::NetworkError
    };
    CanonicalError::new(code, provider, message)
}

/// Seconds to wait from `retry-after` (integer or fractional) or `retry-after-ms`
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    let seconds = |raw: &str| {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
    };

    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    header("retry-after")
        .and_then(seconds)
        .or_else(|| header("retry-after-ms").and_then(seconds).map(|ms| ms / 1000.0))
        .map(|secs| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let rounded = secs.ceil() as u64;
            rounded
        })
}

/// Provider request id for support correlation
pub fn request_id(headers: &HeaderMap) -> Option<String> {
    ["x-request-id", "request-id"]
        .into_iter()
        .find_map(|name| headers.get(name))
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn str_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn status_at(value: &Value, key: &str) -> Option<u16> {
    value
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u16::try_from(n).ok())
}

fn body_text(body: &Value) -> String {
    match body {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Status implied by OpenAI-style string error codes
fn status_for_openai_code(code: &str) -> Option<u16> {
    match code {
        "rate_limit_exceeded" => Some(429),
        "insufficient_quota" => Some(402),
        "invalid_api_key" => Some(401),
        "model_not_found" => Some(404),
        "server_error" => Some(500),
        _ => None,
    }
}

/// `{"error": {"message", "code", "type"}}`
pub fn chat_completions(status: Option<u16>, body: &Value) -> RawFailure {
    let error = body.get("error");

    let message = error
        .and_then(|e| str_at(e, "message"))
        .or_else(|| str_at(body, "message"))
        .or_else(|| error.and_then(Value::as_str))
        .map_or_else(|| body_text(body), str::to_owned);

    let status = status
        .or_else(|| error.and_then(|e| status_at(e, "code")))
        .or_else(|| {
            error
                .and_then(|e| str_at(e, "code").or_else(|| str_at(e, "type")))
                .and_then(status_for_openai_code)
        });

    RawFailure::new(status, message)
}

/// `{"error": {"error": {"message"}}}`, `{"error": {"message"}}` or `{"message"}`
pub fn responses(status: Option<u16>, body: &Value) -> RawFailure {
    let error = body.get("error").filter(|e| e.is_object());
    let nested = error.and_then(|e| e.get("error")).filter(|e| e.is_object());

    let message = nested
        .and_then(|e| str_at(e, "message"))
        .or_else(|| error.and_then(|e| str_at(e, "message")))
        .or_else(|| str_at(body, "message"))
        .map_or_else(|| body_text(body), str::to_owned);

    let status = status
        .or_else(|| status_at(body, "status"))
        .or_else(|| error.and_then(|e| status_at(e, "status")))
        .or_else(|| {
            [nested, error, Some(body)]
                .into_iter()
                .flatten()
                .find_map(|v| str_at(v, "code"))
                .and_then(status_for_openai_code)
        });

    RawFailure::new(status, message)
}

/// `{"type": "error", "error": {"type", "message"}}`
pub fn messages(status: Option<u16>, body: &Value) -> RawFailure {
    let error = body.get("error").filter(|e| e.is_object());

    let message = error
        .and_then(|e| str_at(e, "message"))
        .or_else(|| str_at(body, "message"))
        .map_or_else(|| body_text(body), str::to_owned);

    let status = status.or_else(|| {
        error.and_then(|e| str_at(e, "type")).and_then(|kind| match kind {
            "rate_limit_error" => Some(429),
            "authentication_error" => Some(401),
            "permission_error" => Some(403),
            "not_found_error" => Some(404),
            "invalid_request_error" => Some(400),
            "overloaded_error" => Some(503),
            "api_error" => Some(500),
            _ => None,
        })
    });

    RawFailure::new(status, message)
}

/// `{"error": {"code", "message", "status"}}`, sometimes wrapped in an array
pub fn chat_session(status: Option<u16>, body: &Value) -> RawFailure {
    let root = body.as_array().and_then(|items| items.first()).unwrap_or(body);
    let error = root.get("error").filter(|e| e.is_object());

    let message = error
        .and_then(|e| str_at(e, "message"))
        .map_or_else(|| body_text(body), str::to_owned);

    let status = status.or_else(|| error.and_then(|e| status_at(e, "code")));

    RawFailure::new(status, message)
}
