use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Retry-after assumed for rate limits when the provider gives none
pub const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 30;

/// Provider-independent failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    RateLimit,
    AuthFailed,
    ModelNotFound,
    QuotaExceeded,
    ServerError,
    Timeout,
    InvalidRequest,
    NetworkError,
    Unknown,
}

impl ErrorCode {
    /// Whether a failure of this kind may succeed on a later attempt
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::ServerError | Self::Timeout | Self::NetworkError
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::AuthFailed => "auth_failed",
            Self::ModelNotFound => "model_not_found",
            Self::QuotaExceeded => "quota_exceeded",
            Self::ServerError => "server_error",
            Self::Timeout => "timeout",
            Self::InvalidRequest => "invalid_request",
            Self::NetworkError => "network_error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider failure normalized into one shape
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{provider}: {message} ({code})")]
pub struct CanonicalError {
    pub code: ErrorCode,
    /// Human-readable description from the provider, or a synthesized one
    pub message: String,
    /// Provider tag the failure is attributed to
    pub provider: String,
    /// Seconds the provider asked us to wait before retrying
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Raw payload the error was derived from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
}

impl CanonicalError {
    pub fn new(code: ErrorCode, provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: provider.into(),
            retry_after_seconds: None,
            request_id: None,
            original: None,
        }
    }

    pub fn invalid_request(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, provider, message)
    }

    #[must_use]
    pub const fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    #[must_use]
    pub fn with_original(mut self, original: Option<String>) -> Self {
        self.original = original;
        self
    }

    pub const fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Provider-requested wait before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_seconds.map(Duration::from_secs)
    }

    /// Multi-line, user-facing description with a remediation hint
    pub fn render(&self) -> String {
        let mut out = format!("{}\n\nProvider: {}", self.message, self.provider);
        if let Some(request_id) = &self.request_id {
            out.push_str("\nRequest ID: ");
            out.push_str(request_id);
        }
        out.push('\n');
        out.push_str(&self.hint());
        out
    }

    fn hint(&self) -> String {
        match self.code {
            ErrorCode::RateLimit => format!(
                "Please wait {} seconds before trying again.",
                self.retry_after_seconds.unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS)
            ),
            ErrorCode::AuthFailed => "Please check your API key in settings.".to_owned(),
            ErrorCode::QuotaExceeded => "Please check your billing details.".to_owned(),
            ErrorCode::ModelNotFound => "The selected model is not available.".to_owned(),
            ErrorCode::InvalidRequest => "Please check the request parameters.".to_owned(),
            ErrorCode::ServerError | ErrorCode::Timeout | ErrorCode::NetworkError | ErrorCode::Unknown => {
                "Please try again.".to_owned()
            }
        }
    }
}
