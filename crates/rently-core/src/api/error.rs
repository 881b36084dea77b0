use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of API transport errors for consistent error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// 401 from the backend (missing, invalid or expired token)
    Unauthorized,
    /// Any other HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Connection timeout or request timeout
    Timeout,
    /// The backend could not be reached at all
    Unreachable,
    /// Failed to parse the response body
    Parse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Unauthorized => write!(f, "unauthorized"),
            ApiErrorKind::HttpStatus => write!(f, "http_status"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Unreachable => write!(f, "unreachable"),
            ApiErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Structured error from the backend API with kind and details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// HTTP status code, when the server answered
    pub status: Option<u16>,
    /// One-line summary suitable for display
    pub message: String,
    /// The server-supplied `error` field, verbatim, when present
    pub server_message: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            server_message: None,
        }
    }

    /// Creates an HTTP status error, extracting the backend's
    /// `{"error": "..."}` message from the body when present.
    pub fn http_status(status: u16, body: &str) -> Self {
        let kind = if status == 401 {
            ApiErrorKind::Unauthorized
        } else {
            ApiErrorKind::HttpStatus
        };

        if let Ok(json) = serde_json::from_str::<Value>(body)
            && let Some(msg) = json.get("error").and_then(|v| v.as_str())
        {
            return Self {
                kind,
                status: Some(status),
                message: format!("HTTP {}: {}", status, msg),
                server_message: Some(msg.to_string()),
            };
        }

        Self {
            kind,
            status: Some(status),
            message: format!("HTTP {}", status),
            server_message: None,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    /// Creates an unreachable-backend error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Unreachable, message)
    }

    /// Creates a response-parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    /// Maps a transport-level reqwest error into the taxonomy.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            Self::unreachable(format!("Could not reach the server: {}", err))
        } else if err.is_decode() {
            Self::parse(format!("Failed to decode response: {}", err))
        } else {
            Self::unreachable(err.to_string())
        }
    }

    /// Returns true for a 401 response.
    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    /// The server-supplied message when present, otherwise the fallback.
    pub fn server_message_or(&self, fallback: &str) -> String {
        self.server_message
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
