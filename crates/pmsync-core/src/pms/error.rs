//! Errors reported by PMS clients

use std::fmt;

use thiserror::Error;

/// Classification of a PMS failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PmsErrorCode {
    /// Transport failure or timeout
    Network,
    /// Credentials rejected
    Unauthorized,
    /// Provider throttled the request
    RateLimited,
    /// Response could not be decoded
    MalformedResponse,
    /// Client is missing required settings
    NotConfigured,
    /// Any other provider-reported failure
    Provider(String),
}

impl PmsErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            PmsErrorCode::Network => "network",
            PmsErrorCode::Unauthorized => "unauthorized",
            PmsErrorCode::RateLimited => "rate_limited",
            PmsErrorCode::MalformedResponse => "malformed_response",
            PmsErrorCode::NotConfigured => "not_configured",
            PmsErrorCode::Provider(code) => code,
        }
    }
}

impl fmt::Display for PmsErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure talking to the PMS
///
/// Carries no retry policy; callers decide with [`PmsError::is_transient`].
#[derive(Error, Debug, Clone)]
#[error("PMS error [{code}]: {message}")]
pub struct PmsError {
    pub code: PmsErrorCode,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl PmsError {
    pub fn new(code: PmsErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PmsErrorCode::Network, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(PmsErrorCode::Unauthorized, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(PmsErrorCode::MalformedResponse, message)
    }

    /// Whether the same request may succeed later without changes
    pub fn is_transient(&self) -> bool {
        matches!(self.code, PmsErrorCode::Network | PmsErrorCode::RateLimited)
    }
}

impl From<reqwest::Error> for PmsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            PmsError::malformed(e.to_string())
        } else {
            PmsError::network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for PmsError {
    fn from(e: serde_json::Error) -> Self {
        PmsError::malformed(e.to_string())
    }
}
