//! Error Types — Adapter and Transport Failures
//!
//! `ApiError` describes what went wrong talking to the Twitter API.
//! `AdapterError` is what callers of the stream adapter see: it maps
//! transport failures onto the configuration / rule-sync / auth taxonomy.

use std::fmt;

use thiserror::Error;

/// Transport-level failure from a Twitter API call.
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request failed (connect, timeout, reset, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Twitter answered with a non-success status.
    #[error("Twitter API error {status}: {message}")]
    Status { status: u16, message: String },

    /// Request succeeded but the API refused part of it.
    #[error("Twitter API rejected the request: {0}")]
    Rejected(String),
}

impl ApiError {
    /// Whether the remote side rejected the credential.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }

    /// Whether the same request may succeed if repeated later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Json(_) | Self::Rejected(_) => false,
        }
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// How far rule reconciliation got before failing.
///
/// A failure in `Creating` after a non-zero delete leaves the remote
/// side with no rules at all until the next attempt succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSyncStage {
    /// Listing the currently registered rules.
    Listing,
    /// Deleting the existing remote rules.
    Deleting { existing: usize },
    /// Creating the desired rules after `deleted` were removed.
    Creating { deleted: usize, requested: usize },
}

impl fmt::Display for RuleSyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listing => write!(f, "listing remote rules"),
            Self::Deleting { existing } => {
                write!(f, "deleting {existing} existing rules")
            }
            Self::Creating { deleted, requested } => write!(
                f,
                "creating {requested} rules after deleting {deleted}"
            ),
        }
    }
}

/// Errors surfaced by the stream adapter.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Bearer credential missing or empty.
    #[error("bearer token is missing or empty")]
    AuthConfiguration,

    /// Invalid rule set, target or other setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Remote rule installation failed part way through.
    #[error("rule sync failed while {stage}: {source}")]
    RuleSync {
        stage: RuleSyncStage,
        #[source]
        source: ApiError,
    },

    /// The stream endpoint rejected the credential. Terminal.
    #[error("credential rejected by the stream endpoint (HTTP {status}): {message}")]
    Auth { status: u16, message: String },
}

impl AdapterError {
    /// Whether the sequence has ended for good.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

/// A stream line that could not be turned into a record.
///
/// Never returned to the consumer: logged, counted, and skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// Offending line, truncated for logging.
    pub line: String,
    /// Why it was rejected.
    pub reason: String,
}

impl ParseWarning {
    const MAX_LOGGED_LINE: usize = 256;

    pub fn new(line: &str, reason: impl Into<String>) -> Self {
        let line = match line.char_indices().nth(Self::MAX_LOGGED_LINE) {
            Some((cut, _)) => format!("{}…", &line[..cut]),
            None => line.to_string(),
        };
        Self {
            line,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped stream line ({}): {}", self.reason, self.line)
    }
}
