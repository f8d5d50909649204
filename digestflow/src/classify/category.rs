//! Failure categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Actionable category of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Expected to resolve on retry (server error, unavailable, network).
    Transient,
    /// The API key was rejected.
    AuthInvalid,
    /// The key is valid but lacks access to the resource.
    PermissionDenied,
    /// The provider suspended the consumer account.
    AccountSuspended,
    /// Rate limit or usage quota reached.
    QuotaExceeded,
    /// The response was missing expected fields.
    MalformedResponse,
    /// Nothing in the rule table matched.
    Unknown,
}

impl FailureCategory {
    /// All categories, in rule-table order.
    pub const ALL: [Self; 7] = [
        Self::Transient,
        Self::AuthInvalid,
        Self::AccountSuspended,
        Self::PermissionDenied,
        Self::QuotaExceeded,
        Self::MalformedResponse,
        Self::Unknown,
    ];

    /// Only transient failures are retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Returns true if a failure of this category alerts an operator on its
    /// own. Transient failures alert only once retries are exhausted.
    #[must_use]
    pub fn is_notifiable(&self) -> bool {
        !self.is_retryable()
    }

    /// Human-readable label used in alerts.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Transient => "Service temporarily unavailable",
            Self::AuthInvalid => "Invalid API key",
            Self::PermissionDenied => "Permission denied",
            Self::AccountSuspended => "Account suspended",
            Self::QuotaExceeded => "Quota exceeded",
            Self::MalformedResponse => "Malformed response",
            Self::Unknown => "Unknown error",
        }
    }

    /// Stable identifier used as the remediation registry key.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::AuthInvalid => "auth_invalid",
            Self::PermissionDenied => "permission_denied",
            Self::AccountSuspended => "account_suspended",
            Self::QuotaExceeded => "quota_exceeded",
            Self::MalformedResponse => "malformed_response",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
