//! Remediation registry mapping failure categories to fix steps.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::classify::FailureCategory;

/// Structured remediation info for a failure category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remediation {
    /// Category this remediation applies to.
    pub category: FailureCategory,
    /// Short title.
    pub title: String,
    /// Steps an operator should take.
    pub fix_steps: Vec<String>,
}

impl Remediation {
    /// Creates a new remediation entry.
    #[must_use]
    pub fn new<I, S>(category: FailureCategory, title: impl Into<String>, fix_steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category,
            title: title.into(),
            fix_steps: fix_steps.into_iter().map(Into::into).collect(),
        }
    }
}

static REMEDIATIONS: LazyLock<RwLock<HashMap<FailureCategory, Remediation>>> = LazyLock::new(|| {
    let entries = [
        Remediation::new(
            FailureCategory::Transient,
            "Service temporarily unavailable",
            [
                "Check the provider status page for an ongoing outage",
                "Check the network connection of the host running the job",
                "Re-run the job once the service recovers",
            ],
        ),
        Remediation::new(
            FailureCategory::AuthInvalid,
            "API key rejected",
            [
                "Check the API key in the environment configuration",
                "Rotate the key in the provider console and update the environment",
            ],
        ),
        Remediation::new(
            FailureCategory::PermissionDenied,
            "Permission denied",
            [
                "Confirm the key has access to the requested model or resource",
                "Try switching to another available model version",
            ],
        ),
        Remediation::new(
            FailureCategory::AccountSuspended,
            "Account suspended",
            [
                "Contact the API provider's support to restore the account",
                "Switch to a key from a different account in the meantime",
            ],
        ),
        Remediation::new(
            FailureCategory::QuotaExceeded,
            "Quota exceeded",
            [
                "Check API usage against the plan's quota",
                "Upgrade the plan or wait for the quota window to reset",
            ],
        ),
        Remediation::new(
            FailureCategory::MalformedResponse,
            "Unexpected response format",
            [
                "Inspect the raw response in the diagnostic log below",
                "Check the provider changelog for API format changes",
            ],
        ),
        Remediation::new(
            FailureCategory::Unknown,
            "Unclassified failure",
            [
                "Check that the API key is valid",
                "Check the account status and usage quota",
                "Check the network connection",
                "Try switching to another available model version",
            ],
        ),
    ];

    RwLock::new(entries.into_iter().map(|r| (r.category, r)).collect())
});

/// Registers or replaces the remediation for a category.
pub fn register_remediation(remediation: Remediation) {
    REMEDIATIONS.write().insert(remediation.category, remediation);
}

/// Returns the remediation for a category.
#[must_use]
pub fn remediation_for(category: FailureCategory) -> Remediation {
    REMEDIATIONS
        .read()
        .get(&category)
        .cloned()
        .unwrap_or_else(|| Remediation::new(category, category.label(), Vec::<String>::new()))
}
