//! The ordered classification rule table.
//!
//! Status rules come first so an HTTP status always wins over message text
//! (a 401 is `AuthInvalid` whatever its body says). The structural checks
//! come next because a malformed body is echoed into the message and must
//! not be matched as text. First match wins.

use std::fmt;

use super::FailureCategory;
use crate::errors::{RemoteError, RemoteErrorKind};

/// What a rule looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// HTTP status is one of the listed codes.
    Status(&'static [u16]),
    /// HTTP status matches and the message contains the needle (case-insensitive).
    StatusWithText(u16, &'static str),
    /// The response lacked expected fields.
    MissingFields,
    /// No response was received at all.
    Transport,
    /// Message contains the needle (case-sensitive).
    Text(&'static str),
    /// Message contains the needle (case-insensitive, needle lowercase).
    TextIgnoreCase(&'static str),
}

impl Matcher {
    fn matches(&self, error: &RemoteError, lowered: &str) -> bool {
        match *self {
            Self::Status(codes) => error.status.is_some_and(|s| codes.contains(&s)),
            Self::StatusWithText(code, needle) => {
                error.status == Some(code) && lowered.contains(needle)
            }
            Self::MissingFields => error.is_malformed(),
            Self::Transport => error.kind == RemoteErrorKind::Transport,
            Self::Text(needle) => error.message.contains(needle),
            Self::TextIgnoreCase(needle) => lowered.contains(needle),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(codes) => {
                let codes: Vec<String> = codes.iter().map(ToString::to_string).collect();
                write!(f, "HTTP {}", codes.join("/"))
            }
            Self::StatusWithText(code, needle) => write!(f, "HTTP {code} + \"{needle}\""),
            Self::MissingFields => write!(f, "response missing expected fields"),
            Self::Transport => write!(f, "no response received"),
            Self::Text(needle) => write!(f, "\"{needle}\""),
            Self::TextIgnoreCase(needle) => write!(f, "\"{needle}\" (case-insensitive)"),
        }
    }
}

/// One row of the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationRule {
    /// Category assigned when the rule matches.
    pub category: FailureCategory,
    /// Signal the rule inspects.
    pub matcher: Matcher,
}

impl ClassificationRule {
    const fn new(category: FailureCategory, matcher: Matcher) -> Self {
        Self { category, matcher }
    }

    /// Returns true if the rule applies to the error.
    #[must_use]
    pub fn matches(&self, error: &RemoteError) -> bool {
        self.matcher.matches(error, &error.message.to_lowercase())
    }
}

/// The single source of truth for failure classification.
pub static RULES: &[ClassificationRule] = &[
    ClassificationRule::new(FailureCategory::Transient, Matcher::Status(&[500, 502, 503, 504])),
    ClassificationRule::new(FailureCategory::AuthInvalid, Matcher::Status(&[401])),
    ClassificationRule::new(FailureCategory::AccountSuspended, Matcher::StatusWithText(403, "suspended")),
    ClassificationRule::new(FailureCategory::PermissionDenied, Matcher::Status(&[403])),
    ClassificationRule::new(FailureCategory::QuotaExceeded, Matcher::Status(&[429])),
    ClassificationRule::new(FailureCategory::MalformedResponse, Matcher::MissingFields),
    ClassificationRule::new(FailureCategory::Transient, Matcher::Transport),
    ClassificationRule::new(FailureCategory::Transient, Matcher::TextIgnoreCase("internal error")),
    ClassificationRule::new(FailureCategory::Transient, Matcher::Text("UNAVAILABLE")),
    ClassificationRule::new(FailureCategory::AuthInvalid, Matcher::TextIgnoreCase("invalid api key")),
    ClassificationRule::new(FailureCategory::AuthInvalid, Matcher::TextIgnoreCase("api key not valid")),
    ClassificationRule::new(FailureCategory::AccountSuspended, Matcher::TextIgnoreCase("suspended")),
    ClassificationRule::new(FailureCategory::PermissionDenied, Matcher::TextIgnoreCase("permission denied")),
    ClassificationRule::new(FailureCategory::QuotaExceeded, Matcher::TextIgnoreCase("quota")),
    ClassificationRule::new(FailureCategory::QuotaExceeded, Matcher::TextIgnoreCase("resource exhausted")),
    ClassificationRule::new(FailureCategory::QuotaExceeded, Matcher::Text("RESOURCE_EXHAUSTED")),
];

/// Returns the first rule matching the error, if any.
#[must_use]
pub fn first_match(error: &RemoteError) -> Option<&'static ClassificationRule> {
    let lowered = error.message.to_lowercase();
    RULES.iter().find(|rule| rule.matcher.matches(error, &lowered))
}
