//! Failure classification.
//!
//! [`classify`] is a pure, total function from a [`RemoteError`] to a
//! [`FailureCategory`]. Retry eligibility and alert content are both derived
//! from its result; call sites never inspect error text themselves.

mod category;
mod rules;

pub use category::FailureCategory;
pub use rules::{first_match, ClassificationRule, Matcher, RULES};

use crate::errors::RemoteError;

/// Classifies a remote failure. Returns [`FailureCategory::Unknown`] when no
/// rule matches.
#[must_use]
pub fn classify(error: &RemoteError) -> FailureCategory {
    first_match(error).map_or(FailureCategory::Unknown, |rule| rule.category)
}
