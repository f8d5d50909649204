//! Operator alerting: alert events, remediation hints and delivery.

mod alert;
mod dispatcher;
mod remediation;

pub use alert::AlertEvent;
pub use dispatcher::NotificationDispatcher;
pub use remediation::{register_remediation, remediation_for, Remediation};
