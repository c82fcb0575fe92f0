//! Domain types shared by the store, the award pipeline and the CLI.

pub mod badge;
pub mod event;
pub mod notification;
pub mod points;
pub mod user;

pub use badge::{Badge, BadgeDef, BadgeGrant};
pub use event::{Bonus, EventKey, SustainabilityAction, Task, TaskCategory};
pub use notification::Notification;
pub use points::{LedgerEntry, PointSource, PointsTotal};
pub use user::User;

use std::fmt;

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

pub(crate) fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace('-', "_")
}
