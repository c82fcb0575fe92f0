use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    UserNotFound,
    TaskNotFound,
    ActionNotFound,
    BonusNotFound,
    NotificationNotFound,
    DuplicateUser,
    InvalidActionValue,
    InvalidEnumValue,
    InvalidInput,
    StorageTransient,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::UserNotFound => "E2001",
            Self::TaskNotFound => "E2002",
            Self::ActionNotFound => "E2003",
            Self::BonusNotFound => "E2004",
            Self::NotificationNotFound => "E2005",
            Self::DuplicateUser => "E3001",
            Self::InvalidActionValue => "E3002",
            Self::InvalidEnumValue => "E3003",
            Self::InvalidInput => "E3004",
            Self::StorageTransient => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Hub not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::UserNotFound => "User not found",
            Self::TaskNotFound => "Task not found",
            Self::ActionNotFound => "Sustainability action not found",
            Self::BonusNotFound => "Bonus not found",
            Self::NotificationNotFound => "Notification not found",
            Self::DuplicateUser => "Username or email already registered",
            Self::InvalidActionValue => "Invalid action value",
            Self::InvalidEnumValue => "Invalid source/category value",
            Self::InvalidInput => "Invalid input",
            Self::StorageTransient => "Storage write failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `glh init` to initialize this hub."),
            Self::ConfigParseError => Some("Fix syntax in .greenhub/config.toml and retry."),
            Self::UserNotFound => Some("Register the user with `glh user add` first."),
            Self::TaskNotFound | Self::ActionNotFound | Self::BonusNotFound => None,
            Self::NotificationNotFound => {
                Some("List notifications with `glh notifications list` to find a valid id.")
            }
            Self::DuplicateUser => Some("Pick a different username or email."),
            Self::InvalidActionValue => {
                Some("Action values must be finite, non-negative and reasonably sized.")
            }
            Self::InvalidEnumValue => {
                Some("Use one of the documented category values: exercise, nutrition, sustainability.")
            }
            Self::InvalidInput => Some("Provide a non-empty value for every required field."),
            Self::StorageTransient => {
                Some("Retry the operation; nothing was recorded for this event.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures surfaced by the award pipeline.
///
/// An event that was already processed is not an error; it comes back as a
/// successful outcome with `already_processed` set.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("task '{0}' not found")]
    TaskNotFound(String),

    #[error("sustainability action '{0}' not found")]
    ActionNotFound(String),

    #[error("bonus '{0}' not found")]
    BonusNotFound(String),

    #[error("username or email already registered: {0}")]
    DuplicateUser(String),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("invalid value {value} for action '{action_type}'")]
    InvalidActionValue { action_type: String, value: f64 },

    /// The storage layer rejected or failed a write. Nothing from the failed
    /// transaction is visible and the event can be retried.
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl PipelineError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UserNotFound(_) => ErrorCode::UserNotFound,
            Self::TaskNotFound(_) => ErrorCode::TaskNotFound,
            Self::ActionNotFound(_) => ErrorCode::ActionNotFound,
            Self::BonusNotFound(_) => ErrorCode::BonusNotFound,
            Self::DuplicateUser(_) => ErrorCode::DuplicateUser,
            Self::EmptyField(_) => ErrorCode::InvalidInput,
            Self::InvalidActionValue { .. } => ErrorCode::InvalidActionValue,
            Self::Storage(_) => ErrorCode::StorageTransient,
        }
    }

    /// Whether re-running the same call can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, PipelineError};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotInitialized,
            ErrorCode::ConfigParseError,
            ErrorCode::UserNotFound,
            ErrorCode::TaskNotFound,
            ErrorCode::ActionNotFound,
            ErrorCode::BonusNotFound,
            ErrorCode::NotificationNotFound,
            ErrorCode::DuplicateUser,
            ErrorCode::InvalidActionValue,
            ErrorCode::InvalidEnumValue,
            ErrorCode::InvalidInput,
            ErrorCode::StorageTransient,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::StorageTransient.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn only_storage_failures_are_retryable() {
        let storage = PipelineError::Storage(rusqlite::Error::QueryReturnedNoRows);
        assert!(storage.is_retryable());
        assert_eq!(storage.code(), ErrorCode::StorageTransient);

        let missing = PipelineError::UserNotFound("ghost".into());
        assert!(!missing.is_retryable());
        assert_eq!(missing.hint(), ErrorCode::UserNotFound.hint());
    }
}
