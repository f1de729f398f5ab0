use crate::widget::WidgetId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Widget [{0}] not found")]
    NotFound(WidgetId),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Z-order overflow: shifting would exceed {}", i32::MAX)]
    ZOrderOverflow,
    // Only reachable through an engine bug.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// True for every rejection caused by the caller's input rather than by
    /// the store itself.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::ZOrderOverflow)
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(Error::NotFound(7).is_not_found());
        assert!(!Error::NotFound(7).is_validation());
        assert!(Error::validation("Nothing to update").is_validation());
        assert!(Error::ZOrderOverflow.is_validation());
        assert!(!Error::InvariantViolation("dup".into()).is_validation());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(Error::NotFound(42).to_string(), "Widget [42] not found");
        assert_eq!(
            Error::validation("Nothing to update").to_string(),
            "Validation failed: Nothing to update"
        );
    }
}
