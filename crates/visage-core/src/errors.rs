/// Typed error hierarchy for enrollment operations.
/// Every variant except `UnknownSession` surfaces to the initiating user as
/// a status message; nothing here is allowed to take down a session.
#[derive(Clone, Debug, thiserror::Error)]
pub enum EnrollError {
    #[error("embedding dimension mismatch: {left} != {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("name cannot be empty")]
    EmptyLabel,

    #[error("detection failed: {0}")]
    DetectionFailure(String),

    #[error("persistence failed: {0}")]
    PersistenceFailure(String),

    #[error("unknown session: {0}")]
    UnknownSession(String),
}

impl EnrollError {
    /// Whether this error is reported back to the user. `UnknownSession`
    /// means the event raced connection teardown, so there is nobody left
    /// to tell.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::UnknownSession(_))
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::EmptyLabel => "empty_label",
            Self::DetectionFailure(_) => "detection_failure",
            Self::PersistenceFailure(_) => "persistence_failure",
            Self::UnknownSession(_) => "unknown_session",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_session_is_silent() {
        assert!(!EnrollError::UnknownSession("sess_x".into()).is_reportable());
        assert!(EnrollError::EmptyLabel.is_reportable());
        assert!(EnrollError::DetectionFailure("decode".into()).is_reportable());
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(
            EnrollError::DimensionMismatch { left: 512, right: 128 }.error_kind(),
            "dimension_mismatch"
        );
        assert_eq!(EnrollError::EmptyLabel.error_kind(), "empty_label");
        assert_eq!(
            EnrollError::PersistenceFailure("disk full".into()).error_kind(),
            "persistence_failure"
        );
    }

    #[test]
    fn display_messages() {
        let e = EnrollError::DimensionMismatch { left: 512, right: 256 };
        assert_eq!(e.to_string(), "embedding dimension mismatch: 512 != 256");
        assert_eq!(EnrollError::EmptyLabel.to_string(), "name cannot be empty");
    }
}
