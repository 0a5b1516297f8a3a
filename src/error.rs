//! Request-level error taxonomy for the audit pipeline.
//!
//! Every failure kind maps to a single generic 500 at the REST boundary but
//! stays distinguished here for internal diagnostics. A missing report id is
//! not an error — it is the `None` arm of [`crate::store::ReportStore::get`].

use thiserror::Error;

/// Failure of a single audit request, tagged by the pipeline stage that produced it.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Malformed target URL or missing request parameter. Surfaced verbatim as 400.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The headless browser could not be started.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// Navigation to the target page failed (bad URL, DNS, connection, timeout).
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The rule engine script could not be loaded into the page context.
    #[error("rule engine injection failed: {0}")]
    Injection(String),

    /// The in-page rule evaluation errored or produced unparseable output.
    #[error("rule evaluation failed: {0}")]
    Evaluation(String),

    /// Anything that does not fit the taxonomy above.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuditError {
    /// Short machine-readable kind tag for logs and telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Launch(_) => "launch_failure",
            Self::Navigation(_) => "navigation_failure",
            Self::Injection(_) => "injection_failure",
            Self::Evaluation(_) => "evaluation_failure",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether this failure is the caller's fault (400) rather than ours (500).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(AuditError::InvalidInput("x".into()).kind(), "invalid_input");
        assert_eq!(AuditError::Launch("x".into()).kind(), "launch_failure");
        assert_eq!(AuditError::Navigation("x".into()).kind(), "navigation_failure");
        assert_eq!(AuditError::Injection("x".into()).kind(), "injection_failure");
        assert_eq!(AuditError::Evaluation("x".into()).kind(), "evaluation_failure");
        assert_eq!(AuditError::Internal("x".into()).kind(), "internal");
    }

    #[test]
    fn test_only_invalid_input_is_client_error() {
        assert!(AuditError::InvalidInput("x".into()).is_client_error());
        assert!(!AuditError::Navigation("x".into()).is_client_error());
        assert!(!AuditError::Evaluation("x".into()).is_client_error());
    }
}
