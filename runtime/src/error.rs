//! Error taxonomy for a bonus run.
//!
//! The first group is fatal: the run stops before any plan executes. The
//! step group is caught at the step boundary and recorded on that step's
//! result while the run carries on.

/// Everything that can go wrong during a run.
#[derive(thiserror::Error, Debug)]
pub enum BonusError {
    #[error("Missing credentials. Set MAM_EMAIL (or MAM_USERNAME) and MAM_PASSWORD.")]
    MissingCredentials,

    #[error("Login failed or was blocked by site checks (hint: {0}).")]
    LoginFailure(String),

    #[error("Session is not authenticated when opening {0}.")]
    SessionUnauthenticated(String),

    #[error("Could not parse current bonus points from the account page.")]
    ExtractionFailure,

    #[error("No action surface found for section keywords: {0}")]
    ActionSurfaceNotFound(String),

    #[error("Submission failed: {0}")]
    SubmissionFailure(String),

    #[error("Confirmation failed: {0}")]
    ConfirmationFailure(String),

    #[error("No acknowledgment within {0}ms")]
    AcknowledgmentTimeout(u64),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Remote surface error: {0:#}")]
    Surface(#[from] anyhow::Error),
}

impl BonusError {
    /// Short machine-readable code used in results and JSON errors.
    pub fn code(&self) -> &'static str {
        match self {
            BonusError::MissingCredentials => "missing_credentials",
            BonusError::LoginFailure(_) => "login_failure",
            BonusError::SessionUnauthenticated(_) => "session_unauthenticated",
            BonusError::ExtractionFailure => "extraction_failure",
            BonusError::ActionSurfaceNotFound(_) => "action_surface_not_found",
            BonusError::SubmissionFailure(_) => "submission_failure",
            BonusError::ConfirmationFailure(_) => "confirmation_failure",
            BonusError::AcknowledgmentTimeout(_) => "acknowledgment_timeout",
            BonusError::Config(_) => "config",
            BonusError::Surface(_) => "surface",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_name_the_variant() {
        assert_eq!(BonusError::MissingCredentials.code(), "missing_credentials");
        assert_eq!(BonusError::AcknowledgmentTimeout(45_000).code(), "acknowledgment_timeout");
        assert_eq!(BonusError::Surface(anyhow::anyhow!("detached")).code(), "surface");
    }

    #[test]
    fn test_login_hint_in_message() {
        let err = BonusError::LoginFailure("cookies enabled".into());
        assert!(err.to_string().contains("hint: cookies enabled"));
        assert_eq!(err.code(), "login_failure");
    }
}
