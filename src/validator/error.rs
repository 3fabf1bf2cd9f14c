use thiserror::Error;

use crate::smtp_verify::SmtpCheckError;
use crate::validator::types::VerificationOutcome;

#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("invalid email format: '{email}'")]
    InvalidFormat { email: String },
    #[error("verification failed after {attempts} attempt(s): {source}")]
    VerificationFailed {
        attempts: u32,
        #[source]
        source: SmtpCheckError,
    },
}

impl ValidateError {
    pub fn invalid_format(email: impl Into<String>) -> Self {
        Self::InvalidFormat {
            email: email.into(),
        }
    }

    /// Failure outcome carrying this error as its message.
    pub fn outcome(&self) -> VerificationOutcome {
        match self {
            Self::InvalidFormat { .. } => VerificationOutcome::failed(self.to_string()),
            Self::VerificationFailed { source, .. } => {
                VerificationOutcome::failed_with(source.partial().copied(), self.to_string())
            }
        }
    }
}
