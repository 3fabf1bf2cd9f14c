//! Address-level entry point: split the address, run the SMTP check with
//! retries, and turn the flags into a [`VerificationOutcome`].

mod error;
mod retry;
mod types;

pub use error::ValidateError;
pub use retry::RetryPolicy;
pub use types::{
    EmailParts, MSG_CATCH_ALL, MSG_CHECK_DISABLED, MSG_DELIVERABLE, MSG_UNDELIVERABLE,
    VerificationOutcome,
};

use tracing::debug;

use crate::smtp_verify::{ProbeConfig, SmtpCheck, Verifier};

/// Splits `email` at its only `@`. Surrounding whitespace is ignored; both
/// halves must be non-empty and free of whitespace, control characters and
/// angle brackets.
pub fn split_email(email: &str) -> Result<EmailParts, ValidateError> {
    let input = email.trim();
    let mut parts = input.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(username), Some(domain), None)
            if is_address_part(username) && is_address_part(domain) =>
        {
            Ok(EmailParts {
                username: username.to_string(),
                domain: domain.to_string(),
            })
        }
        _ => Err(ValidateError::invalid_format(input)),
    }
}

fn is_address_part(part: &str) -> bool {
    !part.is_empty()
        && !part
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '<' || c == '>')
}

/// Validates addresses through an [`SmtpCheck`], retrying failed checks.
#[derive(Debug, Clone)]
pub struct Validator<C: SmtpCheck = Verifier> {
    checker: C,
    retry: RetryPolicy,
}

impl Validator<Verifier> {
    pub fn new(config: ProbeConfig) -> Self {
        Self::with_checker(Verifier::new(config), RetryPolicy::default())
    }
}

impl Default for Validator<Verifier> {
    fn default() -> Self {
        Self::new(ProbeConfig::default())
    }
}

impl<C: SmtpCheck> Validator<C> {
    pub fn with_checker(checker: C, retry: RetryPolicy) -> Self {
        Self { checker, retry }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn checker(&self) -> &C {
        &self.checker
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Runs the SMTP check for `username@domain`, retrying per the policy.
    pub fn check_email(
        &self,
        domain: &str,
        username: &str,
    ) -> Result<VerificationOutcome, ValidateError> {
        let result = self.retry.run(&self.checker, domain, username)?;
        Ok(VerificationOutcome::from_result(result))
    }

    /// Splits `email` and checks it. Malformed input fails before any
    /// network activity.
    pub fn validate_email(&self, email: &str) -> Result<VerificationOutcome, ValidateError> {
        let parts = split_email(email)?;
        debug!(
            target: "mailprobe::validator",
            username = %parts.username,
            domain = %parts.domain,
            "validating address"
        );
        self.check_email(&parts.domain, &parts.username)
    }
}
