use std::fmt;

use crate::smtp_verify::SmtpResult;

pub const MSG_DELIVERABLE: &str = "Email is deliverable. The email address is valid";
pub const MSG_CATCH_ALL: &str = "Domain accepts all addresses; mailbox cannot be confirmed";
pub const MSG_UNDELIVERABLE: &str = "Email is not deliverable. The email address is invalid";
pub const MSG_CHECK_DISABLED: &str = "SMTP check disabled; address syntax is valid";

/// The two halves of an address split at its single `@`.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailParts {
    pub username: String,
    pub domain: String,
}

impl fmt::Display for EmailParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.domain)
    }
}

/// User-facing verdict for one address.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub is_valid: bool,
    pub is_deliverable: bool,
    pub is_disabled: bool,
    pub full_inbox: bool,
    pub host_exists: bool,
    pub catch_all: bool,
    pub message: String,
}

impl VerificationOutcome {
    /// Maps the SMTP flags onto the outcome. `None` means the SMTP check was
    /// not requested; the address is then valid on syntax alone.
    pub fn from_result(result: Option<SmtpResult>) -> Self {
        let Some(result) = result else {
            return Self {
                is_valid: true,
                is_deliverable: false,
                is_disabled: false,
                full_inbox: false,
                host_exists: false,
                catch_all: false,
                message: MSG_CHECK_DISABLED.to_string(),
            };
        };

        let message = if result.deliverable {
            MSG_DELIVERABLE
        } else if result.catch_all {
            MSG_CATCH_ALL
        } else {
            MSG_UNDELIVERABLE
        };

        Self {
            is_valid: result.deliverable,
            is_deliverable: result.deliverable,
            is_disabled: result.disabled,
            full_inbox: result.full_inbox,
            host_exists: result.host_exists,
            catch_all: result.catch_all,
            message: message.to_string(),
        }
    }

    /// Outcome for an address that could not be verified at all.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            is_deliverable: false,
            is_disabled: false,
            full_inbox: false,
            host_exists: false,
            catch_all: false,
            message: message.into(),
        }
    }

    /// Like [`failed`](Self::failed) but keeps what the dialogue learned
    /// before it broke off.
    pub(crate) fn failed_with(partial: Option<SmtpResult>, message: impl Into<String>) -> Self {
        let partial = partial.unwrap_or_default();
        Self {
            host_exists: partial.host_exists,
            catch_all: partial.catch_all,
            full_inbox: partial.full_inbox,
            is_disabled: partial.disabled,
            ..Self::failed(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deliverable_mailbox_is_valid() {
        let outcome = VerificationOutcome::from_result(Some(SmtpResult {
            host_exists: true,
            deliverable: true,
            ..SmtpResult::default()
        }));
        assert!(outcome.is_valid && outcome.is_deliverable && outcome.host_exists);
        assert_eq!(outcome.message, MSG_DELIVERABLE);
    }

    #[test]
    fn catch_all_domain_is_not_confirmed() {
        let outcome = VerificationOutcome::from_result(Some(SmtpResult {
            host_exists: true,
            catch_all: true,
            ..SmtpResult::default()
        }));
        assert!(!outcome.is_valid);
        assert!(outcome.catch_all);
        assert_eq!(outcome.message, MSG_CATCH_ALL);
    }

    #[test]
    fn refused_mailbox_keeps_its_flags() {
        let outcome = VerificationOutcome::from_result(Some(SmtpResult {
            host_exists: true,
            full_inbox: true,
            ..SmtpResult::default()
        }));
        assert!(!outcome.is_valid);
        assert!(outcome.full_inbox);
        assert_eq!(outcome.message, MSG_UNDELIVERABLE);
    }

    #[test]
    fn skipped_check_is_valid_on_syntax() {
        let outcome = VerificationOutcome::from_result(None);
        assert!(outcome.is_valid);
        assert!(!outcome.is_deliverable);
        assert_eq!(outcome.message, MSG_CHECK_DISABLED);
    }

    #[test]
    fn parts_display_as_an_address() {
        let parts = EmailParts {
            username: "alice".into(),
            domain: "example.com".into(),
        };
        assert_eq!(parts.to_string(), "alice@example.com");
    }
}
