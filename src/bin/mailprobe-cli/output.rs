use anyhow::Result;
#[cfg(not(feature = "with-serde"))]
use anyhow::bail;

use mailprobe::{ValidateError, VerificationOutcome};

use crate::args::Format;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct OutputRow {
    pub email: String,
    /// false when the address could not be verified at all
    pub verified: bool,
    #[cfg_attr(feature = "with-serde", serde(flatten))]
    pub outcome: VerificationOutcome,
}

impl OutputRow {
    pub fn new(email: &str, result: Result<VerificationOutcome, ValidateError>) -> Self {
        let email = email.trim().to_string();
        match result {
            Ok(outcome) => Self {
                email,
                verified: true,
                outcome,
            },
            Err(err) => Self {
                email,
                verified: false,
                outcome: err.outcome(),
            },
        }
    }

    fn label(&self) -> &'static str {
        let outcome = &self.outcome;
        if !self.verified {
            "[ERROR]"
        } else if outcome.is_deliverable {
            "[OK]"
        } else if outcome.catch_all {
            "[CATCH-ALL]"
        } else if outcome.is_valid {
            "[SYNTAX]"
        } else {
            "[INVALID]"
        }
    }

    fn flags(&self) -> Vec<&'static str> {
        let outcome = &self.outcome;
        [
            (outcome.host_exists, "host_exists"),
            (outcome.catch_all, "catch_all"),
            (outcome.full_inbox, "full_inbox"),
            (outcome.is_disabled, "disabled"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

pub fn any_failed(rows: &[OutputRow]) -> bool {
    rows.iter().any(|row| !row.verified)
}

pub fn write_reports(rows: &[OutputRow], format: Format) -> Result<()> {
    match format {
        Format::Human => {
            print!("{}", render_human(rows));
            Ok(())
        }
        Format::Json => write_json(rows),
    }
}

pub fn render_human(rows: &[OutputRow]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&format!(
            "{:<12}{} :: {}\n",
            row.label(),
            row.email,
            row.outcome.message
        ));
        let flags = row.flags();
        if !flags.is_empty() {
            out.push_str(&format!("            flags: {}\n", flags.join(", ")));
        }
    }
    out
}

#[cfg(feature = "with-serde")]
fn write_json(rows: &[OutputRow]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(rows)?);
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_: &[OutputRow]) -> Result<()> {
    bail!("--format json requires the 'with-serde' feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailprobe::{SmtpCheckError, SmtpResult};

    fn rows() -> Vec<OutputRow> {
        vec![
            OutputRow::new(
                "alice@example.com",
                Ok(VerificationOutcome::from_result(Some(SmtpResult {
                    host_exists: true,
                    deliverable: true,
                    ..SmtpResult::default()
                }))),
            ),
            OutputRow::new(
                "bob@catchall.example",
                Ok(VerificationOutcome::from_result(Some(SmtpResult {
                    host_exists: true,
                    catch_all: true,
                    ..SmtpResult::default()
                }))),
            ),
            OutputRow::new(
                " carol@example.com ",
                Ok(VerificationOutcome::from_result(Some(SmtpResult {
                    host_exists: true,
                    full_inbox: true,
                    ..SmtpResult::default()
                }))),
            ),
            OutputRow::new("no-at-sign", Err(ValidateError::invalid_format("no-at-sign"))),
            OutputRow::new(
                "dave@nowhere.example",
                Err(ValidateError::VerificationFailed {
                    attempts: 2,
                    source: SmtpCheckError::NoMailExchanger {
                        domain: "nowhere.example".to_string(),
                        source: None,
                    },
                }),
            ),
        ]
    }

    #[test]
    fn human_report() {
        insta::assert_snapshot!(render_human(&rows()), @r"
        [OK]        alice@example.com :: Email is deliverable. The email address is valid
                    flags: host_exists
        [CATCH-ALL] bob@catchall.example :: Domain accepts all addresses; mailbox cannot be confirmed
                    flags: host_exists, catch_all
        [INVALID]   carol@example.com :: Email is not deliverable. The email address is invalid
                    flags: host_exists, full_inbox
        [ERROR]     no-at-sign :: invalid email format: 'no-at-sign'
        [ERROR]     dave@nowhere.example :: verification failed after 2 attempt(s): no MX records found for nowhere.example
        ");
    }

    #[test]
    fn only_unverified_rows_fail_the_run() {
        let rows = rows();
        assert!(any_failed(&rows));
        assert!(!any_failed(&rows[..3]));
    }

    #[cfg(feature = "with-serde")]
    #[test]
    fn json_rows_flatten_the_outcome() {
        let value = serde_json::to_value(&rows()[0]).expect("serializable");
        assert_eq!(value["email"], "alice@example.com");
        assert_eq!(value["verified"], true);
        assert_eq!(value["is_deliverable"], true);
        assert_eq!(value["message"], "Email is deliverable. The email address is valid");
    }
}
