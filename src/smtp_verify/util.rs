use rand::{Rng, distributions::Alphanumeric};

use crate::smtp_verify::types::SmtpReply;

pub const PROBE_LOCAL_PART_LEN: usize = 32;

/// Random 32-character alphanumeric local part.
pub fn random_local_part() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PROBE_LOCAL_PART_LEN)
        .map(char::from)
        .collect()
}

/// Address that almost certainly does not exist at `domain` (36^32 local
/// parts), used to detect catch-all exchangers.
pub fn random_email(domain: &str) -> String {
    format!("{}@{domain}", random_local_part())
}

/// How a non-accepting reply to the target `RCPT TO` reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Refusal {
    FullInbox,
    Disabled,
    Other,
}

pub(crate) fn classify_refusal(reply: &SmtpReply) -> Refusal {
    match reply.enhanced_status() {
        Some((_, 2, 2)) => return Refusal::FullInbox,
        Some((_, 2, 1)) => return Refusal::Disabled,
        _ => {}
    }
    match reply.code {
        422 | 452 | 552 => Refusal::FullInbox,
        _ => Refusal::Other,
    }
}
