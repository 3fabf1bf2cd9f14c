//! Live SMTP probing of a domain's mail exchangers.
//!
//! [`Verifier::check_smtp`] resolves the MX records, races a connection to
//! every exchanger, then runs a partial SMTP dialogue (greeting,
//! `HELO`, `MAIL FROM`, `RCPT TO`) on the winner without ever sending `DATA`.
//! The outcome is an [`SmtpResult`] describing host reachability, catch-all
//! behaviour and mailbox deliverability.

mod dialogue;
mod error;
mod options;
mod race;
mod session;
mod transport;
mod types;
mod util;
mod verifier;

#[cfg(test)]
mod testing;

pub use error::{DialFailure, SmtpCheckError};
pub use options::ProbeConfig;
pub use race::Won;
pub use transport::{Dialer, TcpDialer, Transport};
pub use types::{SmtpReply, SmtpResult, Stage};
pub use util::{PROBE_LOCAL_PART_LEN, random_email, random_local_part};
pub use verifier::{SmtpCheck, Verifier};
