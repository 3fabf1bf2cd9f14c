#![forbid(unsafe_code)]
//! mailprobe: checks whether an e-mail address can receive mail by probing
//! the domain's mail exchangers over SMTP.

pub mod mx;
pub mod smtp_verify;
pub mod validator;

pub use mx::{Error as MxError, MxRecord, MxStatus, check_mx};
pub use smtp_verify::{
    DialFailure, ProbeConfig, SmtpCheck, SmtpCheckError, SmtpReply, SmtpResult, Stage, TcpDialer,
    Verifier, random_email,
};
pub use validator::{
    EmailParts, RetryPolicy, ValidateError, Validator, VerificationOutcome, split_email,
};
