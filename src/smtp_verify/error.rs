use std::fmt;
use std::io;

use thiserror::Error;

use crate::mx::Error as MxError;
use crate::smtp_verify::types::{SmtpReply, SmtpResult, Stage};

/// Why a single exchanger could not be dialed.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialFailure {
    pub exchange: String,
    pub timed_out: bool,
    pub reason: String,
}

impl DialFailure {
    pub(crate) fn from_io(exchange: impl Into<String>, err: &io::Error) -> Self {
        Self {
            exchange: exchange.into(),
            timed_out: is_timeout(err),
            reason: err.to_string(),
        }
    }

    pub(crate) fn no_answer(exchange: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            timed_out: true,
            reason: "no answer before the connect deadline".to_string(),
        }
    }
}

impl fmt::Display for DialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.exchange, self.reason)
    }
}

/// Failures of [`Verifier::check_smtp`](crate::Verifier).
///
/// Errors raised after a connection was won carry the flags already
/// established, see [`SmtpCheckError::partial`].
#[derive(Debug, Error)]
pub enum SmtpCheckError {
    #[error("no MX records found for {domain}")]
    NoMailExchanger {
        domain: String,
        #[source]
        source: Option<MxError>,
    },
    #[error("all {} mail exchangers for {domain} unreachable: {}", failures.len(), join(failures))]
    AllExchangersUnreachable {
        domain: String,
        failures: Vec<DialFailure>,
    },
    #[error("{stage} rejected by {host}: {reply}")]
    Handshake {
        host: String,
        stage: Stage,
        reply: SmtpReply,
        partial: SmtpResult,
    },
    #[error("{stage} timed out on {host}")]
    Timeout {
        host: String,
        stage: Stage,
        partial: SmtpResult,
    },
    #[error("{stage} failed on {host}: {source}")]
    Io {
        host: String,
        stage: Stage,
        #[source]
        source: io::Error,
        partial: SmtpResult,
    },
    #[error("invalid proxy URI {uri:?}: {reason}")]
    InvalidProxy { uri: String, reason: String },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: io::Error,
    },
}

impl SmtpCheckError {
    pub(crate) fn no_mail_exchanger(domain: impl Into<String>, source: Option<MxError>) -> Self {
        Self::NoMailExchanger {
            domain: domain.into(),
            source,
        }
    }

    pub(crate) fn invalid_proxy(uri: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::InvalidProxy {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn resolver_init(source: io::Error) -> Self {
        Self::ResolverInit { source }
    }

    /// Maps a transport error to `Timeout` or `Io` depending on its kind.
    pub(crate) fn transport(
        host: impl Into<String>,
        stage: Stage,
        source: io::Error,
        partial: SmtpResult,
    ) -> Self {
        let host = host.into();
        if is_timeout(&source) {
            Self::Timeout {
                host,
                stage,
                partial,
            }
        } else {
            Self::Io {
                host,
                stage,
                source,
                partial,
            }
        }
    }

    /// Flags established before the dialogue failed, if a connection was won.
    pub fn partial(&self) -> Option<&SmtpResult> {
        match self {
            Self::Handshake { partial, .. }
            | Self::Timeout { partial, .. }
            | Self::Io { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// True when the server never answered, as opposed to answering "no".
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::AllExchangersUnreachable { failures, .. } => {
                !failures.is_empty() && failures.iter().all(|f| f.timed_out)
            }
            _ => false,
        }
    }
}

pub(crate) fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

fn join(failures: &[DialFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
