use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::mx::resolver::{self, LookupMx};
use crate::mx::{MxRecord, MxStatus};
use crate::smtp_verify::dialogue::{self, Probe};
use crate::smtp_verify::error::SmtpCheckError;
use crate::smtp_verify::options::ProbeConfig;
use crate::smtp_verify::race;
use crate::smtp_verify::transport::{Dialer, TcpDialer};
use crate::smtp_verify::types::SmtpResult;

/// Slack on top of the connect timeout before the racer stops waiting.
const RACE_GRACE: Duration = Duration::from_millis(500);

/// Something that can run the SMTP check for a `username@domain` pair.
///
/// `Ok(None)` means no check was requested, which is distinct from a failed
/// check.
pub trait SmtpCheck {
    fn check_smtp(&self, domain: &str, username: &str)
    -> Result<Option<SmtpResult>, SmtpCheckError>;
}

impl<C: SmtpCheck + ?Sized> SmtpCheck for &C {
    fn check_smtp(
        &self,
        domain: &str,
        username: &str,
    ) -> Result<Option<SmtpResult>, SmtpCheckError> {
        (**self).check_smtp(domain, username)
    }
}

/// Resolves, races and probes the mail exchangers of a domain.
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    config: ProbeConfig,
}

impl Verifier {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub(crate) fn check_with<R, D>(
        &self,
        resolver_impl: &R,
        dialer: Arc<D>,
        domain: &str,
        username: &str,
    ) -> Result<Option<SmtpResult>, SmtpCheckError>
    where
        R: LookupMx,
        D: Dialer,
    {
        if !self.config.smtp_check_enabled {
            return Ok(None);
        }

        let ascii_domain = resolver::normalize_domain(domain)
            .map_err(|err| SmtpCheckError::no_mail_exchanger(domain, Some(err)))?;
        let records = resolve_exchangers(resolver_impl, &ascii_domain)?;
        debug!(
            target: "mailprobe::verifier",
            domain = %ascii_domain,
            exchangers = records.len(),
            "racing mail exchangers"
        );

        let won = race::race(dialer, &ascii_domain, &records, RACE_GRACE)?;
        let result = dialogue::run(
            won,
            &Probe {
                config: &self.config,
                domain: &ascii_domain,
                username: username.trim(),
            },
        )?;
        Ok(Some(result))
    }
}

impl SmtpCheck for Verifier {
    fn check_smtp(
        &self,
        domain: &str,
        username: &str,
    ) -> Result<Option<SmtpResult>, SmtpCheckError> {
        if !self.config.smtp_check_enabled {
            return Ok(None);
        }
        let dialer = TcpDialer::from_config(&self.config)?;
        let resolver_impl = resolver::build_resolver(Some(self.config.connect_timeout))
            .map_err(SmtpCheckError::resolver_init)?;
        self.check_with(&resolver_impl, Arc::new(dialer), domain, username)
    }
}

fn resolve_exchangers<R: LookupMx>(
    resolver_impl: &R,
    ascii_domain: &str,
) -> Result<Vec<MxRecord>, SmtpCheckError> {
    match resolver::resolve_with(resolver_impl, ascii_domain) {
        Ok(MxStatus::Records(records)) if !records.is_empty() => Ok(records),
        Ok(_) => Err(SmtpCheckError::no_mail_exchanger(ascii_domain, None)),
        Err(err) => Err(SmtpCheckError::no_mail_exchanger(ascii_domain, Some(err))),
    }
}
