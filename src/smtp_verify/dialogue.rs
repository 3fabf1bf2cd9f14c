use tracing::info;

use crate::smtp_verify::error::SmtpCheckError;
use crate::smtp_verify::options::ProbeConfig;
use crate::smtp_verify::race::Won;
use crate::smtp_verify::session::SmtpSession;
use crate::smtp_verify::transport::Transport;
use crate::smtp_verify::types::{SmtpReply, SmtpResult, Stage};
use crate::smtp_verify::util::{Refusal, classify_refusal, random_email};

/// Catch-all classification of the exchanger, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CatchAllState {
    Unknown,
    /// Sender accepted; assumed to accept anything until a random recipient
    /// is refused.
    Provisional,
    Confirmed,
    NotCatchAll,
}

impl CatchAllState {
    fn sender_accepted(self) -> Self {
        match self {
            Self::Unknown => Self::Provisional,
            other => other,
        }
    }

    fn random_recipient(self, accepted: bool) -> Self {
        match (self, accepted) {
            (Self::Provisional, true) => Self::Confirmed,
            (Self::Provisional, false) => Self::NotCatchAll,
            (other, _) => other,
        }
    }

    /// Only a confirmed catch-all is reported; an unverified provisional
    /// state does not mask the mailbox probe.
    fn is_catch_all(self) -> bool {
        self == Self::Confirmed
    }
}

/// What a dialogue is asked to find out.
pub(crate) struct Probe<'a> {
    pub config: &'a ProbeConfig,
    pub domain: &'a str,
    pub username: &'a str,
}

struct Dialogue<T: Transport> {
    session: SmtpSession<T>,
    host_exists: bool,
    catch_all: CatchAllState,
    deliverable: bool,
    disabled: bool,
    full_inbox: bool,
}

impl<T: Transport> Dialogue<T> {
    fn snapshot(&self) -> SmtpResult {
        SmtpResult {
            host_exists: self.host_exists,
            catch_all: self.catch_all.is_catch_all(),
            deliverable: self.deliverable,
            disabled: self.disabled,
            full_inbox: self.full_inbox,
        }
    }

    /// Sends `command` (or just reads, for the greeting) and returns the reply.
    fn exchange(&mut self, stage: Stage, command: Option<&str>) -> Result<SmtpReply, SmtpCheckError> {
        let outcome = match command {
            Some(command) => self.session.command(command),
            None => self.session.read_reply(),
        };
        outcome.map_err(|err| {
            SmtpCheckError::transport(self.session.host(), stage, err, self.snapshot())
        })
    }

    fn expect_positive(&mut self, stage: Stage, command: Option<&str>) -> Result<(), SmtpCheckError> {
        let reply = self.exchange(stage, command)?;
        if reply.is_positive_completion() {
            return Ok(());
        }
        Err(SmtpCheckError::Handshake {
            host: self.session.host().to_string(),
            stage,
            reply,
            partial: self.snapshot(),
        })
    }

    fn record_recipient(&mut self, reply: &SmtpReply) {
        if reply.is_positive_completion() {
            self.deliverable = true;
            return;
        }
        match classify_refusal(reply) {
            Refusal::FullInbox => self.full_inbox = true,
            Refusal::Disabled => self.disabled = true,
            Refusal::Other => {}
        }
    }
}

/// Runs greeting, `HELO`, `MAIL FROM` and the recipient probes on the won
/// connection. The connection is closed when this returns, on every path.
pub(crate) fn run<T: Transport>(won: Won<T>, probe: &Probe<'_>) -> Result<SmtpResult, SmtpCheckError> {
    let Won { conn, record } = won;
    let config = probe.config;
    let mut dialogue = Dialogue {
        session: SmtpSession::new(conn, record.exchange, config.operation_timeout),
        host_exists: false,
        catch_all: CatchAllState::Unknown,
        deliverable: false,
        disabled: false,
        full_inbox: false,
    };

    dialogue.expect_positive(Stage::Greeting, None)?;
    dialogue.expect_positive(Stage::Helo, Some(&format!("HELO {}", config.helo_name())))?;
    dialogue.expect_positive(
        Stage::MailFrom,
        Some(&format!("MAIL FROM:<{}>", config.from_email)),
    )?;

    dialogue.host_exists = true;
    dialogue.catch_all = dialogue.catch_all.sender_accepted();

    if config.catch_all_check_enabled {
        let command = format!("RCPT TO:<{}>", random_email(probe.domain));
        let reply = dialogue.exchange(Stage::CatchAllProbe, Some(&command))?;
        dialogue.catch_all = dialogue
            .catch_all
            .random_recipient(reply.is_positive_completion());
    }

    if !probe.username.is_empty() && !dialogue.catch_all.is_catch_all() {
        let command = format!("RCPT TO:<{}@{}>", probe.username, probe.domain);
        let reply = dialogue.exchange(Stage::RecipientProbe, Some(&command))?;
        dialogue.record_recipient(&reply);
    }

    let result = dialogue.snapshot();
    info!(
        target: "mailprobe::smtp",
        host = %dialogue.session.host(),
        domain = probe.domain,
        catch_all = result.catch_all,
        deliverable = result.deliverable,
        "SMTP probe finished"
    );
    Ok(result)
}
