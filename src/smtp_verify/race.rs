use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SendError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::mx::MxRecord;
use crate::smtp_verify::error::{DialFailure, SmtpCheckError};
use crate::smtp_verify::transport::{Dialer, Transport};

/// The connection that won the race, bound to the exchanger that produced it.
#[derive(Debug)]
pub struct Won<C> {
    pub conn: C,
    pub record: MxRecord,
}

enum Report<C> {
    Won(Won<C>),
    Lost,
    Failed(DialFailure),
}

/// Dials every exchanger on its own thread and returns the first connection.
///
/// Exactly one connection is returned; every other successful dial is closed
/// by the thread that lost. Every thread reports once, so the caller knows
/// when all attempts are exhausted, and waits at most
/// `connect_timeout + grace` in any case.
pub(crate) fn race<D: Dialer>(
    dialer: Arc<D>,
    domain: &str,
    records: &[MxRecord],
    grace: Duration,
) -> Result<Won<D::Conn>, SmtpCheckError> {
    let (tx, rx) = mpsc::channel();
    let decided = Arc::new(Mutex::new(false));
    let mut pending = vec![false; records.len()];
    let mut failures = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let task = DialTask {
            index,
            record: record.clone(),
            dialer: Arc::clone(&dialer),
            decided: Arc::clone(&decided),
            tx: tx.clone(),
        };
        let spawned = thread::Builder::new()
            .name(format!("mx-dial-{}", record.exchange))
            .spawn(move || task.run());
        match spawned {
            Ok(_) => pending[index] = true,
            Err(err) => failures.push(DialFailure::from_io(&record.exchange, &err)),
        }
    }
    drop(tx);

    let deadline = Instant::now() + dialer.connect_timeout() + grace;
    while pending.iter().any(|waiting| *waiting) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((_, Report::Won(won))) => {
                info!(
                    target: "mailprobe::race",
                    domain,
                    exchange = %won.record.exchange,
                    "connection race won"
                );
                return Ok(won);
            }
            Ok((index, Report::Lost)) => pending[index] = false,
            Ok((index, Report::Failed(failure))) => {
                pending[index] = false;
                failures.push(failure);
            }
            Err(RecvTimeoutError::Timeout) => {
                for (index, waiting) in pending.iter_mut().enumerate() {
                    if *waiting {
                        *waiting = false;
                        failures.push(DialFailure::no_answer(&records[index].exchange));
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    abandon(&decided, &rx);
    Err(SmtpCheckError::AllExchangersUnreachable {
        domain: domain.to_string(),
        failures,
    })
}

struct DialTask<D: Dialer> {
    index: usize,
    record: MxRecord,
    dialer: Arc<D>,
    decided: Arc<Mutex<bool>>,
    tx: Sender<(usize, Report<D::Conn>)>,
}

impl<D: Dialer> DialTask<D> {
    fn run(self) {
        let exchange = self.record.exchange.as_str();
        match self.dialer.dial(exchange) {
            Err(err) => {
                debug!(target: "mailprobe::race", exchange, error = %err, "dial failed");
                self.report(Report::Failed(DialFailure::from_io(exchange, &err)));
            }
            Ok(mut conn) => {
                let mut decided = self.decided.lock().unwrap_or_else(PoisonError::into_inner);
                if *decided {
                    drop(decided);
                    debug!(target: "mailprobe::race", exchange, "lost the race, closing");
                    conn.close();
                    self.report(Report::Lost);
                } else {
                    *decided = true;
                    // sent under the lock, so a caller that gives up drains it
                    self.report(Report::Won(Won {
                        conn,
                        record: self.record.clone(),
                    }));
                }
            }
        }
    }

    fn report(&self, report: Report<D::Conn>) {
        // the caller stops listening once it has a winner or gave up
        if let Err(SendError((_, Report::Won(mut won)))) = self.tx.send((self.index, report)) {
            debug!(
                target: "mailprobe::race",
                exchange = %won.record.exchange,
                "winner arrived too late, closing"
            );
            won.conn.close();
        }
    }
}

/// Marks the race decided and closes any winner that reported after the
/// caller stopped waiting.
fn abandon<C: Transport>(decided: &Mutex<bool>, rx: &Receiver<(usize, Report<C>)>) {
    let _decided = {
        let mut guard = decided.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = true;
        guard
    };
    for (_, report) in rx.try_iter() {
        if let Report::Won(mut won) = report {
            debug!(
                target: "mailprobe::race",
                exchange = %won.record.exchange,
                "winner arrived after the deadline, closing"
            );
            won.conn.close();
        }
    }
}
