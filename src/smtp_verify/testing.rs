//! In-memory transports and dialers for tests.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::smtp_verify::transport::{Dialer, Transport};

#[derive(Debug, Default)]
struct Shared {
    written: Mutex<Vec<u8>>,
    closes: AtomicUsize,
}

/// Observes a [`ScriptedTransport`] after it was moved away.
#[derive(Debug, Clone, Default)]
pub(crate) struct TransportProbe(Arc<Shared>);

impl TransportProbe {
    pub(crate) fn written(&self) -> String {
        let bytes = self.0.written.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.written()
            .split("\r\n")
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn closes(&self) -> usize {
        self.0.closes.load(Ordering::SeqCst)
    }
}

/// Replays canned server bytes; once exhausted, reads either hit EOF or, when
/// stalled, fail like a socket read timeout.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    input: Cursor<Vec<u8>>,
    stall: bool,
    probe: TransportProbe,
}

impl ScriptedTransport {
    pub(crate) fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut input = Vec::new();
        for reply in replies {
            input.extend_from_slice(reply.as_ref().as_bytes());
        }
        Self {
            input: Cursor::new(input),
            stall: false,
            probe: TransportProbe::default(),
        }
    }

    pub(crate) fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }

    pub(crate) fn probe(&self) -> TransportProbe {
        self.probe.clone()
    }
}

impl Read for ScriptedTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.input.read(buf)?;
        if read == 0 && self.stall {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "read timed out"));
        }
        Ok(read)
    }
}

impl Write for ScriptedTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.probe
            .0
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for ScriptedTransport {
    fn set_io_timeout(&mut self, _timeout: Option<Duration>) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) {
        self.probe.0.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// What [`FakeDialer`] does for one exchanger.
#[derive(Debug, Clone)]
pub(crate) enum Plan {
    Connect {
        delay: Duration,
        replies: Vec<String>,
        stall: bool,
    },
    Fail {
        delay: Duration,
        kind: io::ErrorKind,
    },
}

impl Plan {
    pub(crate) fn connect<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Connect {
            delay: Duration::ZERO,
            replies: replies.into_iter().map(Into::into).collect(),
            stall: false,
        }
    }

    pub(crate) fn connect_after(delay: Duration) -> Self {
        Self::Connect {
            delay,
            replies: Vec::new(),
            stall: false,
        }
    }

    pub(crate) fn stalled(self) -> Self {
        match self {
            Self::Connect { delay, replies, .. } => Self::Connect {
                delay,
                replies,
                stall: true,
            },
            other => other,
        }
    }

    pub(crate) fn refuse() -> Self {
        Self::Fail {
            delay: Duration::ZERO,
            kind: io::ErrorKind::ConnectionRefused,
        }
    }

    pub(crate) fn fail_after(delay: Duration, kind: io::ErrorKind) -> Self {
        Self::Fail { delay, kind }
    }
}

/// Dialer returning scripted transports and recording every connection.
#[derive(Debug)]
pub(crate) struct FakeDialer {
    plans: HashMap<String, Plan>,
    connect_timeout: Duration,
    dials: AtomicUsize,
    connections: Mutex<Vec<(String, TransportProbe)>>,
}

impl FakeDialer {
    pub(crate) fn new<I>(plans: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Plan)>,
    {
        Self {
            plans: plans
                .into_iter()
                .map(|(exchange, plan)| (exchange.to_string(), plan))
                .collect(),
            connect_timeout: Duration::from_millis(500),
            dials: AtomicUsize::new(0),
            connections: Mutex::new(Vec::new()),
        }
    }

    /// A dialer that knows no exchanger; any dial is refused.
    pub(crate) fn empty() -> Self {
        Self::new(Vec::<(&'static str, Plan)>::new())
    }

    pub(crate) fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub(crate) fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    pub(crate) fn connections(&self) -> Vec<(String, TransportProbe)> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Waits until `expected` connections were opened and every one of them
    /// except `keep` was closed.
    pub(crate) fn wait_for_closes(&self, keep: &str, expected: usize, within: Duration) -> bool {
        let deadline = Instant::now() + within;
        loop {
            let connections = self.connections();
            let done = connections.len() >= expected
                && connections
                    .iter()
                    .filter(|(exchange, _)| exchange != keep)
                    .all(|(_, probe)| probe.closes() >= 1);
            if done {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Dialer for FakeDialer {
    type Conn = ScriptedTransport;

    fn dial(&self, exchange: &str) -> io::Result<ScriptedTransport> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        let plan = self.plans.get(exchange).cloned().unwrap_or_else(Plan::refuse);
        match plan {
            Plan::Fail { delay, kind } => {
                thread::sleep(delay);
                Err(io::Error::new(kind, format!("dial {exchange} failed")))
            }
            Plan::Connect {
                delay,
                replies,
                stall,
            } => {
                thread::sleep(delay);
                let mut transport = ScriptedTransport::new(replies);
                if stall {
                    transport = transport.stalled();
                }
                self.connections
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((exchange.to_string(), transport.probe()));
                Ok(transport)
            }
        }
    }

    fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}
