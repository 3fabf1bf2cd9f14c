use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::smtp_verify::transport::Transport;
use crate::smtp_verify::types::SmtpReply;

/// SMTP command/reply codec over a won connection.
///
/// The operation timeout is an absolute deadline: every read and write is
/// bounded by the time left. The transport is closed when the session is
/// dropped, whatever path the dialogue took.
pub(crate) struct SmtpSession<T: Transport> {
    conn: T,
    host: String,
    buffer: Vec<u8>,
    deadline: Instant,
}

impl<T: Transport> SmtpSession<T> {
    pub(crate) fn new(conn: T, host: impl Into<String>, operation_timeout: Duration) -> Self {
        Self {
            conn,
            host: host.into(),
            buffer: Vec::new(),
            deadline: Instant::now() + operation_timeout,
        }
    }

    pub(crate) fn host(&self) -> &str {
        &self.host
    }

    pub(crate) fn command(&mut self, command: &str) -> io::Result<SmtpReply> {
        if command.contains(['\r', '\n']) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "SMTP command contains a line break",
            ));
        }
        debug!(target: "mailprobe::smtp", host = %self.host, "C: {command}");
        self.arm()?;
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.conn.write_all(&line)?;
        self.conn.flush()?;
        self.read_reply()
    }

    pub(crate) fn read_reply(&mut self) -> io::Result<SmtpReply> {
        let mut code = None;
        let mut message_lines = Vec::new();
        loop {
            let raw = self.read_line()?;
            let code_part = raw
                .get(..3)
                .ok_or_else(|| invalid_data(format!("invalid SMTP reply: '{raw}'")))?;
            let parsed_code = code_part
                .parse::<u16>()
                .map_err(|_| invalid_data(format!("invalid SMTP status code: '{code_part}'")))?;
            match code {
                Some(existing) if existing != parsed_code => {
                    return Err(invalid_data(format!(
                        "inconsistent SMTP reply codes: {existing} vs {parsed_code}"
                    )));
                }
                Some(_) => {}
                None => code = Some(parsed_code),
            }
            let continuation = raw.as_bytes().get(3).copied() == Some(b'-');
            message_lines.push(raw.get(4..).unwrap_or_default().to_string());
            if !continuation {
                break;
            }
        }
        let reply = SmtpReply {
            code: code.ok_or_else(|| invalid_data("SMTP reply missing status code"))?,
            message: message_lines.join("\n"),
        };
        debug!(target: "mailprobe::smtp", host = %self.host, "S: {reply}");
        Ok(reply)
    }

    fn read_line(&mut self) -> io::Result<String> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line = self.buffer.drain(..=pos).collect::<Vec<_>>();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return String::from_utf8(line)
                    .map_err(|err| invalid_data(format!("utf8 error: {err}")));
            }

            self.arm()?;
            let mut buf = [0u8; 512];
            let read = self.conn.read(&mut buf)?;
            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed while reading reply",
                ));
            }
            self.buffer.extend_from_slice(&buf[..read]);
        }
    }

    fn arm(&mut self) -> io::Result<()> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "operation deadline exceeded",
            ));
        }
        self.conn.set_io_timeout(Some(remaining))
    }
}

impl<T: Transport> Drop for SmtpSession<T> {
    fn drop(&mut self) {
        self.conn.close();
    }
}

fn invalid_data(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}
