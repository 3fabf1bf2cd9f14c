use std::time::Duration;

/// Configuration for [`Verifier`](crate::Verifier).
///
/// The value is read-only during a check and can be shared by reference
/// across threads running concurrent checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub smtp_check_enabled: bool,
    pub catch_all_check_enabled: bool,
    /// `socks5://[user:pass@]host:port` or `socks4://[user@]host:port`.
    pub proxy_uri: Option<String>,
    pub connect_timeout: Duration,
    /// Deadline for the whole dialogue, armed once a connection is won.
    pub operation_timeout: Duration,
    pub helo_name: String,
    pub from_email: String,
    pub port: u16,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            smtp_check_enabled: false,
            catch_all_check_enabled: true,
            proxy_uri: None,
            connect_timeout: Duration::from_secs(10),
            operation_timeout: Duration::from_secs(10),
            helo_name: "localhost".to_string(),
            from_email: "user@example.org".to_string(),
            port: 25,
        }
    }
}

impl ProbeConfig {
    pub fn enable_smtp_check(mut self) -> Self {
        self.smtp_check_enabled = true;
        self
    }

    pub fn disable_smtp_check(mut self) -> Self {
        self.smtp_check_enabled = false;
        self
    }

    pub fn enable_catch_all_check(mut self) -> Self {
        self.catch_all_check_enabled = true;
        self
    }

    pub fn disable_catch_all_check(mut self) -> Self {
        self.catch_all_check_enabled = false;
        self
    }

    pub fn with_proxy(mut self, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        self.proxy_uri = if uri.trim().is_empty() { None } else { Some(uri) };
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_helo_name(mut self, name: impl Into<String>) -> Self {
        self.helo_name = name.into();
        self
    }

    pub fn with_from_email(mut self, email: impl Into<String>) -> Self {
        self.from_email = email.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Hostname used in `HELO`, falling back to `localhost` when blank.
    pub fn helo_name(&self) -> &str {
        let trimmed = self.helo_name.trim();
        if trimmed.is_empty() { "localhost" } else { trimmed }
    }
}
