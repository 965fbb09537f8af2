/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Gateway and session configuration.
//!
//! Configuration is supplied from outside (JSON or code) once, at gateway
//! construction. Durations are written in JSON as seconds (fractions allowed).

use fixgate_core::error::FixError;
use fixgate_core::types::CompId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shortest accepted per-write deadline.
pub const MIN_WRITE_TIMEOUT: Duration = Duration::from_secs(2);
/// Longest accepted per-write deadline.
pub const MAX_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

const REDACTED: &str = "***";

/// What to do with an inbound message whose MsgSeqNum is below the expected
/// value and that does not carry PossDupFlag=Y.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TooLowPolicy {
    /// Log the violation, skip the message, keep the session up.
    #[default]
    Log,
    /// Log the violation and disconnect the session.
    Disconnect,
}

/// Proxy through which a session tunnels its connection.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy host name or IP.
    pub host: String,
    /// Proxy port.
    pub port: u16,
    /// Optional user name for SOCKS5 user/pass and HTTP Basic auth.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional password.
    #[serde(default)]
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Creates an unauthenticated proxy entry.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    /// Sets proxy credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Returns the credentials when both halves are present.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.username.as_deref()?, self.password.as_deref()?))
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .finish()
    }
}

/// Configuration for one counterparty session.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Stable identifier; also names the sequence file.
    pub id: String,
    /// Human-readable counterparty name.
    #[serde(default)]
    pub name: String,
    /// Counterparty host or IP.
    pub host: String,
    /// Counterparty port.
    pub port: u16,
    /// Whether to wrap the stream in TLS.
    #[serde(default)]
    pub tls: bool,
    /// FIX version BeginString.
    #[serde(default = "default_begin_string")]
    pub begin_string: String,
    /// SenderCompID (tag 49).
    pub sender_comp_id: CompId,
    /// TargetCompID (tag 56).
    pub target_comp_id: CompId,
    /// Username sent in Logon (tag 553).
    #[serde(default)]
    pub username: Option<String>,
    /// Password sent in Logon (tag 554).
    #[serde(default)]
    pub password: Option<String>,
    /// Account placed on orders and position/trade requests (tag 1).
    #[serde(default)]
    pub trading_account: Option<String>,
    /// Optional proxy to tunnel through.
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    /// Heartbeat interval, also advertised as HeartBtInt.
    #[serde(default = "default_heartbeat_interval", with = "duration_secs")]
    pub heartbeat_interval: Duration,
    /// Deadline for the Logon reply.
    #[serde(default = "default_logon_timeout", with = "duration_secs")]
    pub logon_timeout: Duration,
    /// Per-write deadline, clamped to 2..=5 seconds when used.
    #[serde(default = "default_write_timeout", with = "duration_secs")]
    pub write_timeout: Duration,
    /// Deadline for each connection stage (dial, tunnel, TLS).
    #[serde(default = "default_connect_timeout", with = "duration_secs")]
    pub connect_timeout: Duration,
    /// Send ResetSeqNumFlag=Y and restart both counters at Logon.
    #[serde(default)]
    pub reset_seq_num_on_logon: bool,
    /// Handling of too-low sequence numbers without PossDupFlag.
    #[serde(default)]
    pub sequence_too_low: TooLowPolicy,
    /// Number of outbound frames retained for resends.
    #[serde(default = "default_message_store_capacity")]
    pub message_store_capacity: usize,
    /// SO_RCVBUF requested before connecting.
    #[serde(default = "default_socket_buffer")]
    pub recv_buffer_size: u32,
    /// SO_SNDBUF requested before connecting.
    #[serde(default = "default_socket_buffer")]
    pub send_buffer_size: u32,
}

fn default_begin_string() -> String {
    "FIX.4.4".to_string()
}

fn default_heartbeat_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_logon_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_write_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_message_store_capacity() -> usize {
    50_000
}

fn default_socket_buffer() -> u32 {
    256 * 1024
}

impl SessionConfig {
    /// Creates a configuration with defaults for everything but identity,
    /// endpoint and CompIDs.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        sender_comp_id: CompId,
        target_comp_id: CompId,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            host: host.into(),
            port,
            tls: false,
            begin_string: default_begin_string(),
            sender_comp_id,
            target_comp_id,
            username: None,
            password: None,
            trading_account: None,
            proxy: None,
            heartbeat_interval: default_heartbeat_interval(),
            logon_timeout: default_logon_timeout(),
            write_timeout: default_write_timeout(),
            connect_timeout: default_connect_timeout(),
            reset_seq_num_on_logon: false,
            sequence_too_low: TooLowPolicy::default(),
            message_store_capacity: default_message_store_capacity(),
            recv_buffer_size: default_socket_buffer(),
            send_buffer_size: default_socket_buffer(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enables or disables TLS.
    #[must_use]
    pub const fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Sets Logon credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the trading account.
    #[must_use]
    pub fn with_trading_account(mut self, account: impl Into<String>) -> Self {
        self.trading_account = Some(account.into());
        self
    }

    /// Routes the connection through a proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the logon timeout.
    #[must_use]
    pub fn with_logon_timeout(mut self, timeout: Duration) -> Self {
        self.logon_timeout = timeout;
        self
    }

    /// Sets the per-stage connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to reset sequence numbers on logon.
    #[must_use]
    pub const fn with_reset_on_logon(mut self, reset: bool) -> Self {
        self.reset_seq_num_on_logon = reset;
        self
    }

    /// Sets the too-low sequence policy.
    #[must_use]
    pub const fn with_too_low_policy(mut self, policy: TooLowPolicy) -> Self {
        self.sequence_too_low = policy;
        self
    }

    /// Sets how many outbound frames are retained for resends.
    #[must_use]
    pub const fn with_message_store_capacity(mut self, capacity: usize) -> Self {
        self.message_store_capacity = capacity;
        self
    }

    /// Returns the write deadline actually applied.
    #[must_use]
    pub fn effective_write_timeout(&self) -> Duration {
        self.write_timeout.clamp(MIN_WRITE_TIMEOUT, MAX_WRITE_TIMEOUT)
    }

    /// Returns the heartbeat interval in whole seconds, as sent in HeartBtInt.
    #[must_use]
    pub fn heartbeat_interval_secs(&self) -> u64 {
        self.heartbeat_interval.as_secs().max(1)
    }

    /// Checks the configuration for values the gateway cannot work with.
    ///
    /// # Errors
    /// `FixError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<(), FixError> {
        let fail = |what: &str| Err(FixError::Config(format!("session '{}': {what}", self.id)));
        if self.id.trim().is_empty() {
            return Err(FixError::Config("session id must not be empty".to_string()));
        }
        if self.id.contains(['/', '\\']) || self.id.contains("..") {
            return fail("id must not contain path separators or '..'");
        }
        if self.host.trim().is_empty() {
            return fail("host must not be empty");
        }
        if self.port == 0 {
            return fail("port must not be zero");
        }
        if self.begin_string.is_empty() {
            return fail("begin_string must not be empty");
        }
        if self.heartbeat_interval.is_zero() {
            return fail("heartbeat_interval must be positive");
        }
        if self.logon_timeout.is_zero() || self.connect_timeout.is_zero() {
            return fail("timeouts must be positive");
        }
        if let Some(proxy) = &self.proxy
            && (proxy.host.trim().is_empty() || proxy.port == 0)
        {
            return fail("proxy needs a host and a non-zero port");
        }
        Ok(())
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("begin_string", &self.begin_string)
            .field("sender_comp_id", &self.sender_comp_id)
            .field("target_comp_id", &self.target_comp_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("trading_account", &self.trading_account)
            .field("proxy", &self.proxy)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("reset_seq_num_on_logon", &self.reset_seq_num_on_logon)
            .field("sequence_too_low", &self.sequence_too_low)
            .finish_non_exhaustive()
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Counterparty sessions, one entry each.
    pub sessions: Vec<SessionConfig>,
    /// Directory holding the per-session sequence files.
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    /// Capacity of each outbound event queue.
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("fix_store")
}

fn default_event_queue_capacity() -> usize {
    10_000
}

impl GatewayConfig {
    /// Creates a configuration with the given sessions and default settings.
    #[must_use]
    pub fn new(sessions: Vec<SessionConfig>) -> Self {
        Self {
            sessions,
            store_dir: default_store_dir(),
            event_queue_capacity: default_event_queue_capacity(),
        }
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    /// `FixError::Config` on syntax errors or invalid values.
    pub fn from_json_str(json: &str) -> Result<Self, FixError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| FixError::Config(format!("invalid gateway config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    ///
    /// # Errors
    /// `FixError::Io` if the file cannot be read, `FixError::Config` otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Validates every session and checks that ids are unique.
    ///
    /// # Errors
    /// `FixError::Config` describing the first problem found.
    pub fn validate(&self) -> Result<(), FixError> {
        if self.event_queue_capacity == 0 {
            return Err(FixError::Config(
                "event_queue_capacity must be positive".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for session in &self.sessions {
            session.validate()?;
            if !seen.insert(session.id.as_str()) {
                return Err(FixError::Config(format!(
                    "duplicate session id '{}'",
                    session.id
                )));
            }
        }
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}
