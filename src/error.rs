//! Error types for session management, command execution and configuration.
//!
//! The taxonomy follows the three failure domains of the poller: connection
//! establishment ([`ConnectError`]), command execution on a live session
//! ([`ExecError`]) and startup configuration ([`ConfigError`]).

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while dialing, authenticating or negotiating a session.
///
/// A `ConnectError` is fatal to the current attempt only. The session manager
/// reports it to the caller that triggered the dial and recovers connectivity
/// in the background; it never terminates the process.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// The dial did not complete within the configured connect timeout.
    #[error("connect to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    /// DNS, TCP, SSH handshake or authentication failure reported by the
    /// transport stack.
    #[error("ssh connect failed: {0}")]
    Ssh(#[from] async_ssh2_tokio::Error),

    /// Channel-level protocol failure during session setup.
    #[error("ssh channel error: {0}")]
    Channel(#[from] russh::Error),

    /// Credential material could not be produced for the device.
    ///
    /// Covers unreadable key files, unparseable keys and devices with no
    /// usable auth method in the configuration.
    #[error("credential error: {0}")]
    Credentials(String),

    /// The NETCONF subsystem channel closed before the hello exchange
    /// completed.
    #[error("netconf hello exchange with {0} failed")]
    Hello(String),

    /// A cached session for this device is currently disconnected.
    ///
    /// Returned on every `acquire` while the background reconnect loop is
    /// working the device; callers skip the device for this poll cycle
    /// instead of re-dialing themselves.
    #[error("device {0} is not connected")]
    NotConnected(String),

    /// The dial was performed by a concurrent caller and failed.
    ///
    /// The session manager coalesces simultaneous dials for one device; every
    /// waiter observes the same underlying failure.
    #[error("{0}")]
    Shared(Arc<ConnectError>),
}

impl From<Arc<ConnectError>> for ConnectError {
    fn from(err: Arc<ConnectError>) -> Self {
        ConnectError::Shared(err)
    }
}

/// Errors raised by a single command on an otherwise-established session.
///
/// An `ExecError` does not by itself mark the session dead; the exception is
/// [`ExecError::Timeout`], after which the session drops its transport rather
/// than leave the channel in an ambiguous state.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The session holds no live transport.
    #[error("session is not connected")]
    NotConnected,

    /// The remote side completed the command with a non-zero status.
    #[error("command exited with status {status}: {detail}")]
    CommandFailed { status: u32, detail: String },

    /// The command did not complete within the caller's deadline.
    /// The session transport has been dropped.
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    /// The channel closed mid-command.
    #[error("channel disconnected during command")]
    Disconnected,

    /// Transport-stack failure while running the command.
    #[error("ssh exec error: {0}")]
    Ssh(#[from] async_ssh2_tokio::Error),

    /// Channel-level protocol failure while running the command.
    #[error("ssh channel error: {0}")]
    Channel(#[from] russh::Error),

    /// Command output was not valid UTF-8 where text was required.
    #[error("command output is not valid utf-8: {0}")]
    Decode(#[from] std::str::Utf8Error),
}

/// Errors raised while loading and validating the configuration.
///
/// All patterns compile at load time so a malformed regex stops startup
/// instead of surfacing lazily during a poll cycle.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML document did not parse or did not match the schema.
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The interface description extraction pattern is not a valid regex.
    #[error("invalid label pattern '{pattern}': {source}")]
    LabelPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A device host_pattern entry is not a valid regex.
    #[error("invalid host pattern '{pattern}': {source}")]
    HostPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A device entry declares neither a password nor a key file.
    #[error("device {0} has no usable auth method")]
    MissingAuth(String),
}
