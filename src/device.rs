//! Device identity and transport address normalization.
//!
//! Every pollable target is identified by a normalized `host[:port]` string.
//! The normalized form is the key under which the session manager caches
//! sessions and under which the label registry files interface label sets,
//! so normalization must be pure and idempotent.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::session::SecurityLevel;

/// Default SSH port appended when an address carries none.
pub const DEFAULT_PORT: u16 = 22;

/// How commands are executed on a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// One exec channel per command; command strings are CLI text.
    #[default]
    Cli,
    /// A persistent `netconf` subsystem channel; command strings are RPC
    /// envelopes framed with the `]]>]]>` end-of-message delimiter.
    Netconf,
}

/// Normalizes a host string to a dialable `host[:port]` address.
///
/// A bare IPv6 address (more than one colon) is bracketed; a default port is
/// appended only when no port is present. Exactly one colon means the input
/// already carries a port. The function is idempotent:
/// `normalize_addr(normalize_addr(x)) == normalize_addr(x)`.
pub fn normalize_addr(input: &str) -> String {
    let input = input.trim();

    if let Some(rest) = input.strip_prefix('[') {
        // Already bracketed; append the default port if none follows.
        if rest.contains("]:") {
            return input.to_string();
        }
        if rest.ends_with(']') {
            return format!("{input}:{DEFAULT_PORT}");
        }
        return input.to_string();
    }

    match input.matches(':').count() {
        0 => format!("{input}:{DEFAULT_PORT}"),
        1 => input.to_string(),
        _ => format!("[{input}]:{DEFAULT_PORT}"),
    }
}

/// Identity of one pollable device.
///
/// Carries the normalized address (the registry key) alongside the split
/// host/port used for dialing and the transport mode commands run in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    addr: String,
    host: String,
    port: u16,
    mode: TransportMode,
    security: SecurityLevel,
}

impl Device {
    /// Builds a device identity from a raw host string.
    pub fn new(input: &str, mode: TransportMode) -> Self {
        let addr = normalize_addr(input);
        let (host, port) = split_host_port(&addr);
        Self {
            addr,
            host,
            port,
            mode,
            security: SecurityLevel::default(),
        }
    }

    /// Same identity with a non-default SSH algorithm policy.
    pub fn with_security(mut self, security: SecurityLevel) -> Self {
        self.security = security;
        self
    }

    /// Normalized `host[:port]` identity string.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Host part without brackets, as passed to the dialer.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn security(&self) -> SecurityLevel {
        self.security
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.addr)
    }
}

/// Splits a normalized address into an unbracketed host and a port.
fn split_host_port(addr: &str) -> (String, u16) {
    if let Some(rest) = addr.strip_prefix('[') {
        if let Some((host, port)) = rest.split_once("]:") {
            return (host.to_string(), parse_port(port));
        }
        return (rest.trim_end_matches(']').to_string(), DEFAULT_PORT);
    }
    match addr.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), parse_port(port)),
        None => (addr.to_string(), DEFAULT_PORT),
    }
}

fn parse_port(port: &str) -> u16 {
    port.parse().unwrap_or(DEFAULT_PORT)
}
