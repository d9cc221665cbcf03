//! Session lifecycle management for network devices.
//!
//! This module owns the long-lived authenticated connections the poller runs
//! commands through. A [`Session`] is one transport to one device; the
//! [`SessionManager`] is the process-wide registry that creates sessions on
//! first use, reuses them across poll cycles, and drives background
//! reconnection when a device goes away.
//!
//! # Main Components
//!
//! - [`SessionManager`] - device registry with single-flight dialing and
//!   per-device reconnect loops
//! - [`Session`] - one connection, CLI exec or persistent NETCONF channel
//! - [`SecurityOptions`] - SSH algorithm/host-key policy profiles
//! - [`SessionSettings`] - connect/reconnect/keepalive timeouts

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_ssh2_tokio::Config;
use async_ssh2_tokio::client::Client;
use log::{debug, warn};
use moka::future::Cache;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::auth::{CredentialSource, Credentials};
use crate::device::{Device, TransportMode};
use crate::error::{ConnectError, ExecError};

pub use client::Session;
pub use manager::SessionManager;
pub use security::{SecurityLevel, SecurityOptions};

/// Timeouts governing session establishment and health checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Bound on one dial attempt, so a caller never blocks long on a dead
    /// device.
    pub connect_timeout: Duration,

    /// Delay between reconnection attempts for a dead session. Retries
    /// continue at this fixed interval until the device comes back or the
    /// process shuts down.
    pub reconnect_interval: Duration,

    /// Bound on the liveness probe before a cached session is declared dead.
    pub keepalive_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            reconnect_interval: Duration::from_secs(30),
            keepalive_timeout: Duration::from_secs(20),
        }
    }
}

mod client;
mod manager;
mod security;
