//! # netgauge - Network Device Metrics Poller
//!
//! `netgauge` polls network devices over authenticated SSH sessions and
//! exposes normalized, labeled measurements to a Prometheus-style metrics
//! consumer. It manages long-lived connections to many independent devices
//! (pooling, liveness checks, transparent background reconnection) and
//! derives a stable, process-wide metric label schema from free-text
//! interface descriptions that differ per device and change at runtime.
//!
//! ## Features
//!
//! - **Session Pooling**: one cached, authenticated connection per device,
//!   created on first use and reused across poll cycles
//! - **Background Recovery**: dead sessions reconnect on a fixed interval
//!   without caller involvement; callers skip the device until it is back
//! - **CLI and NETCONF Transports**: per-command exec channels or one
//!   persistent `netconf` subsystem channel with RFC 4742 framing
//! - **Dynamic Labels**: `[tag]` / `[name=value]` markers in interface
//!   descriptions become metric labels with consistent arity fleet-wide
//! - **Maximum Compatibility**: selectable SSH algorithm profiles reach
//!   legacy network gear
//! - **Async/Await**: built on Tokio; unreachable devices never block
//!   polling of the rest of the fleet
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use netgauge::collectors::{CollectContext, Collector, DescriptionCollector};
//! use netgauge::config::Config;
//! use netgauge::session::SessionManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::from_yaml(
//!         r#"
//! devices:
//!   - host: edge1.example.net
//!     username: metrics
//!     password: secret
//! "#,
//!     )?);
//!
//!     let manager = SessionManager::new(config.clone(), config.session_settings());
//!     let labels = config.label_registry();
//!     let descriptions = DescriptionCollector::new();
//!
//!     for device in config.targets() {
//!         // An unreachable device is skipped for this cycle; the manager
//!         // keeps redialing it in the background.
//!         let session = match manager.acquire(&device).await {
//!             Ok(session) => session,
//!             Err(err) => {
//!                 eprintln!("{device}: {err}");
//!                 continue;
//!             }
//!         };
//!         let ctx = CollectContext {
//!             session: &session,
//!             labels: &labels,
//!         };
//!         descriptions.collect(&ctx).await?;
//!     }
//!
//!     println!("known labels: {:?}", labels.label_names());
//!     manager.close_all().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`session::SessionManager`] - device registry with single-flight
//!   dialing and per-device reconnect loops
//! - [`session::Session`] - one authenticated connection to one device
//! - [`labels::LabelRegistry`] - append-only dynamic label schema
//! - [`collectors`] - feature collectors turning command output into
//!   metric samples
//! - [`config::Config`] - validated YAML settings, also the process's
//!   credential source

pub mod auth;
pub mod collectors;
pub mod config;
pub mod device;
pub mod error;
pub mod labels;
pub mod session;
