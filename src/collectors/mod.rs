//! Feature collectors: translate one command's output into metric samples.
//!
//! Each collector owns its metric descriptors, issues its command through a
//! pooled [`Session`](crate::session::Session) and parses the payload
//! itself. The session layer only transports bytes; the label registry only
//! stores schema. Everything protocol-shaped lives here.
//!
//! A collector failure is scoped to one device and one poll cycle: the error
//! propagates to the polling driver, which logs it and moves on. Collectors
//! never retry; the session manager restores connectivity in the background
//! and the next cycle picks the device back up.

use crate::error::ExecError;
use crate::labels::LabelRegistry;
use crate::session::Session;

mod descriptions;
mod interfaces;

pub use descriptions::{DescriptionCollector, InterfaceDescription, SHOW_DESCRIPTIONS, parse_description_table};
pub use interfaces::{InterfaceCollector, InterfaceMetrics};

/// Everything a collector needs for one device poll.
pub struct CollectContext<'a> {
    pub session: &'a Session,
    pub labels: &'a LabelRegistry,
}

/// A feature collector run against each enabled device every poll cycle.
///
/// Implementations are `Send + Sync` so the polling driver can fan out over
/// devices concurrently.
#[allow(async_fn_in_trait)]
pub trait Collector: Send + Sync {
    /// Name used for logging and feature toggles (e.g. `"interfaces"`).
    fn name(&self) -> &'static str;

    /// Polls one device and updates this collector's metrics.
    async fn collect(&self, ctx: &CollectContext<'_>) -> Result<(), ExecError>;
}
