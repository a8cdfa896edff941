//! Request pacing within a site
//!
//! Consecutive probes against the same site are separated by a fixed delay.
//! No delay precedes the first probe, so nothing is spent after the last one.
//! A pacer holding a shutdown flag also refuses new turns once it is raised.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Inserts a fixed pause between consecutive probes of one site
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: Duration,
    probes_started: u32,
    shutdown: Option<Arc<AtomicBool>>,
}

impl Pacer {
    /// Creates a pacer for a new site
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            probes_started: 0,
            shutdown: None,
        }
    }

    /// Stops handing out turns once `flag` is set
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    fn stopping(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Waits until the next probe may start
    ///
    /// Returns `false` when shutdown was requested, before or during the
    /// pause; the caller must not start another request.
    pub async fn wait_turn(&mut self) -> bool {
        if self.stopping() {
            return false;
        }
        if self.probes_started > 0 && !self.delay.is_zero() {
            tracing::trace!("Pacing next probe by {:?}", self.delay);
            tokio::time::sleep(self.delay).await;
            if self.stopping() {
                return false;
            }
        }
        self.probes_started += 1;
        true
    }

    /// Number of probes started through this pacer
    pub fn probes_started(&self) -> u32 {
        self.probes_started
    }
}
