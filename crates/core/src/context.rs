//! Per-request context threaded through the pipeline (spec §3, §4.6).

use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::config::ConfigSnapshot;

/// Everything a single request needs that must not change mid-flight.
///
/// Invariant: every in-flight request reads from exactly one
/// `ConfigSnapshot` (spec §3) — it is captured once at request entry and
/// never re-fetched from the live config cell.
#[derive(Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub snapshot: Arc<ConfigSnapshot>,
    deadline: Instant,
}

impl RequestContext {
    pub fn new(snapshot: Arc<ConfigSnapshot>, timeout: Duration) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            snapshot,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}
