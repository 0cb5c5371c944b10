use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::XrTarget;
use crate::error::ParseError;
use crate::event::{AppEvent, spawn_worker};
use crate::k8s::ResourceClient;
use crate::model::ResourceReference;
use crate::xr::extract;

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(7);
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(500);
pub const POLL_TIMEOUT: Duration = Duration::from_secs(10);
pub const MIN_POLL_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CyclePhase {
    Idle,
    Extracting,
    Polling,
    Merging,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TickOutcome {
    Started(u64),
    Skipped,
}

/// Tracks the one refresh cycle that may be in flight.
///
/// Completion tickets carry the id handed out by [`RefreshController::on_tick`];
/// a ticket for any other cycle, or arriving in the wrong phase, is ignored.
#[derive(Debug, Clone)]
pub struct RefreshController {
    phase: CyclePhase,
    cycle: u64,
    halted: bool,
}

impl Default for RefreshController {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshController {
    pub fn new() -> Self {
        Self {
            phase: CyclePhase::Idle,
            cycle: 0,
            halted: false,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn in_flight(&self) -> bool {
        self.phase != CyclePhase::Idle
    }

    pub fn on_tick(&mut self) -> TickOutcome {
        if self.halted || self.in_flight() {
            debug!(
                "refresh tick skipped cycle={} phase={:?}",
                self.cycle, self.phase
            );
            return TickOutcome::Skipped;
        }

        self.cycle += 1;
        self.phase = CyclePhase::Extracting;
        info!("refresh cycle {} started", self.cycle);
        TickOutcome::Started(self.cycle)
    }

    pub fn on_refs_loaded(&mut self, cycle: u64) -> bool {
        self.advance(cycle, CyclePhase::Extracting, CyclePhase::Polling)
    }

    pub fn on_extract_failed(&mut self, cycle: u64) -> bool {
        self.advance(cycle, CyclePhase::Extracting, CyclePhase::Idle)
    }

    pub fn on_status_loaded(&mut self, cycle: u64) -> bool {
        self.advance(cycle, CyclePhase::Polling, CyclePhase::Merging)
    }

    pub fn finish_merge(&mut self) {
        if self.phase == CyclePhase::Merging {
            info!("refresh cycle {} finished", self.cycle);
            self.phase = CyclePhase::Idle;
        }
    }

    pub fn halt(&mut self) {
        self.halted = true;
        self.phase = CyclePhase::Idle;
    }

    fn advance(&mut self, cycle: u64, from: CyclePhase, to: CyclePhase) -> bool {
        if self.halted || cycle != self.cycle || self.phase != from {
            debug!(
                "ignoring stale completion cycle={cycle} current={} phase={:?}",
                self.cycle, self.phase
            );
            return false;
        }
        self.phase = to;
        true
    }
}

pub fn spawn_extraction(
    client: Arc<dyn ResourceClient>,
    target: XrTarget,
    cycle: u64,
    fetch_timeout: Duration,
    tx: mpsc::UnboundedSender<AppEvent>,
) {
    spawn_worker(tx, async move {
        match load_refs(client.as_ref(), &target, fetch_timeout).await {
            Ok((namespace, refs)) => AppEvent::RefsLoaded {
                cycle,
                namespace,
                refs,
            },
            Err(error) => AppEvent::CycleFailed { cycle, error },
        }
    });
}

async fn load_refs(
    client: &dyn ResourceClient,
    target: &XrTarget,
    fetch_timeout: Duration,
) -> Result<(String, Vec<ResourceReference>), ParseError> {
    let command = target.get_command()?;
    let yaml = match timeout(fetch_timeout, client.get_xr(&command)).await {
        Ok(result) => result.map_err(|error| ParseError::Fetch(error.to_string()))?,
        Err(_) => {
            return Err(ParseError::Fetch(format!(
                "timed out after {}ms",
                fetch_timeout.as_millis()
            )));
        }
    };

    let (namespace, refs) = extract(&yaml)?;
    let namespace = if namespace.is_empty() {
        target.namespace.clone()
    } else {
        namespace
    };
    Ok((namespace, refs))
}
