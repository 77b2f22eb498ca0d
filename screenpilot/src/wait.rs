//! The condition waiter: the perception gate every action is verified
//! through.
//!
//! Verification is the only feedback channel from the driven process, so
//! "expected text never appeared" and "action failed" are treated as the
//! same event and routed through one failure funnel. Recovery is attempted
//! exactly once per exhausted wait, never skipped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::capture::VisualProbe;
use crate::errors::DriveError;
use crate::input::Actuator;
use crate::recovery::Recover;
use crate::state::RunState;
use crate::types::{normalize_text, OverlayHandle, OverlayRenderer, Region, StopFlag, TextCondition};

/// Result of a presence wait. `Found` carries the normalized probe text the
/// condition matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Found(String),
    Absent,
}

impl Presence {
    pub fn is_found(&self) -> bool {
        matches!(self, Presence::Found(_))
    }
}

const PRESENCE_ATTEMPTS: usize = 100;
const PRESENCE_INTERVAL: Duration = Duration::from_millis(200);
const ABSENCE_TIMEOUT: Duration = Duration::from_secs(10);
const ABSENCE_INTERVAL: Duration = Duration::from_millis(100);
const CLICK_SETTLE: Duration = Duration::from_millis(50);

/// Polls the visual probe until a text condition holds (or stops holding),
/// optionally actuating on success and escalating to recovery on failure.
#[derive(Clone)]
pub struct Waiter {
    probe: VisualProbe,
    actuator: Arc<dyn Actuator>,
    overlay: Option<Arc<dyn OverlayRenderer>>,
    stop: Option<StopFlag>,
    presence_attempts: usize,
    presence_interval: Duration,
    absence_timeout: Duration,
    absence_interval: Duration,
}

impl Waiter {
    pub fn new(probe: VisualProbe, actuator: Arc<dyn Actuator>) -> Self {
        Self {
            probe,
            actuator,
            overlay: None,
            stop: None,
            presence_attempts: PRESENCE_ATTEMPTS,
            presence_interval: PRESENCE_INTERVAL,
            absence_timeout: ABSENCE_TIMEOUT,
            absence_interval: ABSENCE_INTERVAL,
        }
    }

    /// Render a visual indicator over the probed region for the duration of
    /// each wait.
    pub fn with_overlay(mut self, renderer: Arc<dyn OverlayRenderer>) -> Self {
        self.overlay = Some(renderer);
        self
    }

    /// Observe an operator stop flag at every polling step.
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_presence_budget(mut self, attempts: usize, interval: Duration) -> Self {
        self.presence_attempts = attempts.max(1);
        self.presence_interval = interval;
        self
    }

    pub fn with_absence_budget(mut self, timeout: Duration, interval: Duration) -> Self {
        self.absence_timeout = timeout;
        self.absence_interval = interval;
        self
    }

    fn check_cancelled(&self) -> Result<(), DriveError> {
        match &self.stop {
            Some(stop) if stop.is_set() => Err(DriveError::Cancelled),
            _ => Ok(()),
        }
    }

    fn spawn_overlay(&self, region: Region) -> Option<OverlayHandle> {
        // Joined on drop, so the overlay is stopped before any return path.
        self.overlay
            .as_ref()
            .map(|r| OverlayHandle::spawn(r.clone(), region))
    }

    /// Poll until any candidate appears in the region, up to the attempt
    /// budget. Early-exits on the first match; optionally clicks on match.
    ///
    /// On exhaustion with a recovery controller supplied, runs the shared
    /// failure branch, which either raises [`DriveError::Restart`] or, when
    /// recovery reports failure, returns `Ok(Presence::Absent)`. Without a
    /// recovery controller the plain `Absent` result is returned directly.
    pub fn wait_for_present(
        &self,
        region: Region,
        condition: &TextCondition,
        click_on_match: bool,
        state: &mut RunState,
        recovery: Option<&dyn Recover>,
    ) -> Result<Presence, DriveError> {
        let _overlay = self.spawn_overlay(region);

        for attempt in 1..=self.presence_attempts {
            self.check_cancelled()?;
            let normalized = normalize_text(&self.probe.capture_text(region)?);
            if condition.matches(&normalized) {
                debug!(?region, attempt, "expected text detected");
                if click_on_match {
                    self.actuator.click();
                    std::thread::sleep(CLICK_SETTLE);
                }
                return Ok(Presence::Found(normalized));
            }
            std::thread::sleep(self.presence_interval);
        }

        debug!(?region, candidates = ?condition.candidates(), "expected text not found");
        self.failure_branch(state, recovery)?;
        Ok(Presence::Absent)
    }

    /// Poll until none of the candidates is present in the region, or the
    /// wall-clock timeout elapses. Same failure branch as presence waits.
    pub fn wait_for_absent(
        &self,
        region: Region,
        condition: &TextCondition,
        state: &mut RunState,
        recovery: Option<&dyn Recover>,
    ) -> Result<bool, DriveError> {
        let _overlay = self.spawn_overlay(region);

        let start = Instant::now();
        while start.elapsed() < self.absence_timeout {
            self.check_cancelled()?;
            let normalized = normalize_text(&self.probe.capture_text(region)?);
            if !condition.matches(&normalized) {
                return Ok(true);
            }
            std::thread::sleep(self.absence_interval);
        }

        warn!(?region, "text still present after {:?}", self.absence_timeout);
        self.failure_branch(state, recovery)?;
        Ok(false)
    }

    /// Shared failure branch for both wait flavors.
    ///
    /// With recovery supplied: record the failed step, run recovery once,
    /// and raise a restart when it reports success. The restart is raised
    /// even without an attached procedure handle: recovery has moved the UI
    /// to baseline, so continuing mid-step would act from an unknown state.
    /// Recovery reporting failure, or no recovery at all, returns `Ok(())`
    /// and the caller produces the plain failure result.
    fn failure_branch(
        &self,
        state: &mut RunState,
        recovery: Option<&dyn Recover>,
    ) -> Result<(), DriveError> {
        let Some(recovery) = recovery else {
            return Ok(());
        };

        state.record_wait_failure();
        debug!(
            procedure = ?state.current_procedure,
            recovery_count = state.recovery_count,
            "wait failed; attempting recovery"
        );
        if !recovery.reset(state)? {
            warn!("recovery reported failure; returning plain result");
            return Ok(());
        }

        if state.procedure_attached {
            state.record_restart();
            let name = state
                .current_procedure
                .clone()
                .unwrap_or_else(|| "<unnamed>".into());
            warn!(
                procedure = %name,
                restart_count = state.restart_count,
                "recovery succeeded; signaling restart"
            );
            Err(DriveError::Restart(format!("restart signal for: {name}")))
        } else {
            warn!("recovery succeeded with no procedure handle; aborting flow");
            Err(DriveError::Restart(
                "recovery executed but no procedure to restart".into(),
            ))
        }
    }
}
