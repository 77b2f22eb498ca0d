//! Best-effort recovery back to a known baseline UI state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::capture::VisualProbe;
use crate::errors::DriveError;
use crate::input::{Actuator, OrientationProbe};
use crate::state::RunState;
use crate::types::{normalize_text, Region, TextCondition};

/// Seam the condition waiter escalates through. `Ok(true)` means the
/// baseline state was restored; `Ok(false)` means recovery could not
/// restore it and the failed wait should surface as a plain failure.
pub trait Recover {
    fn reset(&self, state: &mut RunState) -> Result<bool, DriveError>;
}

/// One known inventory-like overlay: where its title text appears and what
/// it reads.
#[derive(Debug, Clone)]
pub struct OverlayProbe {
    pub label: String,
    pub region: Region,
    pub condition: TextCondition,
}

const CLOSE_SETTLE: Duration = Duration::from_millis(200);

/// Returns the driven process to baseline: closes any open inventory-like
/// overlay and re-establishes a fresh orientation reading. Never re-runs
/// business logic; resuming is strictly the driver's job after the restart
/// signal unwinds to it.
pub struct RecoveryController {
    probe: VisualProbe,
    actuator: Arc<dyn Actuator>,
    orientation: Arc<dyn OrientationProbe>,
    overlays: Vec<OverlayProbe>,
    close_key: String,
}

impl RecoveryController {
    pub fn new(
        probe: VisualProbe,
        actuator: Arc<dyn Actuator>,
        orientation: Arc<dyn OrientationProbe>,
        overlays: Vec<OverlayProbe>,
    ) -> Self {
        Self {
            probe,
            actuator,
            orientation,
            overlays,
            close_key: "esc".into(),
        }
    }

    pub fn with_close_key(mut self, key: impl Into<String>) -> Self {
        self.close_key = key.into();
        self
    }

    /// Single-shot presence check, outside the waiter's retry budget.
    /// Probe errors count as "not present": recovery stays best-effort.
    fn overlay_open(&self) -> Option<&OverlayProbe> {
        self.overlays.iter().find(|o| {
            match self.probe.capture_text(o.region) {
                Ok(raw) => o.condition.matches(&normalize_text(&raw)),
                Err(e) => {
                    debug!(overlay = %o.label, "probe failed during recovery: {e}");
                    false
                }
            }
        })
    }
}

impl Recover for RecoveryController {
    /// Idempotent and side-effect-bounded: at most two close actuations,
    /// then one orientation refresh.
    fn reset(&self, state: &mut RunState) -> Result<bool, DriveError> {
        if let Some(open) = self.overlay_open() {
            debug!(overlay = %open.label, "overlay detected open; closing");
            self.actuator.press_key(&self.close_key);
            std::thread::sleep(CLOSE_SETTLE);
            if let Some(still_open) = self.overlay_open() {
                debug!(overlay = %still_open.label, "overlay still open; closing again");
                self.actuator.press_key(&self.close_key);
                std::thread::sleep(CLOSE_SETTLE);
            }
        }
        state.set_inventory(false, None);

        match self.orientation.read_orientation() {
            Some(orientation) => {
                debug!(?orientation, "orientation re-established after recovery");
                state.orientation = Some(orientation);
            }
            None => warn!("orientation query failed during recovery"),
        }

        // Best effort: baseline restoration is attempted, not verified.
        Ok(true)
    }
}
