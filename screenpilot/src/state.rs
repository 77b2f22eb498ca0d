//! Run state: the single mutable record of the driven process's believed
//! position and UI state, plus the checkpoint ledger.

use std::collections::HashMap;

use tracing::debug;

use crate::types::Orientation;

/// Progress marker for one multi-stage workflow.
///
/// `stage == None` means the item at `item` has either not been started or
/// has fully completed; a named stage means "resume this item at this stage,
/// skipping earlier stages."
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    pub item: usize,
    pub stage: Option<String>,
}

/// Shared mutable record of believed world/UI state and recovery counters.
///
/// Created once per run, owned by the driver, and handed by mutable
/// reference to every procedure, the condition waiter, and the recovery
/// controller. No component keeps a private copy.
#[derive(Debug, Default)]
pub struct RunState {
    /// Believed world position (teleporter name or similar opaque id).
    pub position: Option<String>,
    /// Believed view orientation, refreshed by recovery.
    pub orientation: Option<Orientation>,
    pub crouching: bool,

    /// Whether any inventory-like overlay is believed open, and which one.
    pub inventory_open: bool,
    pub inventory_kind: Option<String>,

    /// Name of the procedure currently executing, if any.
    pub current_procedure: Option<String>,
    /// Whether a driver-owned procedure handle is live. Without one, a wait
    /// failure aborts the whole flow rather than signaling a resumable
    /// restart.
    pub procedure_attached: bool,

    pub last_failed_step: Option<String>,
    pub last_action_success: bool,
    pub recovery_count: u32,
    pub restart_count: u32,
    pub restart_requested: bool,

    checkpoints: HashMap<String, Checkpoint>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            last_action_success: true,
            ..Default::default()
        }
    }

    /// Record the procedure now executing. Clears any pending restart
    /// request so a freshly (re)started procedure begins clean.
    pub fn begin_procedure(&mut self, name: impl Into<String>, attached: bool) {
        let name = name.into();
        debug!(procedure = %name, attached, "procedure started");
        self.current_procedure = Some(name);
        self.procedure_attached = attached;
        self.restart_requested = false;
    }

    pub fn end_procedure(&mut self) {
        self.current_procedure = None;
        self.procedure_attached = false;
    }

    /// Mark the current wait as failed and bump the recovery counter.
    /// Called by the waiter before recovery is attempted.
    pub(crate) fn record_wait_failure(&mut self) {
        self.last_failed_step = self.current_procedure.clone();
        self.last_action_success = false;
        self.recovery_count += 1;
    }

    pub(crate) fn record_restart(&mut self) {
        self.restart_count += 1;
        self.restart_requested = true;
    }

    pub fn set_inventory(&mut self, open: bool, kind: Option<String>) {
        self.inventory_open = open;
        self.inventory_kind = if open { kind } else { None };
    }

    /// Checkpoint for a named workflow, `(0, None)` if never written.
    pub fn checkpoint(&self, workflow: &str) -> Checkpoint {
        self.checkpoints.get(workflow).cloned().unwrap_or_default()
    }

    pub fn set_checkpoint(&mut self, workflow: &str, item: usize, stage: Option<String>) {
        debug!(workflow, item, ?stage, "checkpoint set");
        self.checkpoints
            .insert(workflow.to_string(), Checkpoint { item, stage });
    }

    /// Reset a workflow's ledger. Drivers call this when a new top-level
    /// run begins; restarts within a run must never reset it.
    pub fn reset_checkpoint(&mut self, workflow: &str) {
        self.checkpoints.remove(workflow);
    }
}
