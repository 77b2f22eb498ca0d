//! Checkpointed multi-stage workflows and the driver-level retry loop.
//!
//! The correctness property the ledger enforces: a restart never silently
//! skips work and never redoes already-confirmed work, at stage
//! granularity.

use tracing::{debug, info, warn};

use crate::errors::DriveError;
use crate::state::RunState;

/// Common capability every game-facing procedure implements, so the
/// checkpointed orchestrator can treat them uniformly.
pub trait Procedure {
    fn name(&self) -> &str;
    fn run(&mut self, state: &mut RunState) -> Result<(), DriveError>;
}

/// Run a procedure with a live handle attached to run state, so a failed
/// wait inside it signals a resumable restart instead of a full abort.
pub fn run_procedure<P: Procedure + ?Sized>(
    procedure: &mut P,
    state: &mut RunState,
) -> Result<(), DriveError> {
    state.begin_procedure(procedure.name().to_string(), true);
    procedure.run(state)
}

/// Outcome of a bounded driver retry loop. Exhaustion is reported, not
/// fatal: phases are independent and the driver proceeds to the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Completed,
    Exhausted { attempts: u32, last_reason: String },
}

/// Reference retry budget for one workflow before the driver gives up.
pub const DEFAULT_WORKFLOW_ATTEMPTS: u32 = 5;

type StageBody<'a, T> = Box<dyn FnMut(&mut T, &mut RunState) -> Result<(), DriveError> + 'a>;

struct Stage<'a, T> {
    name: String,
    body: StageBody<'a, T>,
}

/// A workflow over an ordered collection of items, each processed through a
/// fixed sequence of named stages, resumable via the checkpoint ledger in
/// [`RunState`].
pub struct StagedWorkflow<'a, T> {
    name: String,
    items: Vec<T>,
    stages: Vec<Stage<'a, T>>,
}

impl<'a, T> StagedWorkflow<'a, T> {
    pub fn new(name: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            name: name.into(),
            items,
            stages: Vec::new(),
        }
    }

    /// Append a named stage. Stages run in registration order.
    pub fn stage(
        mut self,
        name: impl Into<String>,
        body: impl FnMut(&mut T, &mut RunState) -> Result<(), DriveError> + 'a,
    ) -> Self {
        self.stages.push(Stage {
            name: name.into(),
            body: Box::new(body),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// One pass over the items, honoring the checkpoint ledger.
    ///
    /// Items before the checkpointed index are skipped entirely; for the
    /// checkpointed item, stages strictly before the checkpointed stage are
    /// skipped. The checkpoint is written immediately before entering a
    /// stage and cleared immediately after it completes, so an interrupting
    /// restart preserves the in-progress marker.
    pub fn run(&mut self, state: &mut RunState) -> Result<(), DriveError> {
        let start = state.checkpoint(&self.name);
        for idx in 0..self.items.len() {
            if idx < start.item {
                continue;
            }

            // Re-read per item: once a resumed stage clears, later items run
            // every stage from the start.
            let current = state.checkpoint(&self.name);
            let resume_from = match (&current.stage, current.item == idx) {
                (Some(stage_name), true) => self
                    .stages
                    .iter()
                    .position(|s| s.name == *stage_name)
                    .unwrap_or(0),
                _ => 0,
            };

            for pos in 0..self.stages.len() {
                if pos < resume_from {
                    debug!(
                        workflow = %self.name,
                        item = idx,
                        stage = %self.stages[pos].name,
                        "stage already completed; skipping"
                    );
                    continue;
                }
                let stage_name = self.stages[pos].name.clone();
                state.set_checkpoint(&self.name, idx, Some(stage_name.clone()));
                info!(workflow = %self.name, item = idx, stage = %stage_name, "entering stage");

                match (self.stages[pos].body)(&mut self.items[idx], state) {
                    Ok(()) => {
                        state.set_checkpoint(&self.name, idx, None);
                    }
                    Err(e) if e.is_control_flow() => {
                        warn!(
                            workflow = %self.name,
                            item = idx,
                            stage = %stage_name,
                            "aborted: {e}"
                        );
                        return Err(e);
                    }
                    Err(e) => {
                        // Unexpected errors become restarts so the driver's
                        // retry contract applies uniformly.
                        warn!(
                            workflow = %self.name,
                            item = idx,
                            stage = %stage_name,
                            "unexpected error: {e}"
                        );
                        return Err(DriveError::Restart(format!(
                            "unexpected error during {stage_name}: {e}"
                        )));
                    }
                }
            }

            state.set_checkpoint(&self.name, idx + 1, None);
        }
        Ok(())
    }

    /// Driver loop: retry the workflow across restart signals, up to
    /// `max_attempts`. The ledger carries progress between attempts, so a
    /// retry resumes where the restart interrupted. Cancellation and any
    /// non-restart error propagate immediately.
    pub fn run_with_retries(
        &mut self,
        state: &mut RunState,
        max_attempts: u32,
    ) -> Result<WorkflowOutcome, DriveError> {
        let mut last_reason = String::new();
        for attempt in 1..=max_attempts {
            match self.run(state) {
                Ok(()) => return Ok(WorkflowOutcome::Completed),
                Err(DriveError::Restart(reason)) => {
                    warn!(
                        workflow = %self.name,
                        attempt,
                        max_attempts,
                        "restart signaled: {reason}; will retry"
                    );
                    last_reason = reason;
                }
                Err(other) => return Err(other),
            }
        }
        warn!(
            workflow = %self.name,
            max_attempts,
            "retry budget exhausted; proceeding to next phase"
        );
        Ok(WorkflowOutcome::Exhausted {
            attempts: max_attempts,
            last_reason,
        })
    }
}
