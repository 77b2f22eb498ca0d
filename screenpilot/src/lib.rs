//! Perception-gated automation for opaque applications
//!
//! Drives a process that exposes no programmatic state through two channels
//! only: a visual probe that reads text out of captured screen regions, and
//! an actuator that injects pointer/keyboard events. Every action is
//! verified by re-observing the screen; a failed verification escalates
//! through one recovery funnel and, when recovery succeeds, unwinds the
//! current procedure with a restart signal so the driver can resume it at
//! the last checkpointed stage.

pub mod capture;
pub mod config;
pub mod errors;
pub mod input;
pub mod recovery;
pub mod state;
#[cfg(test)]
mod tests;
pub mod types;
pub mod wait;
pub mod workflow;

pub use capture::{ScreenCapture, TextRecognizer, VisualProbe};
pub use config::EngineConfig;
pub use errors::DriveError;
pub use input::{Actuator, OrientationProbe, Point};
pub use recovery::{OverlayProbe, Recover, RecoveryController};
pub use state::{Checkpoint, RunState};
pub use types::{normalize_text, Orientation, OverlayRenderer, Region, StopFlag, TextCondition};
pub use wait::{Presence, Waiter};
pub use workflow::{
    run_procedure, Procedure, StagedWorkflow, WorkflowOutcome, DEFAULT_WORKFLOW_ATTEMPTS,
};
