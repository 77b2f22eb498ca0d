use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriveError {
    /// The current procedure cannot continue and must be unwound to the
    /// nearest driver loop, which decides whether to resume via checkpoint.
    #[error("Restart requested: {0}")]
    Restart(String),

    /// Operator-initiated stop. Terminates the run; never retried and never
    /// converted into a restart.
    #[error("Run cancelled by operator")]
    Cancelled,

    /// A single capture attempt failed at the backend. Retried by the
    /// visual probe before it escalates to `Restart`.
    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("Text recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DriveError {
    /// Whether this error must propagate unchanged through the checkpoint
    /// orchestrator instead of being wrapped into a restart.
    pub fn is_control_flow(&self) -> bool {
        matches!(self, DriveError::Restart(_) | DriveError::Cancelled)
    }
}
