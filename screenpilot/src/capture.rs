//! The visual probe: one capture-and-recognize cycle over a region.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use tracing::{error, warn};

use crate::errors::DriveError;
use crate::types::Region;

/// Captures a rectangular screen region. Pluggable across backends; a single
/// call may fail and is retried by [`VisualProbe`] before the failure is
/// treated as fatal.
pub trait ScreenCapture: Send + Sync {
    fn capture(&self, region: Region) -> Result<RgbaImage, DriveError>;
}

/// Turns a captured frame into text. Assumed synchronous and deterministic
/// per call.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, frame: &RgbaImage) -> Result<String, DriveError>;
}

const CAPTURE_ATTEMPTS: usize = 30;
const CAPTURE_BACKOFF: Duration = Duration::from_millis(250);

/// One capture-and-recognize cycle per call; no caching.
#[derive(Clone)]
pub struct VisualProbe {
    capture: Arc<dyn ScreenCapture>,
    recognizer: Arc<dyn TextRecognizer>,
    attempts: usize,
    backoff: Duration,
}

impl VisualProbe {
    pub fn new(capture: Arc<dyn ScreenCapture>, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            capture,
            recognizer,
            attempts: CAPTURE_ATTEMPTS,
            backoff: CAPTURE_BACKOFF,
        }
    }

    /// Override the capture retry budget. Mainly for tests.
    pub fn with_capture_retries(mut self, attempts: usize, backoff: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.backoff = backoff;
        self
    }

    /// Capture the region and return the recognized raw text.
    ///
    /// The underlying capture is retried with a short backoff; exhausting the
    /// retry budget is an infrastructure failure and surfaces as
    /// [`DriveError::Restart`], not as a "text not found" result.
    pub fn capture_text(&self, region: Region) -> Result<String, DriveError> {
        let mut last_err = None;
        for attempt in 0..self.attempts {
            match self.capture.capture(region) {
                Ok(frame) => return self.recognizer.recognize(&frame),
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        attempts = self.attempts,
                        ?region,
                        "capture failed: {e}"
                    );
                    last_err = Some(e);
                    std::thread::sleep(self.backoff);
                }
            }
        }
        error!(?region, "capture failed after {} attempts", self.attempts);
        Err(DriveError::Restart(format!(
            "screen grab failed after {} retries: {}",
            self.attempts,
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".into())
        )))
    }
}
