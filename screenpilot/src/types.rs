//! Common types shared by the probe, waiter, and recovery layers.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::errors::DriveError;

/// An axis-aligned screen rectangle used for capture.
///
/// Always normalized to (left, top, right, bottom). Configuration may supply
/// a `[width, height]` pair instead, which normalizes to `(0, 0, w, h)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Serialize for Region {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.left, self.top, self.right, self.bottom).serialize(serializer)
    }
}

impl Region {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Result<Self, DriveError> {
        if right <= left || bottom <= top {
            return Err(DriveError::InvalidRegion(format!(
                "zero or negative span: ({left}, {top}, {right}, {bottom})"
            )));
        }
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn from_size(width: i32, height: i32) -> Result<Self, DriveError> {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> u32 {
        (self.right - self.left) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top) as u32
    }
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Vec::<i32>::deserialize(deserializer)?;
        let region = match raw.as_slice() {
            [l, t, r, b] => Region::new(*l, *t, *r, *b),
            [w, h] => Region::from_size(*w, *h),
            other => Err(DriveError::InvalidRegion(format!(
                "expected 2 or 4 coordinates, got {}",
                other.len()
            ))),
        };
        region.map_err(serde::de::Error::custom)
    }
}

/// Strip all whitespace and uppercase, the canonical form every text
/// condition is matched against.
pub fn normalize_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// A set of candidate strings; the condition holds when any candidate is a
/// case-insensitive substring of the normalized probe text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextCondition {
    candidates: Vec<String>,
}

impl TextCondition {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Existential, case-insensitive substring match against already
    /// normalized text.
    pub fn matches(&self, normalized: &str) -> bool {
        self.candidates
            .iter()
            .any(|c| normalized.contains(&normalize_text(c)))
    }
}

impl From<&str> for TextCondition {
    fn from(s: &str) -> Self {
        TextCondition::new([s])
    }
}

/// Believed view orientation of the driven process.
///
/// Serialized as a `[yaw, pitch]` pair, the form calibration files use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub yaw: f64,
    pub pitch: f64,
}

impl Serialize for Orientation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.yaw, self.pitch).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Orientation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (yaw, pitch) = <(f64, f64)>::deserialize(deserializer)?;
        Ok(Self { yaw, pitch })
    }
}

/// Cloneable cancellation flag for operator-initiated stop.
///
/// Checked at every polling step; once set, in-flight waits return
/// [`DriveError::Cancelled`] without attempting recovery.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Renders a visual indicator over the region currently being probed.
///
/// Runs on a secondary, purely observational thread; implementations must
/// return promptly once `stop` is set. The engine itself ships no renderer.
pub trait OverlayRenderer: Send + Sync {
    fn render(&self, region: Region, stop: &AtomicBool);
}

/// Handle for the overlay thread spawned during a wait.
///
/// Dropping the handle sets the stop flag and joins, so the overlay is
/// guaranteed stopped before the waiter returns on every path.
pub struct OverlayHandle {
    pub(crate) should_close: Arc<AtomicBool>,
    pub(crate) handle: Option<thread::JoinHandle<()>>,
}

impl OverlayHandle {
    pub(crate) fn spawn(renderer: Arc<dyn OverlayRenderer>, region: Region) -> Self {
        let should_close = Arc::new(AtomicBool::new(false));
        let flag = should_close.clone();
        let handle = thread::spawn(move || renderer.render(region, &flag));
        Self {
            should_close,
            handle: Some(handle),
        }
    }
}

impl Drop for OverlayHandle {
    fn drop(&mut self) {
        self.should_close.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
