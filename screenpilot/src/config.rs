//! Persisted configuration surface: named regions, expected text sets,
//! click points, and calibrated orientations.
//!
//! Loaded once at startup by the surrounding application and handed to the
//! engine as plain data; nothing here is re-read mid-run.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::errors::DriveError;
use crate::input::Point;
use crate::types::{Orientation, Region, TextCondition};

/// A text entry may be a single candidate or a list of candidates.
#[derive(Deserialize)]
#[serde(untagged)]
enum TextEntry {
    One(String),
    Many(Vec<String>),
}

impl From<TextEntry> for TextCondition {
    fn from(entry: TextEntry) -> Self {
        match entry {
            TextEntry::One(s) => TextCondition::new([s]),
            TextEntry::Many(v) => TextCondition::new(v),
        }
    }
}

const REGIONS_FILE: &str = "scan_regions.json";
const TEXTS_FILE: &str = "scan_texts.json";
const CLICKS_FILE: &str = "click_points.json";
const CALIBRATIONS_FILE: &str = "calibrations.json";

/// All persisted configuration the engine consumes.
#[derive(Debug, Default)]
pub struct EngineConfig {
    regions: HashMap<String, Region>,
    texts: HashMap<String, TextCondition>,
    clicks: HashMap<String, Point>,
    calibrations: HashMap<String, Orientation>,
}

impl EngineConfig {
    /// Load every configuration file from `dir`. A missing file leaves its
    /// section empty (logged); a malformed file is a hard configuration
    /// error. Region spans are validated during deserialization.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, DriveError> {
        let dir = dir.as_ref();
        let texts: HashMap<String, TextEntry> = load_section(dir, TEXTS_FILE)?;
        Ok(Self {
            regions: load_section(dir, REGIONS_FILE)?,
            texts: texts.into_iter().map(|(k, v)| (k, v.into())).collect(),
            clicks: load_section(dir, CLICKS_FILE)?,
            calibrations: load_section(dir, CALIBRATIONS_FILE)?,
        })
    }

    pub fn region(&self, name: &str) -> Result<Region, DriveError> {
        self.regions
            .get(name)
            .copied()
            .ok_or_else(|| DriveError::InvalidConfig(format!("unknown scan region '{name}'")))
    }

    pub fn texts(&self, name: &str) -> Result<&TextCondition, DriveError> {
        self.texts
            .get(name)
            .ok_or_else(|| DriveError::InvalidConfig(format!("unknown text set '{name}'")))
    }

    pub fn click(&self, name: &str) -> Result<Point, DriveError> {
        self.clicks
            .get(name)
            .copied()
            .ok_or_else(|| DriveError::InvalidConfig(format!("unknown click point '{name}'")))
    }

    pub fn calibration(&self, name: &str) -> Result<Orientation, DriveError> {
        self.calibrations
            .get(name)
            .copied()
            .ok_or_else(|| DriveError::InvalidConfig(format!("unknown calibration '{name}'")))
    }

    /// Region plus its expected texts under the same name, the pairing every
    /// wait call site needs.
    pub fn scan_target(&self, name: &str) -> Result<(Region, &TextCondition), DriveError> {
        Ok((self.region(name)?, self.texts(name)?))
    }
}

fn load_section<T: for<'de> Deserialize<'de>>(
    dir: &Path,
    file: &str,
) -> Result<HashMap<String, T>, DriveError> {
    let path = dir.join(file);
    if !path.exists() {
        warn!(?path, "configuration file missing; section left empty");
        return Ok(HashMap::new());
    }
    let raw = fs::read_to_string(&path)
        .map_err(|e| DriveError::InvalidConfig(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| DriveError::InvalidConfig(format!("{}: {e}", path.display())))
}
