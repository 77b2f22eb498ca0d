//! Actuator seam: pointer and keyboard injection.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Orientation;

/// A screen point for absolute pointer moves and clicks.
///
/// Serialized as an `[x, y]` pair, the form click-point files use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Serialize for Point {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.x, self.y).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (x, y) = <(f64, f64)>::deserialize(deserializer)?;
        Ok(Self { x, y })
    }
}

/// Injects pointer and keyboard events into the driven process.
///
/// Fire-and-forget: calls carry no result and are assumed to take effect
/// within the polling cadence of the condition waiter, which is the only
/// place their effect is verified.
pub trait Actuator: Send + Sync {
    fn move_mouse_abs(&self, x: f64, y: f64);
    fn move_mouse_rel(&self, dx: i32, dy: i32);
    fn click(&self);
    fn press_key(&self, key: &str);
    fn key_down(&self, key: &str);
    fn key_up(&self, key: &str);
    fn type_text(&self, text: &str);
}

/// Out-of-band query for the driven process's current view orientation,
/// e.g. a console command whose output is read back off the clipboard.
pub trait OrientationProbe: Send + Sync {
    fn read_orientation(&self) -> Option<Orientation>;
}

/// Move to a text field, focus it with a click, then type.
pub fn enter_text(actuator: &dyn Actuator, field: Point, text: &str) {
    actuator.move_mouse_abs(field.x, field.y);
    actuator.click();
    std::thread::sleep(Duration::from_millis(100));
    actuator.type_text(text);
}

/// Move to a point and click it.
pub fn click_at(actuator: &dyn Actuator, point: Point) {
    actuator.move_mouse_abs(point.x, point.y);
    actuator.click();
}
