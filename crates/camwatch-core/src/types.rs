//! Operating-window types.

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Unique identifier for a camera in the fleet document.
pub type CameraId = String;

/// Where the current time falls relative to the store's monitoring window.
///
/// Derived every cycle, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPhase {
    /// Before the pre-opening time.
    BeforeWindow,
    /// From the pre-opening time up to (excluding) the close time.
    ActiveWindow,
    /// At or after the close time.
    AfterWindow,
}

impl fmt::Display for WindowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowPhase::BeforeWindow => write!(f, "before_window"),
            WindowPhase::ActiveWindow => write!(f, "active_window"),
            WindowPhase::AfterWindow => write!(f, "after_window"),
        }
    }
}

/// The daily monitoring window: pre-opening time through close time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreWindow {
    pub pre_opening: NaiveTime,
    pub close: NaiveTime,
}

impl StoreWindow {
    pub fn new(pre_opening: NaiveTime, close: NaiveTime) -> Self {
        Self { pre_opening, close }
    }

    /// Classify a wall-clock time of day.
    ///
    /// When `pre_opening >= close` the window is empty and every time is
    /// either before or after it.
    pub fn phase(&self, now: NaiveTime) -> WindowPhase {
        if now < self.pre_opening {
            WindowPhase::BeforeWindow
        } else if now < self.close {
            WindowPhase::ActiveWindow
        } else {
            WindowPhase::AfterWindow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn phase_boundaries() {
        let window = StoreWindow::new(t(9, 55), t(22, 0));
        assert_eq!(window.phase(t(0, 0)), WindowPhase::BeforeWindow);
        assert_eq!(window.phase(t(9, 54)), WindowPhase::BeforeWindow);
        assert_eq!(window.phase(t(9, 55)), WindowPhase::ActiveWindow);
        assert_eq!(window.phase(t(21, 59)), WindowPhase::ActiveWindow);
        assert_eq!(window.phase(t(22, 0)), WindowPhase::AfterWindow);
        assert_eq!(window.phase(t(23, 59)), WindowPhase::AfterWindow);
    }

    #[test]
    fn empty_window_is_never_active() {
        let window = StoreWindow::new(t(23, 55), t(1, 0));
        assert_eq!(window.phase(t(0, 30)), WindowPhase::BeforeWindow);
        assert_eq!(window.phase(t(12, 0)), WindowPhase::BeforeWindow);
        assert_eq!(window.phase(t(23, 58)), WindowPhase::AfterWindow);
    }

    #[test]
    fn phase_display() {
        assert_eq!(WindowPhase::ActiveWindow.to_string(), "active_window");
    }
}
