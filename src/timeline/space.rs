use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A stretch of the video without speech where narration can be placed.
/// Times are milliseconds from the start of the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub start_ms: f64,
    pub end_ms: f64,
    /// Label shown on the timeline
    #[serde(default)]
    pub text: String,
    /// Whether the space is selected in the editor
    #[serde(default)]
    pub is_selected: bool,
}

impl Space {
    /// Creates a space, rejecting empty or reversed intervals
    pub fn new(start_ms: f64, end_ms: f64) -> Result<Self> {
        if !(end_ms > start_ms) {
            return Err(Error::InvalidInterval { start_ms, end_ms });
        }
        Ok(Space {
            start_ms,
            end_ms,
            text: String::new(),
            is_selected: false,
        })
    }

    /// Detector output; callers guarantee `end_ms > start_ms`
    pub(crate) fn from_detection(start_ms: f64, end_ms: f64) -> Self {
        debug_assert!(end_ms > start_ms);
        Space {
            start_ms,
            end_ms,
            text: String::new(),
            is_selected: false,
        }
    }

    /// Returns the length of this space in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }

    pub fn contains(&self, time_ms: f64) -> bool {
        time_ms >= self.start_ms && time_ms < self.end_ms
    }

    /// Moves both edges, keeping `end > start`
    pub fn set_bounds(&mut self, start_ms: f64, end_ms: f64) -> Result<()> {
        if !(end_ms > start_ms) {
            return Err(Error::InvalidInterval { start_ms, end_ms });
        }
        self.start_ms = start_ms;
        self.end_ms = end_ms;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_creation() {
        let space = Space::new(1000.0, 2500.0).unwrap();
        assert_eq!(space.duration_ms(), 1500.0);
        assert!(space.text.is_empty());
        assert!(!space.is_selected);
    }

    #[test]
    fn test_reversed_interval_is_rejected() {
        assert!(matches!(
            Space::new(2000.0, 2000.0),
            Err(Error::InvalidInterval { .. })
        ));
        assert!(Space::new(3000.0, 1000.0).is_err());
    }

    #[test]
    fn test_set_bounds_keeps_invariant() {
        let mut space = Space::new(0.0, 1000.0).unwrap();
        assert!(space.set_bounds(500.0, 400.0).is_err());
        assert_eq!((space.start_ms, space.end_ms), (0.0, 1000.0));

        space.set_bounds(200.0, 900.0).unwrap();
        assert!(space.contains(200.0));
        assert!(!space.contains(900.0));
    }

    #[test]
    fn test_deserialize_without_display_fields() {
        let space: Space = serde_json::from_str(r#"{"start_ms": 0.0, "end_ms": 3000.0}"#).unwrap();
        assert_eq!(space.end_ms, 3000.0);
        assert!(!space.is_selected);
    }
}
