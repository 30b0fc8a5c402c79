use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A recorded narration clip placed on the video timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    /// WAV file holding the recording
    pub path: PathBuf,
    /// Start of the clip within the WAV file, in milliseconds
    pub start_in_wave_ms: f64,
    /// End of the clip within the WAV file, in milliseconds
    pub end_in_wave_ms: f64,
    /// Where playback starts in the video, in milliseconds
    pub start_in_video_ms: f64,
    /// Extended descriptions pause the video while they play
    #[serde(default)]
    pub is_extended: bool,
    #[serde(default)]
    pub text: String,
}

impl Description {
    pub fn new(
        path: impl Into<PathBuf>,
        start_in_wave_ms: f64,
        end_in_wave_ms: f64,
        start_in_video_ms: f64,
    ) -> Self {
        Description {
            path: path.into(),
            start_in_wave_ms,
            end_in_wave_ms,
            start_in_video_ms,
            is_extended: false,
            text: String::new(),
        }
    }

    pub fn extended(mut self) -> Self {
        self.is_extended = true;
        self
    }

    /// Returns the clip length in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.end_in_wave_ms - self.start_in_wave_ms
    }

    /// Video time at which a regular description stops playing
    pub fn end_in_video_ms(&self) -> f64 {
        self.start_in_video_ms + self.duration_ms()
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_in_wave_ms < 0.0 || !(self.end_in_wave_ms > self.start_in_wave_ms) {
            return Err(Error::InvalidDescription(format!(
                "{:?}: clip range {}ms - {}ms is empty",
                self.path, self.start_in_wave_ms, self.end_in_wave_ms
            )));
        }
        if self.start_in_video_ms < 0.0 {
            return Err(Error::InvalidDescription(format!(
                "{:?}: starts before the video ({}ms)",
                self.path, self.start_in_video_ms
            )));
        }
        Ok(())
    }
}

/// Regular descriptions ordered by their start in the video
pub fn regular_in_order(descriptions: &[Description]) -> Vec<&Description> {
    sorted_by_start(descriptions.iter().filter(|d| !d.is_extended))
}

/// Extended descriptions ordered by their start in the video
pub fn extended_in_order(descriptions: &[Description]) -> Vec<&Description> {
    sorted_by_start(descriptions.iter().filter(|d| d.is_extended))
}

fn sorted_by_start<'a>(
    descriptions: impl Iterator<Item = &'a Description>,
) -> Vec<&'a Description> {
    let mut sorted: Vec<&Description> = descriptions.collect();
    sorted.sort_by(|a, b| a.start_in_video_ms.total_cmp(&b.start_in_video_ms));
    sorted
}

/// Loads a JSON array of descriptions. Relative clip paths are resolved
/// against the directory holding the list.
pub fn load_descriptions(list_path: &Path) -> Result<Vec<Description>> {
    log::info!("Loading descriptions from: {:?}", list_path);

    let json = fs::read_to_string(list_path)?;
    let mut descriptions: Vec<Description> = serde_json::from_str(&json)?;

    let base = list_path.parent().unwrap_or(Path::new("."));
    for description in &mut descriptions {
        if description.path.is_relative() {
            description.path = base.join(&description.path);
        }
        description.validate()?;
    }

    log::info!("Loaded {} descriptions", descriptions.len());
    Ok(descriptions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_and_video_end() {
        let d = Description::new("a.wav", 500.0, 2500.0, 10_000.0);
        assert_eq!(d.duration_ms(), 2000.0);
        assert_eq!(d.end_in_video_ms(), 12_000.0);
        assert!(!d.is_extended);
    }

    #[test]
    fn test_validation() {
        assert!(Description::new("a.wav", 0.0, 1000.0, 0.0).validate().is_ok());
        assert!(Description::new("a.wav", 1000.0, 1000.0, 0.0).validate().is_err());
        assert!(Description::new("a.wav", 0.0, 1000.0, -5.0).validate().is_err());
    }

    #[test]
    fn test_ordering_splits_by_kind() {
        let descriptions = vec![
            Description::new("c.wav", 0.0, 1000.0, 9000.0),
            Description::new("x.wav", 0.0, 1000.0, 3000.0).extended(),
            Description::new("a.wav", 0.0, 1000.0, 1000.0),
            Description::new("b.wav", 0.0, 1000.0, 5000.0),
        ];

        let regular: Vec<f64> = regular_in_order(&descriptions)
            .iter()
            .map(|d| d.start_in_video_ms)
            .collect();
        assert_eq!(regular, vec![1000.0, 5000.0, 9000.0]);

        let extended = extended_in_order(&descriptions);
        assert_eq!(extended.len(), 1);
        assert_eq!(extended[0].path, PathBuf::from("x.wav"));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("descriptions.json");
        fs::write(
            &list,
            r#"[
                {"path": "clips/one.wav", "start_in_wave_ms": 0, "end_in_wave_ms": 1500,
                 "start_in_video_ms": 2000},
                {"path": "/abs/two.wav", "start_in_wave_ms": 0, "end_in_wave_ms": 800,
                 "start_in_video_ms": 0, "is_extended": true}
            ]"#,
        )
        .unwrap();

        let descriptions = load_descriptions(&list).unwrap();
        assert_eq!(descriptions[0].path, dir.path().join("clips/one.wav"));
        assert_eq!(descriptions[1].path, PathBuf::from("/abs/two.wav"));
        assert!(descriptions[1].is_extended);
    }
}
