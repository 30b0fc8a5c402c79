use serde::{Deserialize, Serialize};

/// Steps of an export, in the order they can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportStage {
    BuildDescriptionTrack,
    StripVideoAudio,
    MuxAudioFiles,
    SpliceExtendedDescriptions,
    CompressAudio,
    MixAudioVideo,
    /// Removes the intermediate files left by earlier stages
    Cleanup,
}

/// Overall export progress, as delivered to the caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportProgress {
    pub stage: ExportStage,
    /// Percentage of the whole export, 0-100
    pub percentage: f64,
}

/// Splits 100% evenly between stages and folds each stage's own progress into
/// its share. Reported values never go down.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_stages: usize,
    completed_stages: usize,
    reported: f64,
}

impl ProgressTracker {
    pub fn new(total_stages: usize) -> Self {
        ProgressTracker {
            total_stages: total_stages.max(1),
            completed_stages: 0,
            reported: 0.0,
        }
    }

    pub fn stage_share(&self) -> f64 {
        100.0 / self.total_stages as f64
    }

    /// Records that the running stage is `stage_percent` done. Returns the new
    /// overall percentage when it moved forward.
    pub fn advance_within_stage(&mut self, stage_percent: f64) -> Option<f64> {
        let fraction = stage_percent.clamp(0.0, 100.0) / 100.0;
        let overall = (self.completed_stages as f64 * self.stage_share()
            + fraction * self.stage_share())
        .min(100.0);
        self.report(overall)
    }

    /// Tops progress up to the end of the running stage
    pub fn complete_stage(&mut self) -> Option<f64> {
        self.completed_stages = (self.completed_stages + 1).min(self.total_stages);
        let overall = if self.completed_stages == self.total_stages {
            100.0
        } else {
            self.completed_stages as f64 * self.stage_share()
        };
        self.report(overall)
    }

    pub fn reported(&self) -> f64 {
        self.reported
    }

    fn report(&mut self, overall: f64) -> Option<f64> {
        if overall > self.reported {
            self.reported = overall;
            Some(overall)
        } else {
            None
        }
    }
}
