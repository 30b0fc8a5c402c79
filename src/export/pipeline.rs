use super::progress::{ExportProgress, ExportStage, ProgressTracker};
use super::workspace::ExportWorkspace;
use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::media::{TranscodeCommand, Transcoder};
use crate::timeline::{extended_in_order, regular_in_order, Description};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What an export produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportKind {
    /// The video with regular descriptions mixed into its soundtrack
    VideoWithDescriptions,
    /// An audio file where extended descriptions are spliced into the mix
    AudioWithExtendedDescriptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    pub kind: ExportKind,
    pub video_path: PathBuf,
    pub output_path: PathBuf,
    pub descriptions: Vec<Description>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Exported(PathBuf),
    /// There were no descriptions to export; nothing was run
    NothingToExport,
}

/// The stages an export will run, in order. Empty when there is nothing to export.
/// The stage count sets each stage's share of the overall progress.
pub fn plan_stages(request: &ExportRequest, config: &ExportConfig) -> Vec<ExportStage> {
    use ExportStage::*;

    let has_regular = request.descriptions.iter().any(|d| !d.is_extended);
    let has_extended = request.descriptions.iter().any(|d| d.is_extended);
    let compress = config.compress_format.is_some();
    let mut stages = Vec::new();

    match request.kind {
        ExportKind::VideoWithDescriptions => {
            if !has_regular {
                return stages;
            }
            stages.extend([BuildDescriptionTrack, StripVideoAudio, MuxAudioFiles]);
            if compress {
                stages.push(CompressAudio);
            }
            stages.extend([MixAudioVideo, Cleanup]);
        }
        ExportKind::AudioWithExtendedDescriptions => {
            if !has_regular && !has_extended {
                return stages;
            }
            if has_regular {
                stages.push(BuildDescriptionTrack);
            }
            stages.push(StripVideoAudio);
            if has_regular {
                stages.push(MuxAudioFiles);
            }
            if has_extended {
                stages.push(SpliceExtendedDescriptions);
            }
            if compress {
                stages.push(CompressAudio);
            }
        }
    }
    stages
}

/// Assembles narration clips and the original soundtrack into one deliverable
pub struct ExportPipeline<'a> {
    transcoder: &'a dyn Transcoder,
    config: &'a ExportConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(transcoder: &'a dyn Transcoder, config: &'a ExportConfig) -> Self {
        ExportPipeline {
            transcoder,
            config,
            cancel: None,
        }
    }

    /// Stops the export before the next stage once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Runs every planned stage. `on_progress` is called on this thread with
    /// non-decreasing overall percentages; the last call of a successful
    /// export reports 100.
    pub fn export(
        &self,
        request: &ExportRequest,
        on_progress: &mut dyn FnMut(ExportProgress),
    ) -> Result<ExportOutcome> {
        let stages = plan_stages(request, self.config);
        if stages.is_empty() {
            log::info!("No descriptions to export");
            return Ok(ExportOutcome::NothingToExport);
        }

        self.config.validate()?;
        verify_inputs(request)?;
        verify_output(request, self.config)?;

        log::info!(
            "Starting {:?} export of {:?} to {:?} in {} stages",
            request.kind,
            request.video_path,
            request.output_path,
            stages.len()
        );

        let mut job = ExportJob {
            transcoder: self.transcoder,
            config: self.config,
            request,
            workspace: ExportWorkspace::create(&self.config.work_dir)?,
            tracker: ProgressTracker::new(stages.len()),
            on_progress,
            cancel: self.cancel.as_deref(),
        };

        let result = job.run(&stages);
        // Cancelled and failed exports never reach the Cleanup stage
        job.workspace.cleanup();

        match result {
            Ok(()) => {
                log::info!("Export completed: {:?}", request.output_path);
                Ok(ExportOutcome::Exported(request.output_path.clone()))
            }
            Err(e) => {
                log::error!("Export failed: {}", e);
                Err(e)
            }
        }
    }
}

fn verify_inputs(request: &ExportRequest) -> Result<()> {
    for description in &request.descriptions {
        description.validate()?;
        if !description.path.exists() {
            return Err(Error::InvalidDescription(format!(
                "clip file not found: {:?}",
                description.path
            )));
        }
    }
    if !request.video_path.exists() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Source video file not found: {:?}", request.video_path),
        )));
    }
    Ok(())
}

/// A compressed audio export writes the compressed file straight to the
/// output, so the output extension has to name the same format
fn verify_output(request: &ExportRequest, config: &ExportConfig) -> Result<()> {
    let format = match (request.kind, &config.compress_format) {
        (ExportKind::AudioWithExtendedDescriptions, Some(format)) => format,
        _ => return Ok(()),
    };
    let extension = request
        .output_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    if extension.eq_ignore_ascii_case(format) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "output {:?} does not match compress format {:?}",
            request.output_path, format
        )))
    }
}

fn ms_to_secs(ms: f64) -> f64 {
    ms / 1000.0
}

/// State of one running export
struct ExportJob<'a, 'p> {
    transcoder: &'a dyn Transcoder,
    config: &'a ExportConfig,
    request: &'a ExportRequest,
    workspace: ExportWorkspace,
    tracker: ProgressTracker,
    on_progress: &'p mut dyn FnMut(ExportProgress),
    cancel: Option<&'a AtomicBool>,
}

impl ExportJob<'_, '_> {
    fn run(&mut self, stages: &[ExportStage]) -> Result<()> {
        let mut description_track: Option<PathBuf> = None;
        let mut stripped: Option<PathBuf> = None;
        let mut audio: Option<PathBuf> = None;
        let output_stage = stages.iter().rposition(|&s| s != ExportStage::Cleanup);

        for (index, &stage) in stages.iter().enumerate() {
            if self.cancel.map_or(false, |flag| flag.load(Ordering::SeqCst)) {
                log::info!("Export cancelled before {:?}", stage);
                return Err(Error::Cancelled);
            }

            let is_last = output_stage == Some(index);
            log::info!("Export stage {}/{}: {:?}", index + 1, stages.len(), stage);

            match stage {
                ExportStage::BuildDescriptionTrack => {
                    let target = self.target(is_last, "description_track", "wav");
                    description_track = Some(self.build_description_track(target)?);
                }
                ExportStage::StripVideoAudio => {
                    let target = self.target(is_last, "stripped_audio", "wav");
                    let command = TranscodeCommand::strip_audio(&self.request.video_path, &target);
                    self.run_tracked(stage, &command)?;
                    stripped = Some(target.clone());
                    audio = Some(target);
                }
                ExportStage::MuxAudioFiles => {
                    let soundtrack = required(&stripped, stage)?;
                    let track = required(&description_track, stage)?;
                    let target = self.target(is_last, "mixed_audio", "wav");
                    self.run_tracked(stage, &TranscodeCommand::mix(&soundtrack, &track, &target))?;
                    audio = Some(target);
                }
                ExportStage::SpliceExtendedDescriptions => {
                    let base = required(&audio, stage)?;
                    let target = self.target(is_last, "spliced_audio", "wav");
                    audio = Some(self.splice_extended(&base, target)?);
                }
                ExportStage::CompressAudio => {
                    let source = required(&audio, stage)?;
                    let format = self
                        .config
                        .compress_format
                        .clone()
                        .unwrap_or_else(|| "mp3".to_string());
                    let target = self.target(is_last, "compressed_audio", &format);
                    self.run_tracked(stage, &TranscodeCommand::compress(&source, &target))?;
                    self.workspace.discard(&source);
                    audio = Some(target);
                }
                ExportStage::MixAudioVideo => {
                    let track = required(&audio, stage)?;
                    let command = TranscodeCommand::mux(
                        &self.request.video_path,
                        &track,
                        &self.request.output_path,
                    );
                    self.run_tracked(stage, &command)?;
                }
                ExportStage::Cleanup => self.workspace.cleanup(),
            }

            if let Some(percentage) = self.tracker.complete_stage() {
                (self.on_progress)(ExportProgress { stage, percentage });
            }
        }

        Ok(())
    }

    /// The last producing stage writes the requested output; earlier stages
    /// write intermediates
    fn target(&mut self, is_last: bool, name: &str, extension: &str) -> PathBuf {
        if is_last {
            self.request.output_path.clone()
        } else {
            self.workspace.temp_file(name, extension)
        }
    }

    /// Lays all regular descriptions end to end with silence filling the gaps
    /// between them, starting at time zero of the video
    fn build_description_track(&mut self, target: PathBuf) -> Result<PathBuf> {
        let request = self.request;
        let regular = regular_in_order(&request.descriptions);
        let mut segments: Vec<PathBuf> = Vec::with_capacity(regular.len() + 1);

        let first_start = regular.first().map_or(0.0, |d| d.start_in_video_ms);
        if first_start > 0.0 {
            let lead = self.workspace.temp_file("lead_silence", "wav");
            self.run_untracked(&TranscodeCommand::silence(ms_to_secs(first_start), &lead))?;
            segments.push(lead);
        }

        for (i, description) in regular.iter().enumerate() {
            let clip = self.slice_clip(description)?;

            // Overlapping descriptions get no padding
            let gap_ms = regular
                .get(i + 1)
                .map_or(0.0, |next| next.start_in_video_ms - description.end_in_video_ms());

            if gap_ms > 0.0 {
                let padded = self.workspace.temp_file("padded_clip", "wav");
                let command = TranscodeCommand::append_silence(&clip, ms_to_secs(gap_ms), &padded);
                self.run_untracked(&command)?;
                self.workspace.discard(&clip);
                segments.push(padded);
            } else {
                segments.push(clip);
            }
        }

        log::info!("Concatenating {} description track segments", segments.len());
        self.run_tracked(
            ExportStage::BuildDescriptionTrack,
            &TranscodeCommand::concat(&segments, &target),
        )?;

        for segment in &segments {
            self.workspace.discard(segment);
        }
        Ok(target)
    }

    /// Cuts `base` at each extended description and inserts the description's
    /// audio there; the base resumes where it was cut
    fn splice_extended(&mut self, base: &Path, target: PathBuf) -> Result<PathBuf> {
        let request = self.request;
        let extended = extended_in_order(&request.descriptions);
        let mut pieces: Vec<PathBuf> = Vec::with_capacity(extended.len() * 2 + 1);
        let mut cursor_ms = 0.0;

        for description in extended {
            let cut_ms = description.start_in_video_ms.max(cursor_ms);
            if cut_ms > cursor_ms {
                let piece = self.workspace.temp_file("base_slice", "wav");
                let command = TranscodeCommand::slice(
                    base,
                    ms_to_secs(cursor_ms),
                    Some(ms_to_secs(cut_ms - cursor_ms)),
                    &piece,
                );
                self.run_untracked(&command)?;
                pieces.push(piece);
            }

            pieces.push(self.slice_clip(description)?);
            cursor_ms = cut_ms;
        }

        let tail = self.workspace.temp_file("base_tail", "wav");
        self.run_untracked(&TranscodeCommand::slice(base, ms_to_secs(cursor_ms), None, &tail))?;
        pieces.push(tail);

        log::info!("Splicing {} pieces into the final track", pieces.len());
        self.run_tracked(
            ExportStage::SpliceExtendedDescriptions,
            &TranscodeCommand::concat(&pieces, &target),
        )?;

        for piece in &pieces {
            self.workspace.discard(piece);
        }
        Ok(target)
    }

    /// Copies the recorded range of a description into its own file
    fn slice_clip(&mut self, description: &Description) -> Result<PathBuf> {
        let clip = self.workspace.temp_file("clip", "wav");
        let command = TranscodeCommand::slice(
            &description.path,
            ms_to_secs(description.start_in_wave_ms),
            Some(ms_to_secs(description.duration_ms())),
            &clip,
        );
        self.run_untracked(&command)?;
        Ok(clip)
    }

    fn run_untracked(&self, command: &TranscodeCommand) -> Result<()> {
        self.transcoder.run(command, None)
    }

    fn run_tracked(&mut self, stage: ExportStage, command: &TranscodeCommand) -> Result<()> {
        let tracker = &mut self.tracker;
        let on_progress = &mut *self.on_progress;
        let mut report = |stage_percent: f64| {
            if let Some(percentage) = tracker.advance_within_stage(stage_percent) {
                on_progress(ExportProgress { stage, percentage });
            }
        };
        self.transcoder.run(command, Some(&mut report))
    }
}

fn required(path: &Option<PathBuf>, stage: ExportStage) -> Result<PathBuf> {
    path.clone().ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::Other,
            format!("{:?} has no input audio", stage),
        ))
    })
}
