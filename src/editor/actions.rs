use crate::analysis::{detect_silence, extract_waveform, Waveform};
use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::media::{TranscodeCommand, Transcoder};
use crate::timeline::Space;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Everything the editor needs to show a video's audio and its gaps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// Stripped soundtrack the waveform was read from
    pub wav_path: PathBuf,
    pub waveform: Waveform,
    pub spaces: Vec<Space>,
}

/// Extracts the soundtrack of a video, downsamples it and finds the spaces
/// between speech
pub fn analyze_video(
    video_path: &Path,
    config: &ExportConfig,
    transcoder: &dyn Transcoder,
) -> Result<Analysis> {
    log::info!("Starting analysis for: {:?}", video_path);

    if !video_path.exists() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Video file not found: {:?}", video_path),
        )));
    }

    let wav_path = audio_path_for(video_path, config.ensure_work_dir()?)?;
    let command = if config.strip_bitexact {
        TranscodeCommand::strip_audio_bitexact(video_path, &wav_path)
    } else {
        TranscodeCommand::strip_audio(video_path, &wav_path)
    };
    transcoder.run(&command, None)?;
    log::info!("Audio extracted to: {:?}", wav_path);

    let waveform = extract_waveform(&wav_path)?;
    let spaces = detect_silence(&waveform);

    log::info!("Analysis completed: {} spaces", spaces.len());
    Ok(Analysis {
        wav_path,
        waveform,
        spaces,
    })
}

fn audio_path_for(video_path: &Path, work_dir: &Path) -> Result<PathBuf> {
    let video_filename = video_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Config(format!("Invalid video filename: {:?}", video_path)))?;
    Ok(work_dir.join(format!("{}_audio.wav", video_filename)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_path_uses_video_stem() {
        let path =
            audio_path_for(Path::new("/videos/lecture.mp4"), Path::new("/tmp/work")).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/work/lecture_audio.wav"));
    }

    #[test]
    fn test_missing_video() {
        struct Unreachable;
        impl Transcoder for Unreachable {
            fn run(&self, _: &TranscodeCommand, _: Option<&mut dyn FnMut(f64)>) -> Result<()> {
                panic!("transcoder must not run");
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            work_dir: dir.path().to_path_buf(),
            compress_format: None,
            strip_bitexact: true,
        };
        let result = analyze_video(&dir.path().join("nope.mp4"), &config, &Unreachable);
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
