use crate::config::ExportConfig;
use crate::editor::analyze_video;
use crate::error::Result;
use crate::export::{spawn_export, ExportKind, ExportOutcome, ExportRequest};
use crate::media::{Ffmpeg, Transcoder};
use crate::timeline::load_descriptions;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "narration-export", version, about = "Find speech gaps and export narrated video")]
pub(crate) struct Cli {
    /// JSON config file
    #[arg(long, global = true, env = "NARRATION_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Detect spaces between speech in a video's soundtrack
    Analyze {
        video: PathBuf,
        /// Write JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Include the downsampled waveform in the output
        #[arg(long)]
        waveform: bool,
    },
    /// Mix narration clips into a video or an audio file
    Export {
        video: PathBuf,
        /// JSON list of descriptions
        #[arg(long)]
        descriptions: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Produce audio only, with extended descriptions spliced in
        #[arg(long)]
        audio_only: bool,
        /// Compress the audio to this format, e.g. mp3
        #[arg(long)]
        compress: Option<String>,
    },
}

pub(crate) fn execute(cli: Cli) -> Result<()> {
    let mut config = match cli.config {
        Some(ref path) => ExportConfig::load(path)?,
        None => ExportConfig::default(),
    };

    match cli.command {
        Commands::Analyze {
            video,
            output,
            waveform,
        } => {
            let ffmpeg = Ffmpeg::new(&config.ffmpeg_path);
            ffmpeg.check_available()?;
            let analysis = analyze_video(&video, &config, &ffmpeg)?;

            let json = if waveform {
                serde_json::to_string_pretty(&analysis)?
            } else {
                serde_json::to_string_pretty(&analysis.spaces)?
            };
            match output {
                Some(path) => {
                    fs::write(&path, json)?;
                    log::info!("Wrote analysis to {:?}", path);
                }
                None => println!("{}", json),
            }
        }
        Commands::Export {
            video,
            descriptions,
            output,
            audio_only,
            compress,
        } => {
            if compress.is_some() {
                config.compress_format = compress;
            }
            config.validate()?;

            let kind = if audio_only {
                ExportKind::AudioWithExtendedDescriptions
            } else {
                ExportKind::VideoWithDescriptions
            };
            let request = ExportRequest {
                kind,
                video_path: video,
                output_path: output,
                descriptions: load_descriptions(&descriptions)?,
            };

            let ffmpeg = Ffmpeg::new(&config.ffmpeg_path);
            ffmpeg.check_available()?;
            let transcoder: Arc<dyn Transcoder> = Arc::new(ffmpeg);

            let handle = spawn_export(transcoder, config, request)?;
            for progress in handle.progress().iter() {
                log::info!("{:?}: {:.1}%", progress.stage, progress.percentage);
            }

            match handle.wait()? {
                ExportOutcome::Exported(path) => println!("{}", path.display()),
                ExportOutcome::NothingToExport => log::warn!("No descriptions to export"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export_command() {
        let cli = Cli::try_parse_from([
            "narration-export",
            "export",
            "movie.mp4",
            "--descriptions",
            "descriptions.json",
            "--output",
            "described.mp4",
            "--compress",
            "mp3",
        ])
        .unwrap();

        match cli.command {
            Commands::Export {
                video,
                audio_only,
                compress,
                ..
            } => {
                assert_eq!(video, PathBuf::from("movie.mp4"));
                assert!(!audio_only);
                assert_eq!(compress.as_deref(), Some("mp3"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_export_requires_descriptions() {
        let result =
            Cli::try_parse_from(["narration-export", "export", "movie.mp4", "--output", "o.mp4"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from([
            "narration-export",
            "analyze",
            "movie.mp4",
            "--config",
            "settings.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("settings.json")));
    }
}
