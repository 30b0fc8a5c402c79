// Declare modules
pub mod analysis;
mod cli;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod media;
pub mod timeline;

use clap::Parser;
use std::process::ExitCode;

pub use analysis::{detect_silence, extract_waveform, parse_header, Header, Waveform};
pub use config::ExportConfig;
pub use editor::{analyze_video, Analysis};
pub use error::{Error, Result};
pub use export::{
    spawn_export, ExportHandle, ExportKind, ExportOutcome, ExportPipeline, ExportProgress,
    ExportRequest, ExportStage,
};
pub use media::{Ffmpeg, TranscodeCommand, Transcoder};
pub use timeline::{Description, Space};

/// Command-line entry point
pub fn run() -> ExitCode {
    // Initialize logger
    env_logger::init();

    log::info!("Starting narration-export v{}", env!("CARGO_PKG_VERSION"));

    let cli = cli::Cli::parse();
    match cli::execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
