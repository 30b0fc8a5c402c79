use super::command::TranscodeCommand;
use super::progress::{DiagnosticLines, ProgressParser};
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Diagnostic lines kept for the error message of a failed run
const STDERR_TAIL_LINES: usize = 20;

/// Runs transcoder commands synchronously
pub trait Transcoder: Send + Sync {
    /// Runs `command` to completion. When `progress` is given it receives the
    /// transcoder's own completion percentage (0-100) each time it changes.
    fn run(&self, command: &TranscodeCommand, progress: Option<&mut dyn FnMut(f64)>) -> Result<()>;
}

/// The FFmpeg executable
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    program: PathBuf,
}

impl Ffmpeg {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Ffmpeg {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Checks that the executable can be launched
    pub fn check_available(&self) -> Result<()> {
        let output = Command::new(&self.program)
            .arg("-version")
            .output()
            .map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            return Err(self.failed(output.status.code(), &String::from_utf8_lossy(&output.stderr)));
        }
        Ok(())
    }

    fn spawn_error(&self, e: io::Error) -> Error {
        if e.kind() == io::ErrorKind::NotFound {
            Error::TranscoderNotFound(self.program.clone())
        } else {
            Error::Io(e)
        }
    }

    fn failed(&self, exit_code: Option<i32>, stderr: &str) -> Error {
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        Error::TranscodeFailed {
            program: self.program.clone(),
            exit_code,
            stderr: tail,
        }
    }

    fn run_quiet(&self, command: &TranscodeCommand) -> Result<()> {
        let output = Command::new(&self.program)
            .args(command.args())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(self.failed(output.status.code(), &String::from_utf8_lossy(&output.stderr)));
        }
        Ok(())
    }

    fn run_with_progress(
        &self,
        command: &TranscodeCommand,
        progress: &mut dyn FnMut(f64),
    ) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut parser = ProgressParser::new();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        if let Some(stderr) = child.stderr.take() {
            for line in DiagnosticLines::new(BufReader::new(stderr)) {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::warn!("Stopped reading transcoder output: {}", e);
                        break;
                    }
                };

                if let Some(percentage) = parser.feed(&line) {
                    progress(percentage);
                }

                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }

        let status = child.wait()?;
        if !status.success() {
            let stderr = Vec::from(tail).join("\n");
            return Err(self.failed(status.code(), &stderr));
        }
        Ok(())
    }
}

impl Transcoder for Ffmpeg {
    fn run(&self, command: &TranscodeCommand, progress: Option<&mut dyn FnMut(f64)>) -> Result<()> {
        log::debug!("Running {:?} {}", self.program, command.args().join(" "));

        let result = match progress {
            Some(progress) => self.run_with_progress(command, progress),
            None => self.run_quiet(command),
        };
        result?;

        log::debug!("Transcoder wrote {:?}", command.output());
        Ok(())
    }
}
