//! Transcoder command lines, one constructor per operation the export needs.
//!
//! Arguments are kept as separate strings and handed to the process as-is,
//! so paths never go through shell quoting.

use std::path::{Path, PathBuf};

/// A single transcoder invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeCommand {
    args: Vec<String>,
    output: PathBuf,
}

/// Formats seconds the way the transcoder expects time arguments
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds.max(0.0))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

impl TranscodeCommand {
    fn new(mut args: Vec<String>, output: &Path) -> Self {
        args.push("-y".to_string());
        args.push(path_arg(output));
        TranscodeCommand {
            args,
            output: output.to_path_buf(),
        }
    }

    /// Extracts the soundtrack of a video to 44.1kHz stereo WAV
    pub fn strip_audio(video: &Path, output: &Path) -> Self {
        let args = vec![
            "-i".to_string(),
            path_arg(video),
            "-ac".to_string(),
            "2".to_string(),
            "-ab".to_string(),
            "160k".to_string(),
            "-ar".to_string(),
            "44100".to_string(),
            "-f".to_string(),
            "wav".to_string(),
            "-vn".to_string(),
        ];
        Self::new(args, output)
    }

    /// Like [`strip_audio`](Self::strip_audio) but without metadata chunks,
    /// so the output starts with the canonical 44-byte header
    pub fn strip_audio_bitexact(video: &Path, output: &Path) -> Self {
        let mut args = vec![
            "-i".to_string(),
            path_arg(video),
            "-map_metadata".to_string(),
            "-1".to_string(),
            "-fflags".to_string(),
            "+bitexact".to_string(),
            "-flags:a".to_string(),
            "+bitexact".to_string(),
        ];
        args.extend(
            ["-ac", "2", "-ab", "160k", "-ar", "44100", "-f", "wav", "-vn"]
                .iter()
                .map(|s| s.to_string()),
        );
        Self::new(args, output)
    }

    /// Generates silence of the given length
    pub fn silence(duration_secs: f64, output: &Path) -> Self {
        let args = vec![
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!("aevalsrc=0:0::duration={}", format_seconds(duration_secs)),
            "-ab".to_string(),
            "320k".to_string(),
        ];
        Self::new(args, output)
    }

    /// Appends generated silence to the end of a clip
    pub fn append_silence(clip: &Path, silence_secs: f64, output: &Path) -> Self {
        let args = vec![
            "-i".to_string(),
            path_arg(clip),
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!("aevalsrc=0:0::duration={}", format_seconds(silence_secs)),
            "-filter_complex".to_string(),
            "[0:0][1:0]concat=n=2:v=0:a=1[out]".to_string(),
            "-map".to_string(),
            "[out]".to_string(),
        ];
        Self::new(args, output)
    }

    /// Joins audio inputs end to end, in the order given
    pub fn concat(inputs: &[PathBuf], output: &Path) -> Self {
        let mut args = Vec::with_capacity(inputs.len() * 2 + 4);
        let mut pads = String::new();
        for (i, input) in inputs.iter().enumerate() {
            args.push("-i".to_string());
            args.push(path_arg(input));
            pads.push_str(&format!("[{}:0]", i));
        }
        args.push("-filter_complex".to_string());
        args.push(format!("{}concat=n={}:v=0:a=1[out]", pads, inputs.len()));
        args.push("-map".to_string());
        args.push("[out]".to_string());
        Self::new(args, output)
    }

    /// Mixes two tracks; the result is as long as the first
    pub fn mix(first: &Path, second: &Path, output: &Path) -> Self {
        let args = vec![
            "-i".to_string(),
            path_arg(first),
            "-i".to_string(),
            path_arg(second),
            "-filter_complex".to_string(),
            "amix=inputs=2:duration=first".to_string(),
        ];
        Self::new(args, output)
    }

    /// Copies `[start, start + duration)` of the input, or everything after
    /// `start` when no duration is given
    pub fn slice(input: &Path, start_secs: f64, duration_secs: Option<f64>, output: &Path) -> Self {
        let mut args = vec![
            "-i".to_string(),
            path_arg(input),
            "-ss".to_string(),
            format_seconds(start_secs),
        ];
        if let Some(duration) = duration_secs {
            args.push("-t".to_string());
            args.push(format_seconds(duration));
        }
        args.extend(["-c", "copy", "-map", "0"].iter().map(|s| s.to_string()));
        Self::new(args, output)
    }

    /// Puts an audio track under the first stream of a video without re-encoding the video
    pub fn mux(video: &Path, audio: &Path, output: &Path) -> Self {
        let args = vec![
            "-i".to_string(),
            path_arg(video),
            "-i".to_string(),
            path_arg(audio),
            "-c:v".to_string(),
            "copy".to_string(),
            "-map".to_string(),
            "0:0".to_string(),
            "-map".to_string(),
            "1:0".to_string(),
        ];
        Self::new(args, output)
    }

    /// Re-encodes to the format implied by the output extension
    pub fn compress(input: &Path, output: &Path) -> Self {
        Self::new(vec!["-i".to_string(), path_arg(input)], output)
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Files this command reads, in argument order
    pub fn inputs(&self) -> Vec<PathBuf> {
        self.args
            .windows(2)
            .filter(|pair| pair[0] == "-i" && !pair[1].starts_with("aevalsrc="))
            .map(|pair| PathBuf::from(&pair[1]))
            .collect()
    }
}
