use narration_export_lib::{
    detect_silence, extract_waveform, spawn_export, Description, Error, ExportConfig, ExportKind,
    ExportOutcome, ExportProgress, ExportRequest, ExportStage, TranscodeCommand, Transcoder,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const SAMPLE_RATE: u32 = 44100;

/// Stereo 16-bit WAV: loud seconds carry a 2205 Hz square wave, quiet seconds are zero
fn write_stereo_wav(path: &Path, pattern: &[bool]) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &loud in pattern {
        for frame in 0..SAMPLE_RATE {
            let sample: i16 = if !loud {
                0
            } else if (frame / 10) % 2 == 0 {
                12000
            } else {
                -12000
            };
            writer.write_sample(sample).unwrap();
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
}

#[test]
fn test_spaces_found_in_recorded_wav() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("speech.wav");
    write_stereo_wav(&path, &[true, true, true, false, false, true, true]);

    let waveform = extract_waveform(&path).unwrap();
    assert_eq!(waveform.header.channels, 2);
    assert_eq!(waveform.samples_per_second(), 4410);
    assert_eq!(waveform.samples.len(), 7 * 4410);

    let spaces = detect_silence(&waveform);
    assert_eq!(spaces.len(), 1);
    assert_eq!((spaces[0].start_ms, spaces[0].end_ms), (3000.0, 5000.0));
}

#[test]
fn test_silence_running_to_the_end_is_not_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fade_out.wav");
    write_stereo_wav(&path, &[true, false, true, true, false, false]);

    let spaces = detect_silence(&extract_waveform(&path).unwrap());
    let ranges: Vec<(f64, f64)> = spaces.iter().map(|s| (s.start_ms, s.end_ms)).collect();
    assert_eq!(ranges, vec![(1000.0, 2000.0)]);
}

#[test]
fn test_non_wav_input_is_malformed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("not_audio.wav");
    fs::write(&path, vec![0u8; 128]).unwrap();

    assert!(matches!(
        extract_waveform(&path),
        Err(Error::MalformedContainer(_))
    ));
}

/// Creates every output file and reports halfway and full progress
#[derive(Default)]
struct FakeFfmpeg {
    outputs: Mutex<Vec<PathBuf>>,
}

impl Transcoder for FakeFfmpeg {
    fn run(
        &self,
        command: &TranscodeCommand,
        progress: Option<&mut dyn FnMut(f64)>,
    ) -> narration_export_lib::Result<()> {
        fs::write(command.output(), b"media")?;
        self.outputs.lock().unwrap().push(command.output().to_path_buf());
        if let Some(progress) = progress {
            progress(50.0);
            progress(100.0);
        }
        Ok(())
    }
}

fn export_fixture(dir: &TempDir) -> (ExportConfig, Vec<Description>) {
    let config = ExportConfig {
        ffmpeg_path: PathBuf::from("ffmpeg"),
        work_dir: dir.path().join("work"),
        compress_format: Some("mp3".to_string()),
        strip_bitexact: true,
    };
    fs::write(dir.path().join("movie.mp4"), b"video").unwrap();

    let mut descriptions = Vec::new();
    for (name, start, extended) in [("one.wav", 2000.0, false), ("two.wav", 6000.0, true)] {
        let path = dir.path().join(name);
        write_stereo_wav(&path, &[true]);
        let description = Description::new(path, 0.0, 1000.0, start);
        descriptions.push(if extended { description.extended() } else { description });
    }
    (config, descriptions)
}

#[test]
fn test_background_export_reports_progress_to_100() {
    let dir = TempDir::new().unwrap();
    let (config, descriptions) = export_fixture(&dir);
    let work_dir = config.work_dir.clone();
    let request = ExportRequest {
        kind: ExportKind::VideoWithDescriptions,
        video_path: dir.path().join("movie.mp4"),
        output_path: dir.path().join("described.mp4"),
        descriptions,
    };

    let fake = Arc::new(FakeFfmpeg::default());
    let handle = spawn_export(fake.clone(), config, request).unwrap();
    let events: Vec<ExportProgress> = handle.progress().iter().collect();
    let outcome = handle.wait().unwrap();

    assert_eq!(outcome, ExportOutcome::Exported(dir.path().join("described.mp4")));
    assert!(dir.path().join("described.mp4").exists());

    for pair in events.windows(2) {
        assert!(pair[0].percentage <= pair[1].percentage);
    }
    let stages: Vec<ExportStage> = events.iter().map(|e| e.stage).collect();
    assert_eq!(stages.first(), Some(&ExportStage::BuildDescriptionTrack));
    assert!(stages.contains(&ExportStage::CompressAudio));
    assert_eq!(stages.last(), Some(&ExportStage::Cleanup));
    assert_eq!(events.last().unwrap().percentage, 100.0);

    // Intermediates are gone once the export returns
    assert_eq!(fs::read_dir(&work_dir).unwrap().count(), 0);
}

#[test]
fn test_background_audio_export_with_extended_description() {
    let dir = TempDir::new().unwrap();
    let (config, descriptions) = export_fixture(&dir);
    let request = ExportRequest {
        kind: ExportKind::AudioWithExtendedDescriptions,
        video_path: dir.path().join("movie.mp4"),
        output_path: dir.path().join("described.mp3"),
        descriptions,
    };

    let fake = Arc::new(FakeFfmpeg::default());
    let handle = spawn_export(fake.clone(), config, request).unwrap();
    let events: Vec<ExportProgress> = handle.progress().iter().collect();
    handle.wait().unwrap();

    let last = events.last().unwrap();
    assert_eq!(last.stage, ExportStage::CompressAudio);
    assert_eq!(last.percentage, 100.0);
    assert_eq!(
        fake.outputs.lock().unwrap().last(),
        Some(&dir.path().join("described.mp3"))
    );
}

/// Blocks every run until the test opens the gate
struct GatedFfmpeg {
    gate: Mutex<Receiver<()>>,
}

impl Transcoder for GatedFfmpeg {
    fn run(
        &self,
        command: &TranscodeCommand,
        _progress: Option<&mut dyn FnMut(f64)>,
    ) -> narration_export_lib::Result<()> {
        // Returns immediately once the sender is dropped
        let _ = self.gate.lock().unwrap().recv();
        fs::write(command.output(), b"media")?;
        Ok(())
    }
}

#[test]
fn test_cancelled_background_export() {
    let dir = TempDir::new().unwrap();
    let (config, descriptions) = export_fixture(&dir);
    let work_dir = config.work_dir.clone();
    let request = ExportRequest {
        kind: ExportKind::VideoWithDescriptions,
        video_path: dir.path().join("movie.mp4"),
        output_path: dir.path().join("described.mp4"),
        descriptions,
    };

    let (open, gate) = mpsc::channel();
    let fake = Arc::new(GatedFfmpeg {
        gate: Mutex::new(gate),
    });
    let handle = spawn_export(fake, config, request).unwrap();

    handle.cancel();
    drop(open);

    assert!(matches!(handle.wait(), Err(Error::Cancelled)));
    assert!(!dir.path().join("described.mp4").exists());
    assert_eq!(fs::read_dir(&work_dir).unwrap().count(), 0);
}
