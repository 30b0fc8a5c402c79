use super::header::{parse_header, Header};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Downsampled audio for display and space detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    pub header: Header,
    /// One 16-bit sample kept out of every `ratio` bytes of sample data
    pub samples: Vec<i16>,
}

/// Bytes of sample data consumed per kept sample
pub fn decimation_ratio(channels: u16) -> usize {
    if channels == 2 {
        40
    } else {
        80
    }
}

impl Waveform {
    pub fn ratio(&self) -> usize {
        decimation_ratio(self.header.channels)
    }

    /// Number of kept samples covering one second of audio
    pub fn samples_per_second(&self) -> usize {
        self.header.sample_rate as usize * self.header.block_align as usize / self.ratio()
    }

    pub fn duration_secs(&self) -> f64 {
        self.header.duration_secs()
    }
}

/// Reads a WAV file and keeps a uniformly strided subset of its samples
pub fn extract_waveform(wav_path: &Path) -> Result<Waveform> {
    log::info!("Extracting waveform from: {:?}", wav_path);

    let file = File::open(wav_path)?;
    let waveform = read_waveform(&mut BufReader::new(file))?;

    log::info!(
        "Extracted {} waveform samples for {:.2}s audio",
        waveform.samples.len(),
        waveform.duration_secs()
    );
    Ok(waveform)
}

/// Same as [`extract_waveform`] over any seekable byte stream
pub fn read_waveform<R: Read + Seek>(reader: &mut R) -> Result<Waveform> {
    let header = parse_header(reader)?;
    let ratio = decimation_ratio(header.channels);
    let skip = (ratio - 2) as u64;
    let count = header.data_size as usize / ratio;

    let available = remaining_len(reader)?;
    let mut samples = Vec::with_capacity(sample_capacity(count, available, ratio));
    let mut consumed: u64 = 0;
    let mut buf = [0u8; 2];

    for _ in 0..count {
        reader.read_exact(&mut buf).map_err(|e| truncated(e, &header, consumed))?;
        consumed += 2;
        samples.push(i16::from_le_bytes(buf));

        let skipped = io::copy(&mut reader.by_ref().take(skip), &mut io::sink())?;
        consumed += skipped;
        if skipped < skip {
            return Err(Error::TruncatedData {
                expected: header.data_size as u64,
                read: consumed,
            });
        }
    }

    Ok(Waveform { header, samples })
}

/// Declared sizes are not trusted for allocation: a truncated file can claim
/// gigabytes of data
fn sample_capacity(declared: usize, available_bytes: u64, ratio: usize) -> usize {
    let available = usize::try_from(available_bytes / ratio as u64).unwrap_or(usize::MAX);
    declared.min(available)
}

fn remaining_len<R: Seek>(reader: &mut R) -> io::Result<u64> {
    let position = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(position))?;
    Ok(end.saturating_sub(position))
}

fn truncated(e: io::Error, header: &Header, consumed: u64) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::TruncatedData {
            expected: header.data_size as u64,
            read: consumed,
        }
    } else {
        Error::Io(e)
    }
}
