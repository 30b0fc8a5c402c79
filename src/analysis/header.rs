use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Seek};

/// `audioFormat` value for uncompressed PCM
pub const PCM_FORMAT: u16 = 1;

/// Size in bytes of a RIFF/WAVE header whose format chunk is exactly 16 bytes
pub const DEFAULT_HEADER_SIZE: u64 = 44;

const PCM_FMT_CHUNK_SIZE: u32 = 16;

/// Format chunk of a RIFF/WAVE container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// RIFF chunk size as declared (file length minus 8)
    pub file_size: u32,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Declared length of the `data` chunk in bytes
    pub data_size: u32,
}

impl Header {
    /// Length of the sample data in seconds
    pub fn duration_secs(&self) -> f64 {
        let bits_per_second =
            self.sample_rate as f64 * self.bits_per_sample as f64 * self.channels as f64;
        if bits_per_second == 0.0 {
            return 0.0;
        }
        (self.data_size as f64 * 8.0) / bits_per_second
    }
}

/// Parses the header of a RIFF/WAVE container and leaves the reader at the
/// first byte of sample data.
///
/// Only the canonical layout is accepted: `RIFF`, `WAVE`, `fmt ` and `data`
/// must follow each other with no other chunks in between, and the format
/// must be PCM. Extra format bytes announced by a format chunk larger than 16
/// bytes are skipped.
pub fn parse_header<R: Read + Seek>(reader: &mut R) -> Result<Header> {
    let start = reader.stream_position()?;

    expect_tag(reader, b"RIFF")?;
    let file_size = read_u32(reader)?;
    expect_tag(reader, b"WAVE")?;
    expect_tag(reader, b"fmt ")?;
    let fmt_chunk_size = read_u32(reader)?;

    let audio_format = read_u16(reader)?;
    if audio_format != PCM_FORMAT {
        return Err(Error::MalformedContainer(format!(
            "audio format {} is not PCM",
            audio_format
        )));
    }

    let channels = read_u16(reader)?;
    let sample_rate = read_u32(reader)?;
    let byte_rate = read_u32(reader)?;
    let block_align = read_u16(reader)?;
    let bits_per_sample = read_u16(reader)?;

    let extra_fmt_bytes = fmt_chunk_size as i64 - PCM_FMT_CHUNK_SIZE as i64;
    if extra_fmt_bytes > 0 {
        let extra = extra_fmt_bytes as u64;
        let skipped = io::copy(&mut reader.by_ref().take(extra), &mut io::sink())?;
        if skipped < extra {
            return Err(Error::MalformedContainer(
                "stream ended inside the format chunk".to_string(),
            ));
        }
    }

    expect_tag(reader, b"data")?;
    let data_size = read_u32(reader)?;

    let position = reader.stream_position()? as i64 - start as i64;
    let expected = DEFAULT_HEADER_SIZE as i64 + extra_fmt_bytes;
    if position != expected {
        return Err(Error::MalformedContainer(format!(
            "header ends at byte {}, expected {} for a {}-byte format chunk",
            position, expected, fmt_chunk_size
        )));
    }

    let header = Header {
        file_size,
        channels,
        sample_rate,
        byte_rate,
        block_align,
        bits_per_sample,
        data_size,
    };
    log::debug!("Parsed WAVE header: {:?}", header);
    Ok(header)
}

fn read_array<R: Read, const N: usize>(reader: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::MalformedContainer("stream ended inside the header".to_string())
        } else {
            Error::Io(e)
        }
    })?;
    Ok(buf)
}

fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    read_array::<R, 2>(reader).map(u16::from_le_bytes)
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    read_array::<R, 4>(reader).map(u32::from_le_bytes)
}

fn expect_tag<R: Read>(reader: &mut R, tag: &[u8; 4]) -> Result<()> {
    let found = read_array::<R, 4>(reader)?;
    if &found != tag {
        return Err(Error::MalformedContainer(format!(
            "expected chunk tag {:?}, found {:?}",
            String::from_utf8_lossy(tag),
            String::from_utf8_lossy(&found)
        )));
    }
    Ok(())
}
