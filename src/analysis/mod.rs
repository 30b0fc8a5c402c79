pub mod header;
pub mod silence_detection;
pub mod waveform;

pub use header::{parse_header, Header};
pub use silence_detection::detect_silence;
pub use waveform::{extract_waveform, read_waveform, Waveform};
