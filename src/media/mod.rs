pub mod command;
pub mod progress;
pub mod transcoder;

pub use command::TranscodeCommand;
pub use progress::ProgressParser;
pub use transcoder::{Ffmpeg, Transcoder};
