pub mod actions;

pub use actions::{analyze_video, Analysis};
