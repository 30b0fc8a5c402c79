pub mod pipeline;
pub mod progress;
pub mod workspace;
pub mod worker;

pub use pipeline::{plan_stages, ExportKind, ExportOutcome, ExportPipeline, ExportRequest};
pub use progress::{ExportProgress, ExportStage, ProgressTracker};
pub use worker::{spawn_export, ExportHandle};
