use super::pipeline::{ExportOutcome, ExportPipeline, ExportRequest};
use super::progress::ExportProgress;
use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::media::Transcoder;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// An export running on its own thread
pub struct ExportHandle {
    progress: Receiver<ExportProgress>,
    cancel: Arc<AtomicBool>,
    thread: JoinHandle<Result<ExportOutcome>>,
}

/// Starts an export on a background thread. Progress arrives on
/// [`ExportHandle::progress`] and the outcome from [`ExportHandle::wait`].
pub fn spawn_export(
    transcoder: Arc<dyn Transcoder>,
    config: ExportConfig,
    request: ExportRequest,
) -> Result<ExportHandle> {
    let (sender, receiver) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    let thread = thread::Builder::new()
        .name("narration-export".to_string())
        .spawn(move || {
            let pipeline = ExportPipeline::new(transcoder.as_ref(), &config).with_cancel_flag(flag);
            let mut forward = |progress: ExportProgress| {
                // The receiver may already be gone; the export still finishes
                let _ = sender.send(progress);
            };
            pipeline.export(&request, &mut forward)
        })?;

    Ok(ExportHandle {
        progress: receiver,
        cancel,
        thread,
    })
}

impl ExportHandle {
    /// Progress updates; the channel closes when the export ends
    pub fn progress(&self) -> &Receiver<ExportProgress> {
        &self.progress
    }

    /// Asks the export to stop before its next stage. Intermediate files are
    /// still removed.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Blocks until the export ends
    pub fn wait(self) -> Result<ExportOutcome> {
        match self.thread.join() {
            Ok(result) => result,
            Err(_) => Err(Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "export worker panicked",
            ))),
        }
    }
}
