use std::sync::{atomic::{AtomicBool, AtomicUsize, Ordering}, Arc};

use crate::{handle::FrontendHandle, message::{MessageToFrontend, PrepareStage, ProgressEvent}};

/// Monotonic per-stage counter shared by every worker of that stage.
///
/// Workers report after their own completion, so the reported sequence is
/// `1..=total` regardless of the order in which items finish.
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    inner: Arc<ProgressTrackerInner>,
    sender: FrontendHandle,
}

#[derive(Debug)]
struct ProgressTrackerInner {
    stage: PrepareStage,
    count: AtomicUsize,
    total: AtomicUsize,
    downloaded: AtomicUsize,
    finished: AtomicBool,
    finished_with_error: AtomicBool,
}

impl ProgressTracker {
    pub fn new(stage: PrepareStage, sender: FrontendHandle) -> Self {
        sender.send(MessageToFrontend::StageChanged { stage });
        Self {
            inner: Arc::new(ProgressTrackerInner {
                stage,
                count: AtomicUsize::new(0),
                total: AtomicUsize::new(0),
                downloaded: AtomicUsize::new(0),
                finished: AtomicBool::new(false),
                finished_with_error: AtomicBool::new(false),
            }),
            sender,
        }
    }

    pub fn stage(&self) -> PrepareStage {
        self.inner.stage
    }

    pub fn get(&self) -> (usize, usize) {
        (
            self.inner.count.load(Ordering::SeqCst),
            self.inner.total.load(Ordering::SeqCst)
        )
    }

    pub fn get_float(&self) -> Option<f32> {
        let (count, total) = self.get();
        if total == 0 {
            None
        } else {
            Some((count as f32 / total as f32).clamp(0.0, 1.0))
        }
    }

    /// Items that needed a transfer, as opposed to being satisfied from disk.
    pub fn downloaded(&self) -> usize {
        self.inner.downloaded.load(Ordering::SeqCst)
    }

    pub fn set_total(&self, total: usize) {
        self.inner.total.store(total, Ordering::SeqCst);
    }

    /// Records one finished item and returns the new count.
    pub fn complete_item(&self, label: impl Into<Arc<str>>, downloaded: bool) -> usize {
        let current = self.inner.count.fetch_add(1, Ordering::SeqCst) + 1;
        if downloaded {
            self.inner.downloaded.fetch_add(1, Ordering::SeqCst);
        }
        self.sender.send(MessageToFrontend::Progress(ProgressEvent {
            stage: self.inner.stage,
            current,
            total: self.inner.total.load(Ordering::SeqCst),
            label: label.into(),
            downloaded,
        }));
        current
    }

    pub fn set_finished(&self, error: bool) {
        if error {
            self.inner.finished_with_error.store(true, Ordering::SeqCst);
        }
        self.inner.finished.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::SeqCst)
    }

    pub fn is_error(&self) -> bool {
        self.inner.finished_with_error.load(Ordering::SeqCst)
    }
}
