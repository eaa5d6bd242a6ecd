//! Progress reporting for the sampling and labeling stages.
//!
//! Attach a [`ProgressCallback`] through
//! [`AnalyzeOptions::with_progress`](crate::AnalyzeOptions::with_progress)
//! to observe how many frames have been captured and labeled.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framelabel::{AnalyzeOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("[{:?}] {} done", info.stage, info.current);
//!     }
//! }
//!
//! let options = AnalyzeOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// The pipeline stage a progress report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Stage {
    /// Capturing frames from the stream into the scratch directory.
    FrameSampling,
    /// Submitting captured frames to the label-detection service.
    LabelDetection,
}

/// A snapshot of pipeline progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Which stage is reporting.
    pub stage: Stage,
    /// Items (captured or labeled frames) completed so far.
    pub current: u64,
    /// Upper bound on items for this stage, if known.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the stage started.
    pub elapsed: Duration,
    /// Stream index of the frame just processed.
    pub current_frame: Option<u64>,
}

/// Receives progress updates during a run.
///
/// Callbacks observe the run but cannot stop it.
pub trait ProgressCallback: Send + Sync {
    /// Called after every captured or labeled frame.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks timing for one stage and forwards snapshots to the callback.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    stage: Stage,
    total: Option<u64>,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        stage: Stage,
        total: Option<u64>,
    ) -> Self {
        Self {
            callback,
            stage,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one completed item and report it.
    pub(crate) fn advance(&mut self, frame_index: Option<u64>) {
        self.current += 1;
        self.report(frame_index);
    }

    fn report(&self, frame_index: Option<u64>) {
        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.current as f32 / total as f32) * 100.0);

        let info = ProgressInfo {
            stage: self.stage,
            current: self.current,
            total: self.total,
            percentage,
            elapsed: self.start_time.elapsed(),
            current_frame: frame_index,
        };

        self.callback.on_progress(&info);
    }
}
