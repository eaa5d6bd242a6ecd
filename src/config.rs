//! Run configuration.
//!
//! [`AnalyzeOptions`] is a builder that carries the quality tag, sampling
//! policy, output format and operational settings through
//! [`Analyzer::analyze`](crate::Analyzer::analyze).
//!
//! # Example
//!
//! ```
//! use framelabel::{AnalyzeOptions, LabelFormat, SamplingPolicy};
//!
//! let options = AnalyzeOptions::new()
//!     .with_quality("360p")
//!     .with_sampling(SamplingPolicy::new(30, 8).with_start_frame(120))
//!     .with_format(LabelFormat::List);
//! assert_eq!(options.quality(), "360p");
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    aggregate::LabelFormat,
    progress::{NoOpProgress, ProgressCallback},
    sampler::{DEFAULT_JPEG_QUALITY, SamplingPolicy},
};

/// Quality tag requested when none is given.
pub const DEFAULT_QUALITY: &str = "240p";

/// Settings for one analysis run.
#[derive(Clone)]
pub struct AnalyzeOptions {
    pub(crate) quality: String,
    pub(crate) sampling: SamplingPolicy,
    pub(crate) format: LabelFormat,
    /// Parent of the per-run scratch directory. `None` uses the system temp dir.
    pub(crate) scratch_root: Option<PathBuf>,
    pub(crate) jpeg_quality: u8,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for AnalyzeOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AnalyzeOptions")
            .field("quality", &self.quality)
            .field("sampling", &self.sampling)
            .field("format", &self.format)
            .field("scratch_root", &self.scratch_root)
            .field("jpeg_quality", &self.jpeg_quality)
            .finish_non_exhaustive()
    }
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzeOptions {
    /// Defaults: quality `240p`, every 60th frame, at most 4 frames, from
    /// frame 0, `set` output.
    pub fn new() -> Self {
        Self {
            quality: DEFAULT_QUALITY.to_string(),
            sampling: SamplingPolicy::default(),
            format: LabelFormat::Set,
            scratch_root: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Quality tag passed to the resolver.
    #[must_use]
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    /// Which frames to capture.
    #[must_use]
    pub fn with_sampling(mut self, sampling: SamplingPolicy) -> Self {
        self.sampling = sampling;
        self
    }

    /// Shape of the returned report.
    #[must_use]
    pub fn with_format(mut self, format: LabelFormat) -> Self {
        self.format = format;
        self
    }

    /// Create per-run scratch directories under `root`.
    #[must_use]
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// JPEG quality of captured frames (1–100).
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Attach a progress callback for the sampling and labeling stages.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Requested quality tag.
    pub fn quality(&self) -> &str {
        &self.quality
    }

    /// Sampling policy.
    pub fn sampling(&self) -> SamplingPolicy {
        self.sampling
    }

    /// Report shape.
    pub fn format(&self) -> LabelFormat {
        self.format
    }

    /// Configured scratch root, if any.
    pub fn scratch_root(&self) -> Option<&Path> {
        self.scratch_root.as_deref()
    }

    /// JPEG quality of captured frames.
    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }
}
