//! Label aggregation over captured frames.
//!
//! [`LabelAggregator`] walks the frames in a [`ScratchDirectory`] in stream
//! order, asks a [`LabelDetector`] for each frame's labels, and folds them
//! into a [`LabelReport`]. The scratch directory is consumed and removed.
//!
//! # Example
//!
//! ```no_run
//! use framelabel::{
//!     CloudVisionClient, LabelAggregator, LabelFormat, LabelReport, ScratchDirectory,
//!     VisionConfig,
//! };
//!
//! let client = CloudVisionClient::new(VisionConfig::from_env()?)?;
//! let scratch = ScratchDirectory::create(None)?;
//! // ... sample frames into `scratch` ...
//! match LabelAggregator::new(&client, LabelFormat::List).aggregate(scratch)? {
//!     LabelReport::List(frames) => {
//!         for frame in frames {
//!             println!("{}: {}", frame.frame, frame.labels.join(", "));
//!         }
//!     }
//!     LabelReport::Set(labels) => println!("{labels:?}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
    fs,
    str::FromStr,
    sync::Arc,
};

use serde::Serialize;

use crate::{
    error::LabelError,
    progress::{NoOpProgress, ProgressCallback, ProgressTracker, Stage},
    scratch::ScratchDirectory,
    vision::LabelDetector,
};

/// Shape of the aggregated result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LabelFormat {
    /// Deduplicated labels across all frames.
    #[default]
    Set,
    /// Each frame paired with its own labels, in stream order.
    List,
}

impl Display for LabelFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LabelFormat::Set => f.write_str("set"),
            LabelFormat::List => f.write_str("list"),
        }
    }
}

impl FromStr for LabelFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "set" => Ok(LabelFormat::Set),
            "list" => Ok(LabelFormat::List),
            other => Err(format!("unknown label format: {other} (expected set or list)")),
        }
    }
}

/// Labels detected in one captured frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledFrame {
    /// File name of the captured frame, e.g. `frame_000060.jpg`.
    pub frame: String,
    /// Stream index of the frame.
    pub index: u64,
    /// Labels in the order the detector returned them.
    pub labels: Vec<String>,
}

/// The aggregated answer of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "format", content = "labels", rename_all = "lowercase")]
pub enum LabelReport {
    /// Union of all labels; frame provenance is discarded.
    Set(BTreeSet<String>),
    /// One entry per captured frame.
    List(Vec<LabeledFrame>),
}

impl LabelReport {
    /// An empty report of the given shape.
    pub fn empty(format: LabelFormat) -> Self {
        match format {
            LabelFormat::Set => LabelReport::Set(BTreeSet::new()),
            LabelFormat::List => LabelReport::List(Vec::new()),
        }
    }

    /// Which shape this report has.
    pub fn format(&self) -> LabelFormat {
        match self {
            LabelReport::Set(_) => LabelFormat::Set,
            LabelReport::List(_) => LabelFormat::List,
        }
    }

    /// Distinct labels in a set report, or frames in a list report.
    pub fn len(&self) -> usize {
        match self {
            LabelReport::Set(labels) => labels.len(),
            LabelReport::List(frames) => frames.len(),
        }
    }

    /// Whether the report carries nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Labels the frames of a scratch directory.
pub struct LabelAggregator<D> {
    detector: D,
    format: LabelFormat,
    progress: Arc<dyn ProgressCallback>,
}

impl<D: LabelDetector> LabelAggregator<D> {
    /// Aggregate into `format` using `detector`.
    pub fn new(detector: D, format: LabelFormat) -> Self {
        Self {
            detector,
            format,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Report each labeled frame to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Label every frame in `scratch`, then delete the directory.
    ///
    /// The first detection failure aborts the whole aggregation; no partial
    /// report is returned. The directory is removed in both cases.
    pub fn aggregate(&self, scratch: ScratchDirectory) -> Result<LabelReport, LabelError> {
        let report = self.label_frames(&scratch);
        let removed = scratch.remove();

        let report = report?;
        removed?;
        Ok(report)
    }

    fn label_frames(&self, scratch: &ScratchDirectory) -> Result<LabelReport, LabelError> {
        let files = scratch.frame_files()?;
        let mut tracker = ProgressTracker::new(
            Arc::clone(&self.progress),
            Stage::LabelDetection,
            Some(files.len() as u64),
        );
        let mut report = LabelReport::empty(self.format);

        for file in files {
            let bytes = fs::read(&file.path)?;
            let labels = self.detector.detect_labels(&bytes)?;
            log::debug!("{}: {} label(s)", file.name, labels.len());

            match &mut report {
                LabelReport::Set(set) => set.extend(labels),
                LabelReport::List(frames) => frames.push(LabeledFrame {
                    frame: file.name,
                    index: file.index,
                    labels,
                }),
            }
            tracker.advance(Some(file.index));
        }

        log::info!("Aggregated {} entries in {} format", report.len(), self.format);
        Ok(report)
    }
}
