//! The resolve → sample → aggregate pipeline.
//!
//! [`Analyzer`] composes a [`Resolver`], a [`StreamOpener`] and a
//! [`LabelDetector`]. A run either produces a full [`LabelReport`] or an
//! empty one; partial results are never surfaced.
//!
//! # Example
//!
//! ```no_run
//! use framelabel::{AnalyzeOptions, Analyzer, LabelFormat};
//!
//! let analyzer = Analyzer::from_env(AnalyzeOptions::new().with_format(LabelFormat::Set))?;
//! let report = analyzer.analyze("dQw4w9WgXcQ")?;
//! println!("{report:?}");
//! # Ok::<(), framelabel::LabelError>(())
//! ```

use crate::{
    aggregate::{LabelAggregator, LabelReport},
    config::AnalyzeOptions,
    error::LabelError,
    resolver::{Resolver, YtDlpResolver},
    sampler::FrameSampler,
    scratch::ScratchDirectory,
    stream::{FfmpegStreamOpener, StreamOpener},
    vision::{CloudVisionClient, LabelDetector, VisionConfig},
};

/// Runs the full pipeline for one content identifier at a time.
pub struct Analyzer<R, O, D> {
    resolver: R,
    opener: O,
    detector: D,
    options: AnalyzeOptions,
}

impl Analyzer<YtDlpResolver, FfmpegStreamOpener, CloudVisionClient> {
    /// The production pipeline: `yt-dlp`, FFmpeg and Cloud Vision, each
    /// configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::MissingCredentials`] when no Vision credential
    /// is configured.
    pub fn from_env(options: AnalyzeOptions) -> Result<Self, LabelError> {
        let detector = CloudVisionClient::new(VisionConfig::from_env()?)?;
        Ok(Self::new(
            YtDlpResolver::from_env(),
            FfmpegStreamOpener,
            detector,
            options,
        ))
    }
}

impl<R, O, D> Analyzer<R, O, D>
where
    R: Resolver,
    O: StreamOpener,
    D: LabelDetector,
{
    /// Compose the pipeline from its collaborators.
    pub fn new(resolver: R, opener: O, detector: D, options: AnalyzeOptions) -> Self {
        Self {
            resolver,
            opener,
            detector,
            options,
        }
    }

    /// The options every run uses.
    pub fn options(&self) -> &AnalyzeOptions {
        &self.options
    }

    /// Resolve, sample and label `content_id`.
    ///
    /// Returns an empty report when no stream exists at the requested
    /// quality, when the stream cannot be opened, or when no frame was
    /// captured. No scratch directory is created unless resolution
    /// succeeds, and none survives the call.
    ///
    /// # Errors
    ///
    /// Resolver tool failures, label-detection failures and I/O errors.
    pub fn analyze(&self, content_id: &str) -> Result<LabelReport, LabelError> {
        let options = &self.options;
        let empty = || LabelReport::empty(options.format);

        let Some(url) = self.resolver.resolve(content_id, &options.quality)? else {
            log::warn!(
                "No stream for {content_id} at quality {}; nothing to label",
                options.quality
            );
            return Ok(empty());
        };

        let mut source = match self.opener.open(&url) {
            Ok(source) => source,
            Err(error) if error.yields_empty_report() => {
                log::warn!("Video not opened: {error}");
                return Ok(empty());
            }
            Err(error) => return Err(error),
        };

        let scratch = ScratchDirectory::create(options.scratch_root.as_deref())?;
        let sampler = FrameSampler::new(options.sampling)
            .with_jpeg_quality(options.jpeg_quality)
            .with_progress(options.progress.clone());

        match sampler.sample(&mut source, &scratch) {
            Ok(_) => {}
            Err(error) if error.yields_empty_report() => {
                log::warn!("No frame captured: {error}");
                scratch.remove()?;
                return Ok(empty());
            }
            Err(error) => return Err(error),
        }
        drop(source);

        LabelAggregator::new(&self.detector, options.format)
            .with_progress(options.progress.clone())
            .aggregate(scratch)
    }
}
