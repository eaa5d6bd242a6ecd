//! Frame sampling.
//!
//! [`SamplingPolicy`] decides which stream indices are captured;
//! [`FrameSampler`] applies it to a [`FrameSource`] and writes each captured
//! frame as a JPEG into a [`ScratchDirectory`].
//!
//! # Example
//!
//! ```no_run
//! use framelabel::{
//!     FfmpegStreamOpener, FrameSampler, SamplingPolicy, ScratchDirectory, StreamOpener,
//! };
//!
//! let mut source = FfmpegStreamOpener.open("input.mp4")?;
//! let scratch = ScratchDirectory::create(None)?;
//! let policy = SamplingPolicy::new(60, 4).with_start_frame(30);
//!
//! let samples = FrameSampler::new(policy).sample(&mut source, &scratch)?;
//! for sample in &samples {
//!     println!("frame {} -> {}", sample.index, sample.path.display());
//! }
//! # Ok::<(), framelabel::LabelError>(())
//! ```

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use image::{DynamicImage, codecs::jpeg::JpegEncoder};

use crate::{
    error::LabelError,
    progress::{NoOpProgress, ProgressCallback, ProgressTracker, Stage},
    scratch::ScratchDirectory,
    stream::FrameSource,
};

/// Default JPEG quality for captured frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Which frames of a stream to capture.
///
/// After discarding `start_frame` leading frames, every `skip_frames`-th
/// frame is captured, starting with the first one, until `max_frames` have
/// been captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPolicy {
    skip_frames: u64,
    max_frames: u64,
    start_frame: u64,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self::new(60, 4)
    }
}

impl SamplingPolicy {
    /// Capture every `skip_frames`-th frame, at most `max_frames` of them.
    ///
    /// # Panics
    ///
    /// Panics if either argument is zero.
    pub fn new(skip_frames: u64, max_frames: u64) -> Self {
        assert!(skip_frames > 0, "skip_frames must be greater than zero");
        assert!(max_frames > 0, "max_frames must be greater than zero");
        Self {
            skip_frames,
            max_frames,
            start_frame: 0,
        }
    }

    /// Discard the first `start_frame` frames before sampling.
    #[must_use]
    pub fn with_start_frame(mut self, start_frame: u64) -> Self {
        self.start_frame = start_frame;
        self
    }

    /// Interval between captured frames.
    pub fn skip_frames(&self) -> u64 {
        self.skip_frames
    }

    /// Upper bound on captured frames.
    pub fn max_frames(&self) -> u64 {
        self.max_frames
    }

    /// Number of leading frames discarded.
    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    /// Whether the frame at `stream_index` falls on the sampling grid.
    ///
    /// Ignores `max_frames`; the sampler enforces that bound while reading.
    pub fn captures(&self, stream_index: u64) -> bool {
        stream_index >= self.start_frame
            && (stream_index - self.start_frame) % self.skip_frames == 0
    }

    /// How many frames a stream of `stream_len` frames yields.
    pub fn expected_captures(&self, stream_len: u64) -> u64 {
        if stream_len <= self.start_frame {
            return 0;
        }
        let on_grid = (stream_len - self.start_frame - 1) / self.skip_frames + 1;
        on_grid.min(self.max_frames)
    }
}

/// A frame captured into the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSample {
    /// Absolute index of the frame in the source stream.
    pub index: u64,
    /// Where the encoded JPEG was written.
    pub path: PathBuf,
}

impl FrameSample {
    /// Read the encoded JPEG bytes back from disk.
    pub fn read_bytes(&self) -> Result<Vec<u8>, LabelError> {
        Ok(fs::read(&self.path)?)
    }
}

/// Applies a [`SamplingPolicy`] to a frame stream.
pub struct FrameSampler {
    policy: SamplingPolicy,
    jpeg_quality: u8,
    progress: Arc<dyn ProgressCallback>,
}

impl FrameSampler {
    /// Create a sampler with the default JPEG quality and no progress callback.
    pub fn new(policy: SamplingPolicy) -> Self {
        Self {
            policy,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// JPEG quality for written frames, clamped to 1–100.
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Report each captured frame to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Read `source` and persist every frame selected by the policy.
    ///
    /// Frames off the sampling grid are skipped without conversion. Stops
    /// as soon as `max_frames` frames are written; the remainder of the
    /// stream is never decoded.
    ///
    /// # Errors
    ///
    /// - [`LabelError::NoFramesCaptured`] if the stream ended before any
    ///   frame was selected.
    /// - Decode, image and I/O errors from reading or writing frames.
    pub fn sample<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
        scratch: &ScratchDirectory,
    ) -> Result<Vec<FrameSample>, LabelError> {
        let policy = self.policy;
        let mut tracker = ProgressTracker::new(
            Arc::clone(&self.progress),
            Stage::FrameSampling,
            Some(policy.max_frames),
        );
        let mut samples = Vec::new();
        let mut stream_index = 0_u64;

        while (samples.len() as u64) < policy.max_frames {
            let index = stream_index;
            if !policy.captures(index) {
                if !source.skip_frame()? {
                    break;
                }
                stream_index += 1;
                continue;
            }

            let Some(frame) = source.read_next_frame()? else {
                break;
            };
            stream_index += 1;

            let path = scratch.frame_path(index);
            self.write_jpeg(&frame, &path)?;
            log::debug!("Captured frame {index} -> {}", path.display());

            samples.push(FrameSample { index, path });
            tracker.advance(Some(index));
        }

        if samples.is_empty() {
            return Err(LabelError::NoFramesCaptured {
                start_frame: policy.start_frame,
                frames_read: stream_index,
            });
        }

        log::info!(
            "Captured {} frame(s) after reading {stream_index} (skip={}, max={}, start={})",
            samples.len(),
            policy.skip_frames,
            policy.max_frames,
            policy.start_frame,
        );
        Ok(samples)
    }

    fn write_jpeg(&self, frame: &DynamicImage, path: &Path) -> Result<(), LabelError> {
        let rgb = frame.to_rgb8();
        let mut writer = BufWriter::new(File::create(path)?);
        JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality).encode_image(&rgb)?;
        writer.flush()?;
        Ok(())
    }
}
