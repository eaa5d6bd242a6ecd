//! # framelabel
//!
//! Sample frames from a remotely hosted video and label them with a cloud
//! image-labeling API.
//!
//! A run has three stages:
//!
//! 1. a [`Resolver`] turns a content identifier and quality tag (`"240p"`)
//!    into a direct stream URL, by default through `yt-dlp`;
//! 2. a [`FrameSampler`] decodes the stream with FFmpeg (via
//!    [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)) and writes
//!    every Nth frame, up to a limit, as a JPEG into a per-run
//!    [`ScratchDirectory`];
//! 3. a [`LabelAggregator`] sends each frame to a [`LabelDetector`], by
//!    default Google Cloud Vision, and merges the answers into a
//!    [`LabelReport`].
//!
//! [`Analyzer`] wires the three together.
//!
//! ## Quick Start
//!
//! ```no_run
//! use framelabel::{AnalyzeOptions, Analyzer, LabelReport, SamplingPolicy};
//!
//! let options = AnalyzeOptions::new()
//!     .with_quality("240p")
//!     .with_sampling(SamplingPolicy::new(60, 4));
//!
//! let analyzer = Analyzer::from_env(options)?;
//! let report = analyzer.analyze("https://www.youtube.com/watch?v=dQw4w9WgXcQ")?;
//! if let LabelReport::Set(labels) = report {
//!     for label in labels {
//!         println!("{label}");
//!     }
//! }
//! # Ok::<(), framelabel::LabelError>(())
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries for building, `yt-dlp` on `PATH` (or in
//! `FRAMELABEL_YTDLP`) and a Cloud Vision credential in
//! `FRAMELABEL_VISION_API_KEY`, `GOOGLE_API_KEY` or
//! `GOOGLE_OAUTH_ACCESS_TOKEN`.

pub mod aggregate;
pub mod config;
pub mod conversion;
pub mod error;
pub mod ffmpeg;
pub mod pipeline;
pub mod progress;
pub mod resolver;
pub mod sampler;
pub mod scratch;
pub mod stream;
pub mod vision;

pub use aggregate::{LabelAggregator, LabelFormat, LabelReport, LabeledFrame};
pub use config::{AnalyzeOptions, DEFAULT_QUALITY};
pub use conversion::RgbConverter;
pub use error::LabelError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use pipeline::Analyzer;
pub use progress::{ProgressCallback, ProgressInfo, Stage};
pub use resolver::{FormatInfo, Resolver, YtDlpResolver};
pub use sampler::{FrameSample, FrameSampler, SamplingPolicy};
pub use scratch::{FrameFile, ScratchDirectory};
pub use stream::{FfmpegFrameSource, FfmpegStreamOpener, FrameSource, StreamOpener};
pub use vision::{CloudVisionClient, Credential, LabelDetector, VisionConfig};
