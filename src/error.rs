//! Error types for the `framelabel` crate.
//!
//! This module defines [`LabelError`], the unified error type returned by
//! every fallible stage of the pipeline: URL resolution, frame sampling,
//! label detection, and scratch-directory handling.

use std::io::Error as IoError;

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framelabel` operations.
///
/// Three variants ([`StreamOpen`](LabelError::StreamOpen),
/// [`NoFramesCaptured`](LabelError::NoFramesCaptured) and a resolver that
/// finds no matching format) are treated by
/// [`Analyzer::analyze`](crate::Analyzer::analyze) as "nothing to report"
/// rather than as failures. See [`LabelError::yields_empty_report`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LabelError {
    /// The URL resolver itself failed (tool missing, non-zero exit, bad output).
    #[error("Failed to resolve {content_id}: {reason}")]
    Resolve {
        /// Content identifier passed to the resolver.
        content_id: String,
        /// Underlying reason the resolution failed.
        reason: String,
    },

    /// The resolved URL could not be opened as a frame source.
    #[error("Failed to open stream at {url}: {reason}")]
    StreamOpen {
        /// URL that was passed to the stream opener.
        url: String,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The stream contains no video track.
    #[error("No video stream found in source")]
    NoVideoStream,

    /// A video frame could not be decoded or converted.
    #[error("Failed to decode video frame: {0}")]
    VideoDecode(String),

    /// The stream was readable but no frame matched the sampling policy.
    #[error("No frames captured (start frame {start_frame}, {frames_read} frame(s) read)")]
    NoFramesCaptured {
        /// Number of leading frames the policy discards.
        start_frame: u64,
        /// Total frames read from the stream before it was exhausted.
        frames_read: u64,
    },

    /// No credentials were configured for the label-detection service.
    #[error("Missing label detection credentials: set {0}")]
    MissingCredentials(&'static str),

    /// The label-detection service rejected a request.
    #[error("Label detection failed: {0}")]
    Detection(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// An I/O error occurred while reading or writing scratch files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An error from the `image` crate while encoding a frame.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),

    /// The HTTP transport to the label-detection service failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A JSON payload (resolver output or service response) was malformed.
    #[error("Invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl LabelError {
    /// Whether the orchestrator should turn this error into an empty report.
    ///
    /// True for stream-open failures, missing video tracks and zero-capture
    /// runs. Everything else aborts the run with an error.
    pub fn yields_empty_report(&self) -> bool {
        matches!(
            self,
            LabelError::StreamOpen { .. }
                | LabelError::NoVideoStream
                | LabelError::NoFramesCaptured { .. }
        )
    }
}

impl From<FfmpegError> for LabelError {
    fn from(error: FfmpegError) -> Self {
        LabelError::Ffmpeg(error.to_string())
    }
}
