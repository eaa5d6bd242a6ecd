//! Resolving a content identifier to a direct stream URL.
//!
//! [`YtDlpResolver`] shells out to `yt-dlp`, which knows how to extract
//! format lists from video platforms. The first format whose note matches the
//! requested quality tag (e.g. `"240p"`) wins.
//!
//! # Example
//!
//! ```no_run
//! use framelabel::{Resolver, YtDlpResolver};
//!
//! let resolver = YtDlpResolver::from_env();
//! match resolver.resolve("dQw4w9WgXcQ", "240p")? {
//!     Some(url) => println!("stream: {url}"),
//!     None => println!("no 240p variant"),
//! }
//! # Ok::<(), framelabel::LabelError>(())
//! ```

use std::{env, ffi::OsString, path::PathBuf, process::Command};

use serde::Deserialize;

use crate::error::LabelError;

/// Environment variable overriding the `yt-dlp` executable.
pub const YTDLP_ENV: &str = "FRAMELABEL_YTDLP";

/// Turns a content identifier plus quality tag into a fetchable URL.
pub trait Resolver {
    /// Return the URL of the first variant tagged `quality`, or `None` if
    /// the content has no such variant.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Resolve`] when the lookup itself fails.
    fn resolve(&self, content_id: &str, quality: &str) -> Result<Option<String>, LabelError>;
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn resolve(&self, content_id: &str, quality: &str) -> Result<Option<String>, LabelError> {
        (**self).resolve(content_id, quality)
    }
}

/// One downloadable variant as reported by `yt-dlp`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormatInfo {
    /// Extractor-specific format identifier.
    #[serde(default)]
    pub format_id: Option<String>,
    /// Human-readable quality tag, e.g. `"240p"` or `"medium"`.
    #[serde(default)]
    pub format_note: Option<String>,
    /// Container extension.
    #[serde(default)]
    pub ext: Option<String>,
    /// Frame width, for video formats.
    #[serde(default)]
    pub width: Option<u32>,
    /// Frame height, for video formats.
    #[serde(default)]
    pub height: Option<u32>,
    /// Video codec, `"none"` for audio-only formats.
    #[serde(default)]
    pub vcodec: Option<String>,
    /// Direct URL of the media.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfoDict {
    #[serde(default)]
    formats: Option<Vec<FormatInfo>>,
}

/// Parse the `formats` array out of a `yt-dlp --dump-single-json` document.
///
/// A document without a `formats` key yields an empty list.
pub fn parse_formats(info_json: &str) -> Result<Vec<FormatInfo>, LabelError> {
    let info: InfoDict = serde_json::from_str(info_json)?;
    Ok(info.formats.unwrap_or_default())
}

/// URL of the first format whose note equals `quality`.
pub fn select_format_url(formats: &[FormatInfo], quality: &str) -> Option<String> {
    formats
        .iter()
        .find(|format| format.format_note.as_deref() == Some(quality))
        .and_then(|format| format.url.clone())
}

/// Resolver backed by the `yt-dlp` command-line tool.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    program: PathBuf,
    extra_args: Vec<OsString>,
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpResolver {
    /// Use the executable at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Use `$FRAMELABEL_YTDLP` if set, otherwise `yt-dlp` from `PATH`.
    pub fn from_env() -> Self {
        env::var_os(YTDLP_ENV)
            .filter(|value| !value.is_empty())
            .map(|value| Self::new(PathBuf::from(value)))
            .unwrap_or_default()
    }

    /// Pass an extra argument (e.g. `--cookies file.txt`) before the content id.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// All formats `yt-dlp` reports for `content_id`.
    pub fn formats(&self, content_id: &str) -> Result<Vec<FormatInfo>, LabelError> {
        let resolve_error = |reason: String| LabelError::Resolve {
            content_id: content_id.to_string(),
            reason,
        };

        log::debug!("Running {} for {content_id}", self.program.display());
        let output = Command::new(&self.program)
            .args(["--dump-single-json", "--skip-download", "--no-warnings"])
            .args(&self.extra_args)
            .arg("--")
            .arg(content_id)
            .output()
            .map_err(|error| {
                resolve_error(format!("cannot run {}: {error}", self.program.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(resolve_error(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_formats(&stdout)
    }
}

impl Resolver for YtDlpResolver {
    fn resolve(&self, content_id: &str, quality: &str) -> Result<Option<String>, LabelError> {
        let formats = self.formats(content_id)?;
        let url = select_format_url(&formats, quality);
        match &url {
            Some(_) => log::info!("Resolved {content_id} at quality {quality}"),
            None => log::debug!(
                "{content_id}: none of {} format(s) is tagged {quality}",
                formats.len()
            ),
        }
        Ok(url)
    }
}
