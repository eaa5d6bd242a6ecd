//! FFmpeg console verbosity.
//!
//! FFmpeg writes its own diagnostics to stderr, independently of the `log`
//! facade used by this crate. Network inputs are especially chatty, so the
//! CLI exposes this through `--log-level`.
//!
//! ```no_run
//! use framelabel::FfmpegLogLevel;
//!
//! framelabel::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! ```

use std::{fmt, str::FromStr};

use ffmpeg_next::util::log::Level;

/// FFmpeg internal log verbosity, from most quiet to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print nothing.
    Quiet,
    /// Unrecoverable conditions that abort the process.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Everything.
    Trace,
}

impl FfmpegLogLevel {
    const ALL: [(FfmpegLogLevel, &'static str); 9] = [
        (FfmpegLogLevel::Quiet, "quiet"),
        (FfmpegLogLevel::Panic, "panic"),
        (FfmpegLogLevel::Fatal, "fatal"),
        (FfmpegLogLevel::Error, "error"),
        (FfmpegLogLevel::Warning, "warning"),
        (FfmpegLogLevel::Info, "info"),
        (FfmpegLogLevel::Verbose, "verbose"),
        (FfmpegLogLevel::Debug, "debug"),
        (FfmpegLogLevel::Trace, "trace"),
    ];

    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }

    fn name(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(level, _)| *level == self)
            .map(|(_, name)| *name)
            .unwrap_or("warning")
    }
}

impl fmt::Display for FfmpegLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FfmpegLogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        let wanted = match lowered.as_str() {
            "warn" => "warning",
            other => other,
        };
        Self::ALL
            .iter()
            .find(|(_, name)| *name == wanted)
            .map(|(level, _)| *level)
            .ok_or_else(|| format!("unknown FFmpeg log level: {value}"))
    }
}

/// Set FFmpeg's stderr verbosity. Does not affect `log` output.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}
