//! Per-run scratch directory for captured frames.
//!
//! Each run gets its own uniquely named directory, so concurrent or repeated
//! invocations never see each other's frames. The directory is removed by
//! [`ScratchDirectory::remove`] on the normal path and by `Drop` on every
//! other path.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::{Builder, TempDir};

use crate::error::LabelError;

const FRAME_PREFIX: &str = "frame_";
const FRAME_EXTENSION: &str = "jpg";

/// A captured frame file found in the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFile {
    /// Stream index parsed from the file name.
    pub index: u64,
    /// File name without directory, e.g. `frame_000060.jpg`.
    pub name: String,
    /// Full path to the file.
    pub path: PathBuf,
}

/// A uniquely named directory that holds JPEG frames for one run.
#[derive(Debug)]
pub struct ScratchDirectory {
    directory: TempDir,
}

impl ScratchDirectory {
    /// Create a fresh scratch directory under `root`, or under the system
    /// temporary directory when `root` is `None`.
    ///
    /// `root` is created if absent.
    pub fn create(root: Option<&Path>) -> Result<Self, LabelError> {
        let mut builder = Builder::new();
        builder.prefix("framelabel-");

        let directory = match root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        log::debug!("Created scratch directory {}", directory.path().display());
        Ok(Self { directory })
    }

    /// Location of the directory.
    pub fn path(&self) -> &Path {
        self.directory.path()
    }

    /// Path at which the frame with stream index `index` is stored.
    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.path().join(frame_file_name(index))
    }

    /// List captured frames, ordered by their stream index.
    ///
    /// Files that do not follow the frame naming scheme are ignored.
    pub fn frame_files(&self) -> Result<Vec<FrameFile>, LabelError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(self.path())? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(index) = parse_frame_index(&name) {
                files.push(FrameFile {
                    index,
                    name,
                    path: entry.path(),
                });
            }
        }
        files.sort_by_key(|file| file.index);
        Ok(files)
    }

    /// Delete the directory and everything in it.
    pub fn remove(self) -> Result<(), LabelError> {
        let path = self.path().to_path_buf();
        self.directory.close()?;
        log::debug!("Removed scratch directory {}", path.display());
        Ok(())
    }
}

/// File name for the frame with stream index `index`.
pub fn frame_file_name(index: u64) -> String {
    format!("{FRAME_PREFIX}{index:06}.{FRAME_EXTENSION}")
}

/// Recover the stream index from a frame file name.
pub fn parse_frame_index(name: &str) -> Option<u64> {
    name.strip_prefix(FRAME_PREFIX)?
        .strip_suffix(FRAME_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}
