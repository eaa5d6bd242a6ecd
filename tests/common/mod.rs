//! In-memory stand-ins for the resolver, stream and label service.

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fs,
    path::Path,
    sync::Mutex,
};

use framelabel::{
    FrameSource, LabelDetector, LabelError, ProgressCallback, ProgressInfo, Resolver,
    StreamOpener,
};
use image::{DynamicImage, Rgb, RgbImage};

/// A stream of `length` small solid-colour frames.
pub struct SyntheticSource {
    length: u64,
    read: u64,
    materialised: u64,
}

impl SyntheticSource {
    pub fn new(length: u64) -> Self {
        Self {
            length,
            read: 0,
            materialised: 0,
        }
    }

    /// Frames read or skipped so far.
    pub fn frames_read(&self) -> u64 {
        self.read
    }

    /// Frames returned as images rather than skipped.
    pub fn frames_materialised(&self) -> u64 {
        self.materialised
    }
}

impl FrameSource for SyntheticSource {
    fn read_next_frame(&mut self) -> Result<Option<DynamicImage>, LabelError> {
        if self.read >= self.length {
            return Ok(None);
        }
        let shade = (self.read % 256) as u8;
        self.read += 1;
        self.materialised += 1;
        let image = RgbImage::from_pixel(16, 8, Rgb([shade, 128, 255 - shade]));
        Ok(Some(DynamicImage::ImageRgb8(image)))
    }

    fn skip_frame(&mut self) -> Result<bool, LabelError> {
        if self.read >= self.length {
            return Ok(false);
        }
        self.read += 1;
        Ok(true)
    }
}

/// Opens every URL as a [`SyntheticSource`], or fails like an unreadable URL.
pub struct FakeOpener {
    length: Option<u64>,
    pub opened: Cell<u32>,
}

impl FakeOpener {
    pub fn with_frames(length: u64) -> Self {
        Self {
            length: Some(length),
            opened: Cell::new(0),
        }
    }

    pub fn unreadable() -> Self {
        Self {
            length: None,
            opened: Cell::new(0),
        }
    }
}

impl StreamOpener for FakeOpener {
    type Source = SyntheticSource;

    fn open(&self, url: &str) -> Result<Self::Source, LabelError> {
        self.opened.set(self.opened.get() + 1);
        match self.length {
            Some(length) => Ok(SyntheticSource::new(length)),
            None => Err(LabelError::StreamOpen {
                url: url.to_string(),
                reason: "not a media stream".to_string(),
            }),
        }
    }
}

/// Resolves to a fixed answer.
pub enum FakeResolver {
    Found(String),
    Missing,
    Broken,
}

impl Resolver for FakeResolver {
    fn resolve(&self, content_id: &str, _quality: &str) -> Result<Option<String>, LabelError> {
        match self {
            FakeResolver::Found(url) => Ok(Some(url.clone())),
            FakeResolver::Missing => Ok(None),
            FakeResolver::Broken => Err(LabelError::Resolve {
                content_id: content_id.to_string(),
                reason: "tool crashed".to_string(),
            }),
        }
    }
}

/// Answers with scripted label lists, one per call; repeats `fallback`
/// once the script runs out.
pub struct ScriptedDetector {
    script: RefCell<VecDeque<Vec<String>>>,
    fallback: Vec<String>,
    fail_on_call: Option<u32>,
    pub calls: Cell<u32>,
}

impl ScriptedDetector {
    pub fn new(script: &[&[&str]]) -> Self {
        Self {
            script: RefCell::new(script.iter().map(|labels| to_strings(labels)).collect()),
            fallback: Vec::new(),
            fail_on_call: None,
            calls: Cell::new(0),
        }
    }

    /// Always answer with `labels`.
    pub fn constant(labels: &[&str]) -> Self {
        Self {
            script: RefCell::new(VecDeque::new()),
            fallback: to_strings(labels),
            fail_on_call: None,
            calls: Cell::new(0),
        }
    }

    /// Fail on the `call`-th request (1-based).
    pub fn failing_on(mut self, call: u32) -> Self {
        self.fail_on_call = Some(call);
        self
    }
}

impl LabelDetector for ScriptedDetector {
    fn detect_labels(&self, image_bytes: &[u8]) -> Result<Vec<String>, LabelError> {
        assert!(!image_bytes.is_empty(), "detector received an empty image");
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if self.fail_on_call == Some(call) {
            return Err(LabelError::Detection("quota exceeded".to_string()));
        }
        Ok(self
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Records every progress snapshot.
#[derive(Default)]
pub struct RecordingProgress {
    pub infos: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

pub fn to_strings(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|label| label.to_string()).collect()
}

/// Number of entries directly under `directory`.
pub fn entry_count(directory: &Path) -> usize {
    fs::read_dir(directory).map(|entries| entries.count()).unwrap_or(0)
}
