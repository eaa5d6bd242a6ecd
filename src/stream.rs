//! Sequential frame streams.
//!
//! A [`StreamOpener`] turns a resolved URL into a [`FrameSource`], which
//! yields decoded frames one at a time until the stream is exhausted. The
//! production implementation is [`FfmpegStreamOpener`]; tests substitute
//! in-memory sources.
//!
//! # Example
//!
//! ```no_run
//! use framelabel::{FfmpegStreamOpener, FrameSource, StreamOpener};
//!
//! let mut source = FfmpegStreamOpener.open("https://example.com/video.mp4")?;
//! while let Some(frame) = source.read_next_frame()? {
//!     println!("{}x{}", frame.width(), frame.height());
//! }
//! # Ok::<(), framelabel::LabelError>(())
//! ```

use ffmpeg_next::{
    Error as FfmpegError, Packet, codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder, format::context::Input, frame::Video as VideoFrame,
    media::Type,
};
use image::DynamicImage;

use crate::{conversion::RgbConverter, error::LabelError};

/// A sequential source of decoded frames.
pub trait FrameSource {
    /// Read the next frame, or `None` once the stream is exhausted.
    fn read_next_frame(&mut self) -> Result<Option<DynamicImage>, LabelError>;

    /// Advance past the next frame without materialising it. Returns
    /// `false` once the stream is exhausted.
    fn skip_frame(&mut self) -> Result<bool, LabelError> {
        Ok(self.read_next_frame()?.is_some())
    }
}

/// Opens a URL as a [`FrameSource`].
pub trait StreamOpener {
    /// The source type produced by this opener.
    type Source: FrameSource;

    /// Open `url` for sequential reading.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::StreamOpen`] if the URL cannot be read as a
    /// frame source.
    fn open(&self, url: &str) -> Result<Self::Source, LabelError>;
}

impl<O: StreamOpener + ?Sized> StreamOpener for &O {
    type Source = O::Source;

    fn open(&self, url: &str) -> Result<Self::Source, LabelError> {
        (**self).open(url)
    }
}

/// Opens streams through FFmpeg's demuxers, including its network protocols.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegStreamOpener;

impl StreamOpener for FfmpegStreamOpener {
    type Source = FfmpegFrameSource;

    fn open(&self, url: &str) -> Result<Self::Source, LabelError> {
        FfmpegFrameSource::open(url)
    }
}

/// Decodes the best video stream of an FFmpeg input, frame by frame.
///
/// Frames are produced in decode order without seeking. The input is closed
/// when the source is dropped.
pub struct FfmpegFrameSource {
    input_context: Input,
    decoder: VideoDecoder,
    video_stream_index: usize,
    converter: RgbConverter,
    decoded_frame: VideoFrame,
    eof_sent: bool,
    done: bool,
    frames_read: u64,
}

impl FfmpegFrameSource {
    /// Open `url` (or a local path) and prepare a decoder for its best
    /// video stream.
    ///
    /// # Errors
    ///
    /// - [`LabelError::StreamOpen`] if FFmpeg cannot open the input.
    /// - [`LabelError::NoVideoStream`] if the input has no video track.
    pub fn open(url: &str) -> Result<Self, LabelError> {
        log::debug!("Opening frame stream: {url}");

        let open_error = |reason: String| LabelError::StreamOpen {
            url: url.to_string(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;
        ffmpeg_next::format::network::init();

        let input_context =
            ffmpeg_next::format::input(&url).map_err(|error| open_error(error.to_string()))?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(LabelError::NoVideoStream)?;
        let video_stream_index = stream.index();

        let decoder_context = CodecContext::from_parameters(stream.parameters())
            .map_err(|error| open_error(format!("bad video codec parameters: {error}")))?;
        let decoder = decoder_context
            .decoder()
            .video()
            .map_err(|error| open_error(format!("failed to create video decoder: {error}")))?;

        log::info!(
            "Opened frame stream (format={}, video stream {}, {}x{})",
            input_context.format().name(),
            video_stream_index,
            decoder.width(),
            decoder.height(),
        );

        Ok(Self {
            input_context,
            decoder,
            video_stream_index,
            converter: RgbConverter::new(),
            decoded_frame: VideoFrame::empty(),
            eof_sent: false,
            done: false,
            frames_read: 0,
        })
    }

    /// Number of frames decoded so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Decode the next frame into `decoded_frame`. Returns `false` once
    /// the decoder is drained.
    fn decode_next(&mut self) -> Result<bool, LabelError> {
        if self.done {
            return Ok(false);
        }
        match self.pump_decoder() {
            Ok(decoded) => {
                if decoded {
                    self.frames_read += 1;
                } else {
                    self.done = true;
                    log::debug!("Frame stream exhausted after {} frame(s)", self.frames_read);
                }
                Ok(decoded)
            }
            Err(error) => {
                self.done = true;
                Err(error)
            }
        }
    }

    fn pump_decoder(&mut self) -> Result<bool, LabelError> {
        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                return Ok(true);
            }
            if self.eof_sent {
                return Ok(false);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) if packet.stream() == self.video_stream_index => {
                    self.decoder.send_packet(&packet)?;
                }
                Ok(()) => {}
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn read_next_frame(&mut self) -> Result<Option<DynamicImage>, LabelError> {
        if !self.decode_next()? {
            return Ok(None);
        }
        match self.converter.convert(&self.decoded_frame) {
            Ok(image) => Ok(Some(image)),
            Err(error) => {
                self.done = true;
                Err(error)
            }
        }
    }

    fn skip_frame(&mut self) -> Result<bool, LabelError> {
        self.decode_next()
    }
}
