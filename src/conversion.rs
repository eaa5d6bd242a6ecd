//! Turning decoded FFmpeg frames into RGB images.
//!
//! [`RgbConverter`] owns a software scaler that is rebuilt whenever the
//! decoded geometry or pixel format changes, which adaptive network streams
//! are allowed to do mid-stream.

use ffmpeg_next::{
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::error::LabelError;

/// Scaler plus the source geometry it was built for.
struct RgbScaler {
    context: ScalingContext,
    format: Pixel,
    width: u32,
    height: u32,
}

impl RgbScaler {
    fn matches(&self, frame: &VideoFrame) -> bool {
        self.format == frame.format()
            && self.width == frame.width()
            && self.height == frame.height()
    }
}

/// Converts decoded frames of any pixel format to RGB8 images.
#[derive(Default)]
pub struct RgbConverter {
    scaler: Option<RgbScaler>,
    scaled_frame: Option<VideoFrame>,
}

impl RgbConverter {
    /// Create a converter. The scaler is built on the first frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert `frame` to an RGB8 image of the same size.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Ffmpeg`] if no scaler exists for the frame's
    /// format, or [`LabelError::VideoDecode`] if the scaled plane is short.
    pub fn convert(&mut self, frame: &VideoFrame) -> Result<DynamicImage, LabelError> {
        let scaler = match &mut self.scaler {
            Some(scaler) if scaler.matches(frame) => scaler,
            slot => {
                let context = ScalingContext::get(
                    frame.format(),
                    frame.width(),
                    frame.height(),
                    Pixel::RGB24,
                    frame.width(),
                    frame.height(),
                    ScalingFlags::BILINEAR,
                )?;
                log::debug!(
                    "Built RGB scaler for {:?} {}x{}",
                    frame.format(),
                    frame.width(),
                    frame.height()
                );
                // The output frame is sized for the old scaler.
                self.scaled_frame = None;
                slot.insert(RgbScaler {
                    context,
                    format: frame.format(),
                    width: frame.width(),
                    height: frame.height(),
                })
            }
        };

        let scaled_frame = self.scaled_frame.get_or_insert_with(VideoFrame::empty);
        scaler.context.run(frame, scaled_frame)?;
        rgb_frame_to_image(scaled_frame)
    }
}

/// Copy plane 0 of an RGB24 frame into a tightly-packed buffer.
///
/// FFmpeg rows may carry padding (stride > width × 3); it is stripped here.
fn packed_rgb_plane(video_frame: &VideoFrame, width: u32, height: u32) -> Option<Vec<u8>> {
    let stride = video_frame.stride(0);
    let row_bytes = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_bytes {
        return data.get(..row_bytes * (height as usize)).map(<[u8]>::to_vec);
    }

    let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
    for row in 0..(height as usize) {
        let row_start = row * stride;
        buffer.extend_from_slice(data.get(row_start..row_start + row_bytes)?);
    }
    Some(buffer)
}

/// Wrap a scaled RGB24 frame as a [`DynamicImage`].
fn rgb_frame_to_image(video_frame: &VideoFrame) -> Result<DynamicImage, LabelError> {
    let width = video_frame.width();
    let height = video_frame.height();

    packed_rgb_plane(video_frame, width, height)
        .and_then(|buffer| RgbImage::from_raw(width, height, buffer))
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| {
            LabelError::VideoDecode(format!(
                "decoded plane does not fit a {width}x{height} RGB image"
            ))
        })
}
