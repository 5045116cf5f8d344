//! Pixel-data and timing helpers shared by the FFmpeg frame source.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};
use image::RgbImage;

use crate::error::VidgrabError;

/// Copy an RGB24 FFmpeg frame into an [`RgbImage`].
///
/// FFmpeg rows are often padded (stride > width × 3); the padding is
/// stripped so the buffer is tightly packed.
pub(crate) fn rgb_frame_to_image(rgb_frame: &VideoFrame) -> Result<RgbImage, VidgrabError> {
    let width = rgb_frame.width();
    let height = rgb_frame.height();
    let stride = rgb_frame.stride(0);
    let row_bytes = (width as usize) * 3;
    let data = rgb_frame.data(0);

    let buffer = if stride == row_bytes {
        data[..row_bytes * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }
        buffer
    };

    RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        VidgrabError::VideoDecodeError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })
}

/// Convert an FFmpeg rational to `f64`, or `None` when the denominator is 0.
pub(crate) fn rational_to_f64(rate: Rational) -> Option<f64> {
    if rate.denominator() == 0 || rate.numerator() <= 0 {
        None
    } else {
        Some(rate.numerator() as f64 / rate.denominator() as f64)
    }
}
