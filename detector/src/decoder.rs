use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};

use frame_motion_common::config::DecoderConfig;
use frame_motion_common::frame::{rgb_len, DecodedFrame, CHANNELS};
use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, DynamicImage, ImageDecoder, ImageError, Limits};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("corrupt or unsupported JPEG stream: {0}")]
    CorruptStream(String),
    #[error("cannot allocate {width}x{height} frame: {reason}")]
    AllocationFailure {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("image has zero area ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// Decode a JPEG buffer into an RGB frame using the default limits.
pub fn decode(encoded: &[u8]) -> Result<DecodedFrame, DecodeError> {
    decode_with(encoded, &DecoderConfig::default())
}

/// Decode a JPEG buffer into an RGB frame.
///
/// Whatever the source color space (grayscale, YCbCr, CMYK), the result is
/// 3-channel interleaved RGB with chroma upsampled to full resolution. The
/// header is checked against `config` before the output buffer is allocated.
/// On every error path the codec state and any scratch or output buffer are
/// dropped before returning.
pub fn decode_with(encoded: &[u8], config: &DecoderConfig) -> Result<DecodedFrame, DecodeError> {
    if encoded.is_empty() {
        return Err(DecodeError::CorruptStream("empty input".into()));
    }

    // A codec panic on a hostile stream must not unwind into the caller.
    match panic::catch_unwind(AssertUnwindSafe(|| decode_jpeg(encoded, config))) {
        Ok(result) => result,
        Err(_) => Err(DecodeError::CorruptStream("JPEG decoder panicked".into())),
    }
}

fn decode_jpeg(encoded: &[u8], config: &DecoderConfig) -> Result<DecodedFrame, DecodeError> {
    let mut decoder = JpegDecoder::new(Cursor::new(encoded))
        .map_err(|e| DecodeError::CorruptStream(e.to_string()))?;

    let (width, height) = decoder.dimensions();
    let out_len = check_dimensions(width, height, config)?;
    let codec_error = |e: ImageError| match e {
        ImageError::Limits(limit) => DecodeError::AllocationFailure {
            width,
            height,
            reason: limit.to_string(),
        },
        other => DecodeError::CorruptStream(other.to_string()),
    };

    decoder
        .set_limits(codec_limits(config))
        .map_err(codec_error)?;

    let mut pixels = alloc_zeroed(out_len, width, height)?;
    let color = decoder.color_type();
    let reported = usize::try_from(decoder.total_bytes()).map_err(|_| {
        DecodeError::AllocationFailure {
            width,
            height,
            reason: "codec output size exceeds the address space".into(),
        }
    })?;

    match color {
        ColorType::Rgb8 if reported == out_len => {
            decoder.read_image(&mut pixels).map_err(codec_error)?;
        }
        ColorType::Rgb8 | ColorType::L8 => {
            // Decode at the codec's own stride, then keep only the logical
            // prefix of every row.
            let mut scratch = alloc_zeroed(reported, width, height)?;
            decoder.read_image(&mut scratch).map_err(codec_error)?;
            let src_row_len = width as usize * usize::from(color.bytes_per_pixel());
            copy_rows(&scratch, src_row_len, color, &mut pixels, width, height)?;
        }
        _ => {
            let rgb = DynamicImage::from_decoder(decoder)
                .map_err(codec_error)?
                .into_rgb8();
            if rgb.as_raw().len() != out_len {
                return Err(DecodeError::CorruptStream(format!(
                    "codec produced {} bytes for a {width}x{height} frame",
                    rgb.as_raw().len()
                )));
            }
            pixels.copy_from_slice(rgb.as_raw());
        }
    }

    debug!(width, height, color = ?color, bytes = out_len, "decoded JPEG frame");

    DecodedFrame::new(width, height, pixels).map_err(|e| DecodeError::CorruptStream(e.to_string()))
}

/// Validate header dimensions against the configured limits and return the
/// exact output size in bytes.
fn check_dimensions(width: u32, height: u32, config: &DecoderConfig) -> Result<usize, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage { width, height });
    }
    if width > config.max_width || height > config.max_height {
        return Err(DecodeError::AllocationFailure {
            width,
            height,
            reason: format!(
                "dimensions exceed the configured limit of {}x{}",
                config.max_width, config.max_height
            ),
        });
    }
    let len = rgb_len(width, height).ok_or_else(|| DecodeError::AllocationFailure {
        width,
        height,
        reason: "byte count overflows".into(),
    })?;
    if len as u64 > config.max_alloc_bytes {
        return Err(DecodeError::AllocationFailure {
            width,
            height,
            reason: format!(
                "{len} bytes exceeds the configured limit of {} bytes",
                config.max_alloc_bytes
            ),
        });
    }
    Ok(len)
}

fn codec_limits(config: &DecoderConfig) -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(config.max_width);
    limits.max_image_height = Some(config.max_height);
    // The output bound is enforced by `check_dimensions`; the codec keeps its
    // own scratch planes, so never go below its default budget.
    limits.max_alloc = limits
        .max_alloc
        .map(|codec_default| codec_default.max(config.max_alloc_bytes));
    limits
}

fn alloc_zeroed(len: usize, width: u32, height: u32) -> Result<Vec<u8>, DecodeError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|e| DecodeError::AllocationFailure {
            width,
            height,
            reason: e.to_string(),
        })?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Copy `height` rows out of `scratch` into the RGB output. The scratch
/// stride is whatever the codec reported; only the first `src_row_len`
/// bytes of each scratch row are read and grayscale is widened to RGB.
fn copy_rows(
    scratch: &[u8],
    src_row_len: usize,
    color: ColorType,
    out: &mut [u8],
    width: u32,
    height: u32,
) -> Result<(), DecodeError> {
    let src_stride = scratch.len() / height as usize;
    if src_stride < src_row_len {
        return Err(DecodeError::CorruptStream(format!(
            "codec row stride {src_stride} is shorter than {src_row_len} bytes"
        )));
    }

    let dst_stride = width as usize * CHANNELS;
    for (src_row, dst_row) in scratch
        .chunks_exact(src_stride)
        .zip(out.chunks_exact_mut(dst_stride))
    {
        let src_row = &src_row[..src_row_len];
        match color {
            ColorType::L8 => {
                for (luma, rgb) in src_row.iter().zip(dst_row.chunks_exact_mut(CHANNELS)) {
                    rgb.fill(*luma);
                }
            }
            _ => dst_row.copy_from_slice(src_row),
        }
    }
    Ok(())
}
