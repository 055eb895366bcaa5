use crate::errors::CoreResult;
use image::{DynamicImage, GenericImageView, ImageFormat as CodecFormat};
use std::io::Cursor;

/// JPEG re-encode quality used by `resize`, per §4.7.
const JPEG_QUALITY: u8 = 85;
/// Alpha threshold for `trim_alpha`'s bounding-box scan, expressed the way
/// the spec phrases it: `alpha > threshold << 8`, i.e. effectively "any
/// non-fully-transparent pixel" at threshold 0.
const ALPHA_THRESHOLD: u8 = 0;

pub fn decode(bytes: &[u8]) -> CoreResult<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// Resizes `image` so it fits within `(max_width, max_height)`, preserving
/// aspect ratio and never upscaling. Re-encodes JPEG at quality 85; WebP
/// output is never produced — WebP *inputs* are always re-encoded as PNG.
pub fn resize(image: &DynamicImage, max_width: u32, max_height: u32, source_is_webp: bool) -> CoreResult<(Vec<u8>, CodecFormat)> {
    let (width, height) = image.dimensions();
    let scale = (max_width as f64 / width as f64)
        .min(max_height as f64 / height as f64)
        .min(1.0);

    let resized = if scale < 1.0 {
        let new_width = (width as f64 * scale).round().max(1.0) as u32;
        let new_height = (height as f64 * scale).round().max(1.0) as u32;
        image.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
    } else {
        image.clone()
    };

    let format = if source_is_webp { CodecFormat::Png } else { CodecFormat::Jpeg };
    let mut buf = Cursor::new(Vec::new());
    match format {
        CodecFormat::Jpeg => {
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
            resized.write_with_encoder(encoder)?;
        }
        _ => {
            resized.write_to(&mut buf, CodecFormat::Png)?;
        }
    }
    Ok((buf.into_inner(), format))
}

/// PNG-only: crops to the tight bounding box of pixels whose alpha exceeds
/// `ALPHA_THRESHOLD`. Returns the input unchanged if no visible pixels
/// exist.
pub fn trim_alpha(image: &DynamicImage) -> DynamicImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut min_x = width;
    let mut min_y = height;
    let mut max_x = 0i64;
    let mut max_y = 0i64;
    let mut found = false;

    for (x, y, pixel) in rgba.enumerate_pixels() {
        if pixel[3] > ALPHA_THRESHOLD {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x as i64);
            max_y = max_y.max(y as i64);
        }
    }

    if !found {
        return image.clone();
    }

    let crop_width = (max_x - min_x as i64 + 1) as u32;
    let crop_height = (max_y - min_y as i64 + 1) as u32;
    image.crop_imm(min_x, min_y, crop_width, crop_height)
}

/// Probes dimensions from a byte buffer capped at 5 MiB, per §4.6's
/// ImageFixer remote-dimension probe step — this is the local half; the
/// HTTP streaming cap lives with the fetcher.
pub const MAX_PROBE_BYTES: usize = 5 * 1024 * 1024;

pub fn probe_dimensions(bytes: &[u8]) -> CoreResult<(u32, u32)> {
    let capped = &bytes[..bytes.len().min(MAX_PROBE_BYTES)];
    let reader = image::io::Reader::new(Cursor::new(capped)).with_guessed_format()?;
    Ok(reader.into_dimensions()?)
}
