use anyhow::{anyhow, Result};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use crate::domain::conversion::TargetFormat;

/// Decodes `data` (format sniffed from its header) and re-encodes it as `target`.
///
/// CPU-bound; async callers run it on the blocking pool.
pub fn convert(data: &[u8], target: TargetFormat) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(data)
        .map_err(|err| anyhow!("failed to decode image: {}", err))?;

    // JPEG has no alpha channel and the WebP encoder only takes 8-bit RGB(A).
    let prepared = match target {
        TargetFormat::Jpeg => DynamicImage::ImageRgb8(decoded.to_rgb8()),
        TargetFormat::Webp if decoded.color().has_alpha() => {
            DynamicImage::ImageRgba8(decoded.to_rgba8())
        }
        TargetFormat::Webp => DynamicImage::ImageRgb8(decoded.to_rgb8()),
        TargetFormat::Png => decoded,
    };

    let mut output = Cursor::new(Vec::new());
    prepared
        .write_to(&mut output, image_format(target))
        .map_err(|err| anyhow!("failed to encode {}: {}", target, err))?;

    Ok(output.into_inner())
}

fn image_format(target: TargetFormat) -> ImageFormat {
    match target {
        TargetFormat::Jpeg => ImageFormat::Jpeg,
        TargetFormat::Png => ImageFormat::Png,
        TargetFormat::Webp => ImageFormat::WebP,
    }
}
