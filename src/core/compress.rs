use crate::config::toml_config::{MAX_QUALITY, MIN_QUALITY};
use crate::core::{CompressedImage, SourceImage};
use crate::utils::error::{Result, ToolkitError};
use image::codecs::jpeg::JpegEncoder;

pub fn download_name(source: &SourceImage) -> String {
    format!("compressed_{}.jpg", source.stem())
}

/// Re-encodes the source as JPEG at `quality` percent.
///
/// JPEG has no alpha channel, so transparent pixels are flattened onto the
/// RGB values already stored underneath them.
pub fn compress(source: &SourceImage, quality: u8) -> Result<CompressedImage> {
    if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
        return Err(ToolkitError::validation(format!(
            "压缩质量必须在 {}% 到 {}% 之间",
            MIN_QUALITY, MAX_QUALITY
        )));
    }
    source.ensure_image()?;

    let decoded = image::load_from_memory(&source.bytes)?;
    let rgb = decoded.to_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(&rgb)?;

    tracing::debug!(
        "Compressed {} ({}x{}) from {} to {} bytes at quality {}",
        source.file_name,
        rgb.width(),
        rgb.height(),
        source.size(),
        bytes.len(),
        quality
    );

    Ok(CompressedImage {
        file_name: download_name(source),
        original_size: source.size(),
        compressed_size: bytes.len(),
        quality,
        bytes,
    })
}
