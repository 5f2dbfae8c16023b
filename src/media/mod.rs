/// Upload image handling
///
/// Shrinks uploaded photos before they are classified and stored inline:
/// downscale to a maximum dimension, re-encode as JPEG and step the quality
/// down until the target size is met.

use crate::{
    config::MediaConfig,
    error::{AlertError, AlertResult},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage};
use serde::Serialize;

/// JPEG qualities tried in order
const QUALITY_STEPS: [u8; 6] = [85, 75, 65, 55, 45, 40];

/// Smallest edge we are willing to shrink to when quality alone is not enough
const MIN_DIMENSION: u32 = 64;

/// Result of compressing an upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedImage {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub original_size: usize,
    pub compressed_size: usize,
    pub compression_ratio: f64,
}

/// JPEG re-encoder with size and dimension targets
#[derive(Debug, Clone)]
pub struct ImageCompressor {
    max_dimension: u32,
    target_bytes: usize,
}

impl ImageCompressor {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            max_dimension: config.max_dimension.max(MIN_DIMENSION),
            target_bytes: config.target_bytes,
        }
    }

    /// Compress raw image bytes in any supported format.
    ///
    /// Undecodable input or an encoder failure is a `CompressionFailure`;
    /// the caller must not continue the upload without an image.
    pub fn compress(&self, raw: &[u8]) -> AlertResult<CompressedImage> {
        if raw.is_empty() {
            return Err(AlertError::CompressionFailure("Empty image".to_string()));
        }

        let decoded = image::load_from_memory(raw)
            .map_err(|e| AlertError::CompressionFailure(format!("Failed to decode image: {}", e)))?;

        let mut image = fit_within(&decoded, self.max_dimension);
        let mut best = encode_jpeg(&image, QUALITY_STEPS[0])?;

        loop {
            for quality in QUALITY_STEPS.iter().skip(1) {
                if best.len() <= self.target_bytes {
                    break;
                }
                best = encode_jpeg(&image, *quality)?;
            }

            let longest = image.width().max(image.height());
            if best.len() <= self.target_bytes || longest <= MIN_DIMENSION {
                break;
            }

            let next = (longest * 3 / 4).max(MIN_DIMENSION);
            image = fit_within(&image, next);
            best = encode_jpeg(&image, QUALITY_STEPS[0])?;
        }

        tracing::debug!(
            "Compressed image {} -> {} bytes ({}x{})",
            raw.len(),
            best.len(),
            image.width(),
            image.height()
        );

        Ok(CompressedImage {
            original_size: raw.len(),
            compressed_size: best.len(),
            compression_ratio: raw.len() as f64 / best.len().max(1) as f64,
            bytes: best,
        })
    }
}

fn fit_within(image: &DynamicImage, max_dimension: u32) -> DynamicImage {
    if image.width() <= max_dimension && image.height() <= max_dimension {
        return image.clone();
    }
    image.resize(max_dimension, max_dimension, FilterType::Triangle)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> AlertResult<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        .map_err(|e| AlertError::CompressionFailure(format!("Failed to encode JPEG: {}", e)))?;
    Ok(buf)
}

/// Inline `data:` URL for an encoded image
pub fn to_data_url(bytes: &[u8], mime_type: &str) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Human-readable size, two decimals at most
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
