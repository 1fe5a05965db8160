//! Image pipeline: full-size compression and thumbnail generation.
//!
//! Every uploaded image becomes a pair of JPEG artifacts: a "full" variant
//! bounded by a maximum dimension and byte budget, and a fixed-width
//! thumbnail. The pair is produced in memory; nothing touches storage unless
//! both encodes succeed, so a failed upload never leaves an orphaned half.

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use thiserror::Error;

use crate::config::ImagesConfig;

/// Quality floor for the byte-budget loop. Below this the artifact is
/// accepted even if it still exceeds the budget.
const MIN_QUALITY: u8 = 30;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("{0} is not an image")]
    NotAnImage(String),
    #[error("failed to decode {name}: {reason}")]
    Decode { name: String, reason: String },
    #[error("failed to encode {name}: {reason}")]
    Encode { name: String, reason: String },
}

/// Both artifacts of a processed upload, encoded and ready to store.
#[derive(Debug)]
pub struct ProcessedImage {
    pub full: Vec<u8>,
    pub thumbnail: Vec<u8>,
}

pub struct ImagePipeline {
    max_bytes: u64,
    max_dimension: u32,
    thumbnail_width: u32,
    quality: u8,
}

impl ImagePipeline {
    pub fn new(config: &ImagesConfig) -> Self {
        Self {
            max_bytes: config.max_bytes,
            max_dimension: config.max_dimension,
            thumbnail_width: config.thumbnail_width,
            quality: config.quality,
        }
    }

    /// Decode raw bytes, rejecting inputs that are not a known image format.
    pub fn decode(&self, name: &str, bytes: &[u8]) -> Result<DynamicImage, ImageError> {
        let format = image::guess_format(bytes)
            .map_err(|_| ImageError::NotAnImage(name.to_string()))?;
        image::load_from_memory_with_format(bytes, format).map_err(|e| ImageError::Decode {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Produce the full variant: longer edge capped at the configured
    /// dimension, then encoded at the configured quality. If the result
    /// exceeds the byte budget, the quality steps down and the encode is
    /// retried until it fits or hits the quality floor.
    pub fn compress_full(&self, name: &str, img: &DynamicImage) -> Result<Vec<u8>, ImageError> {
        let scaled = if img.width().max(img.height()) > self.max_dimension {
            img.thumbnail(self.max_dimension, self.max_dimension)
        } else {
            img.clone()
        };

        let mut quality = self.quality;
        loop {
            let bytes = encode_jpeg(name, &scaled, quality)?;
            if bytes.len() as u64 <= self.max_bytes || quality <= MIN_QUALITY {
                return Ok(bytes);
            }
            quality = quality.saturating_sub(10).max(MIN_QUALITY);
        }
    }

    /// Produce the thumbnail variant: longer dimension scaled to the target
    /// width, aspect ratio preserved.
    pub fn thumbnail(&self, name: &str, img: &DynamicImage) -> Result<Vec<u8>, ImageError> {
        let thumb = img.thumbnail(self.thumbnail_width, self.thumbnail_width);
        encode_jpeg(name, &thumb, self.quality)
    }

    /// Process an upload into its full + thumbnail pair. Either both succeed
    /// or the whole operation fails with the first error.
    pub fn process(&self, name: &str, bytes: &[u8]) -> Result<ProcessedImage, ImageError> {
        let img = self.decode(name, bytes)?;
        let full = self.compress_full(name, &img)?;
        let thumbnail = self.thumbnail(name, &img)?;
        Ok(ProcessedImage { full, thumbnail })
    }
}

fn encode_jpeg(name: &str, img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    // JPEG has no alpha channel; flatten before encoding.
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(&rgb).map_err(|e| ImageError::Encode {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn pipeline() -> ImagePipeline {
        ImagePipeline::new(&ImagesConfig::default())
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_process_produces_both_variants() {
        let out = pipeline().process("plan.png", &png_bytes(400, 200)).unwrap();
        assert!(!out.full.is_empty());
        assert!(!out.thumbnail.is_empty());
    }

    #[test]
    fn test_thumbnail_longer_dimension_matches_target() {
        let p = pipeline();
        let out = p.process("wide.png", &png_bytes(400, 200)).unwrap();
        let thumb = image::load_from_memory(&out.thumbnail).unwrap();
        assert_eq!(thumb.width(), 200);
        assert_eq!(thumb.height(), 100);

        let out = p.process("tall.png", &png_bytes(200, 400)).unwrap();
        let thumb = image::load_from_memory(&out.thumbnail).unwrap();
        assert_eq!(thumb.width(), 100);
        assert_eq!(thumb.height(), 200);
    }

    #[test]
    fn test_full_variant_respects_max_dimension() {
        let cfg = ImagesConfig {
            max_dimension: 256,
            ..ImagesConfig::default()
        };
        let p = ImagePipeline::new(&cfg);
        let out = p.process("big.png", &png_bytes(1024, 512)).unwrap();
        let full = image::load_from_memory(&out.full).unwrap();
        assert!(full.width() <= 256 && full.height() <= 256);
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let out = pipeline().process("small.png", &png_bytes(64, 48)).unwrap();
        let full = image::load_from_memory(&out.full).unwrap();
        assert_eq!((full.width(), full.height()), (64, 48));
    }

    #[test]
    fn test_non_image_is_rejected() {
        let err = pipeline().process("notes.txt", b"not an image at all").unwrap_err();
        assert!(matches!(err, ImageError::NotAnImage(_)));
        assert!(err.to_string().contains("notes.txt"));
    }

    #[test]
    fn test_truncated_image_is_a_decode_error() {
        let mut bytes = png_bytes(100, 100);
        bytes.truncate(40);
        let err = pipeline().process("cut.png", &bytes).unwrap_err();
        assert!(matches!(err, ImageError::Decode { .. }));
    }
}
