//! Deterministic PNG writer.
//!
//! Fixed compression and filter settings so the same buffer always
//! encodes to the same bytes.

use std::io::Write;
use std::path::Path;

use png::{BitDepth, ColorType, Compression, Encoder, FilterType};
use thiserror::Error;

use crate::buffer::{GrayBuffer, RgbBuffer};

/// Errors from PNG encoding.
#[derive(Debug, Error)]
pub enum PngError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding error: {0}")]
    Encoding(#[from] png::EncodingError),
}

/// Encoder settings. One fixed configuration; varying it would break
/// byte-stable output across runs.
#[derive(Debug, Clone)]
pub struct PngConfig {
    /// Compression level.
    pub compression: Compression,
    /// Row filter.
    pub filter: FilterType,
}

impl Default for PngConfig {
    fn default() -> Self {
        Self {
            compression: Compression::Default,
            filter: FilterType::NoFilter,
        }
    }
}

/// Writes an RGB buffer to a PNG file.
pub fn write_rgb(buffer: &RgbBuffer, path: &Path, config: &PngConfig) -> Result<(), PngError> {
    let file = std::fs::File::create(path)?;
    write_rgb_to_writer(buffer, std::io::BufWriter::new(file), config)
}

/// Writes an RGB buffer to any writer.
pub fn write_rgb_to_writer<W: Write>(
    buffer: &RgbBuffer,
    writer: W,
    config: &PngConfig,
) -> Result<(), PngError> {
    let mut encoder = Encoder::new(writer, buffer.size, buffer.size);
    encoder.set_color(ColorType::Rgb);
    encoder.set_depth(BitDepth::Eight);
    encoder.set_compression(config.compression);
    encoder.set_filter(config.filter);
    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&buffer.to_bytes())?;
    Ok(())
}

/// Writes a grayscale buffer to a PNG file.
pub fn write_grayscale(
    buffer: &GrayBuffer,
    path: &Path,
    config: &PngConfig,
) -> Result<(), PngError> {
    let file = std::fs::File::create(path)?;
    write_grayscale_to_writer(buffer, std::io::BufWriter::new(file), config)
}

/// Writes a grayscale buffer to any writer.
pub fn write_grayscale_to_writer<W: Write>(
    buffer: &GrayBuffer,
    writer: W,
    config: &PngConfig,
) -> Result<(), PngError> {
    let mut encoder = Encoder::new(writer, buffer.size, buffer.size);
    encoder.set_color(ColorType::Grayscale);
    encoder.set_depth(BitDepth::Eight);
    encoder.set_compression(config.compression);
    encoder.set_filter(config.filter);
    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&buffer.to_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(size: u32) -> RgbBuffer {
        let mut buffer = RgbBuffer::new(size, [0, 0, 0]);
        for y in 0..size {
            for x in 0..size {
                let v = ((x + y) * 255 / (2 * size - 2)) as u8;
                buffer.set(x, y, [v, v, 128]);
            }
        }
        buffer
    }

    #[test]
    fn encoding_is_byte_stable() {
        let buffer = gradient(64);
        let config = PngConfig::default();

        let mut first = Vec::new();
        let mut second = Vec::new();
        write_rgb_to_writer(&buffer, &mut first, &config).unwrap();
        write_rgb_to_writer(&buffer, &mut second, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn grayscale_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roughness.png");
        let buffer = GrayBuffer::new(16, 160);
        write_grayscale(&buffer, &path, &PngConfig::default()).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
