//! Grayscale transform with format-preserving re-encode.

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use thiserror::Error;

/// Errors raised while transforming an image.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Could not determine image format")]
    UnknownFormat,
}

impl From<ProcessingError> for graymill_core::AppError {
    fn from(err: ProcessingError) -> Self {
        graymill_core::AppError::ImageProcessing(err.to_string())
    }
}

/// Grayscale transformer
///
/// Decodes the raw bytes, converts to grayscale, and re-encodes in the
/// decoded format. The output format is never re-derived from filenames or
/// URLs; whatever the bytes actually decoded as is what is written back.
pub struct GrayscaleTransformer;

impl GrayscaleTransformer {
    /// Apply the transform. Returns the encoded bytes and the preserved
    /// format.
    pub fn apply(data: &[u8]) -> Result<(Bytes, ImageFormat), ProcessingError> {
        let cursor = Cursor::new(data);
        let reader = ImageReader::new(cursor)
            .with_guessed_format()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;
        let format = reader.format().ok_or(ProcessingError::UnknownFormat)?;
        let img = reader
            .decode()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;

        let gray = img.grayscale();

        // The GIF and WebP encoders reject luma buffers; widen the gray
        // pixels back to RGBA for those formats.
        let encodable = match format {
            ImageFormat::Gif | ImageFormat::WebP => DynamicImage::ImageRgba8(gray.to_rgba8()),
            _ => gray,
        };

        let mut buffer = Vec::with_capacity(data.len());
        encodable.write_to(&mut Cursor::new(&mut buffer), format)?;

        tracing::debug!(
            format = ?format,
            input_bytes = data.len(),
            output_bytes = buffer.len(),
            "Grayscale transform applied"
        );

        Ok((Bytes::from(buffer), format))
    }

    /// MIME type of the preserved format, for the processed object's
    /// content type.
    pub fn content_type(format: ImageFormat) -> &'static str {
        format.to_mime_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn encode_test_image(format: ImageFormat) -> Vec<u8> {
        let mut img = RgbImage::new(8, 8);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 30) as u8, (y * 30) as u8, 200]);
        }
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), format)
            .unwrap();
        buffer
    }

    fn assert_grayscale(data: &[u8], expected_format: ImageFormat) {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .unwrap();
        assert_eq!(reader.format(), Some(expected_format));

        let decoded = reader.decode().unwrap();
        for (_, _, pixel) in decoded.to_rgb8().enumerate_pixels().map(|(x, y, p)| (x, y, *p)) {
            let Rgb([r, g, b]) = pixel;
            // Lossy codecs wobble a little; channels must still be equal-ish.
            assert!(r.abs_diff(g) <= 3 && g.abs_diff(b) <= 3, "pixel not gray: {:?}", pixel);
        }
        let _ = decoded.dimensions();
    }

    #[test]
    fn test_png_grayscale_preserves_format() {
        let input = encode_test_image(ImageFormat::Png);
        let (output, format) = GrayscaleTransformer::apply(&input).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_grayscale(&output, ImageFormat::Png);
    }

    #[test]
    fn test_jpeg_grayscale_preserves_format() {
        let input = encode_test_image(ImageFormat::Jpeg);
        let (output, format) = GrayscaleTransformer::apply(&input).unwrap();
        assert_eq!(format, ImageFormat::Jpeg);
        assert_grayscale(&output, ImageFormat::Jpeg);
    }

    #[test]
    fn test_gif_grayscale_preserves_format() {
        let input = encode_test_image(ImageFormat::Gif);
        let (output, format) = GrayscaleTransformer::apply(&input).unwrap();
        assert_eq!(format, ImageFormat::Gif);
        // GIF quantizes; just verify it decodes as a GIF again.
        let reader = ImageReader::new(Cursor::new(output.as_ref()))
            .with_guessed_format()
            .unwrap();
        assert_eq!(reader.format(), Some(ImageFormat::Gif));
        reader.decode().unwrap();
    }

    #[test]
    fn test_transform_is_deterministic() {
        let input = encode_test_image(ImageFormat::Png);
        let (first, _) = GrayscaleTransformer::apply(&input).unwrap();
        let (second, _) = GrayscaleTransformer::apply(&input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_garbage_input_fails_to_decode() {
        let result = GrayscaleTransformer::apply(b"definitely not an image");
        assert!(matches!(
            result,
            Err(ProcessingError::Decode(_) | ProcessingError::UnknownFormat)
        ));
    }

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(
            GrayscaleTransformer::content_type(ImageFormat::Jpeg),
            "image/jpeg"
        );
        assert_eq!(
            GrayscaleTransformer::content_type(ImageFormat::Png),
            "image/png"
        );
    }
}
