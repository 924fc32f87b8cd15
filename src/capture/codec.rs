use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use super::frame::{EncodedImage, ImageFormat};
use crate::Result;

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<EncodedImage> {
    match format {
        ImageFormat::Jpeg => encode_jpeg(image, DEFAULT_JPEG_QUALITY),
        ImageFormat::Png => {
            let mut buf = Cursor::new(Vec::new());
            image.write_to(&mut buf, image::ImageFormat::Png)?;
            Ok(wrap(buf.into_inner(), format, image))
        }
        ImageFormat::Gif => {
            // GIF encoder only takes RGBA8
            let mut buf = Cursor::new(Vec::new());
            DynamicImage::ImageRgba8(image.to_rgba8()).write_to(&mut buf, image::ImageFormat::Gif)?;
            Ok(wrap(buf.into_inner(), format, image))
        }
    }
}

/// JPEG with an explicit quality in 1..=100
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<EncodedImage> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    // No alpha in JPEG
    DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?;
    Ok(wrap(buf, ImageFormat::Jpeg, image))
}

pub fn decode(data: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(data)?)
}

fn wrap(data: Vec<u8>, format: ImageFormat, image: &DynamicImage) -> EncodedImage {
    EncodedImage {
        data: Bytes::from(data),
        format,
        width: image.width(),
        height: image.height(),
    }
}
