use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::capture::codec;
use crate::{GlimpseError, Result};

/// Captured frame - encoded bytes shared without copying
#[derive(Clone)]
pub struct CapturedFrame {
    /// Encoded image data
    pub data: Bytes,

    /// Frame metadata
    pub meta: Arc<FrameMetadata>,

    /// When the frame was grabbed
    pub timestamp: Instant,
}

/// Frame metadata
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

impl CapturedFrame {
    pub fn new(image: EncodedImage, sequence: u64) -> Self {
        Self {
            meta: Arc::new(FrameMetadata {
                sequence,
                width: image.width,
                height: image.height,
                format: image.format,
            }),
            data: image.data,
            timestamp: Instant::now(),
        }
    }

    /// Decode into an in-memory image. Ends the useful life of the frame.
    pub fn decode(&self) -> Result<DynamicImage> {
        codec::decode(&self.data)
    }

    pub fn encoded(&self) -> EncodedImage {
        EncodedImage {
            data: self.data.clone(),
            format: self.meta.format,
            width: self.meta.width,
            height: self.meta.height,
        }
    }
}

impl fmt::Debug for CapturedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedFrame")
            .field("bytes", &self.data.len())
            .field("meta", &self.meta)
            .finish()
    }
}

/// An image in one of the supported raster encodings
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: Bytes,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EncodedImage({:?}, {}x{}, {} bytes)",
            self.format,
            self.width,
            self.height,
            self.data.len()
        )
    }
}

/// Raster encodings we can put on a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
}

impl FromStr for ImageFormat {
    type Err = GlimpseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "gif" => Ok(ImageFormat::Gif),
            other => Err(GlimpseError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
        };
        f.write_str(name)
    }
}
