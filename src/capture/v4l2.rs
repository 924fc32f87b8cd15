//! V4L2 camera as a live source

use std::path::Path;

use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use super::source::LiveSource;
use crate::{CaptureConfig, GlimpseError, Result};

/// Wire formats we can turn into RGB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Mjpeg,
    Yuyv,
}

impl PixelFormat {
    fn fourcc(self) -> FourCC {
        match self {
            PixelFormat::Mjpeg => FourCC::new(b"MJPG"),
            PixelFormat::Yuyv => FourCC::new(b"YUYV"),
        }
    }
}

// Detected capture device info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundDevice {
    pub path: String,
    pub format: PixelFormat,
}

impl FoundDevice {
    /// Inspect one device node, preferring MJPEG over YUYV
    pub fn probe(path: &str) -> Result<Self> {
        let dev = Device::with_path(path)?;
        let caps = dev.query_caps()?;
        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(GlimpseError::UnsupportedDevice(format!(
                "{path} cannot capture video"
            )));
        }
        let formats = dev.enum_formats()?;
        for wanted in [PixelFormat::Mjpeg, PixelFormat::Yuyv] {
            if formats.iter().any(|f| f.fourcc == wanted.fourcc()) {
                info!("Found {:?} device: {} - {}", wanted, path, caps.card);
                return Ok(Self {
                    path: path.to_string(),
                    format: wanted,
                });
            }
        }
        Err(GlimpseError::UnsupportedDevice(format!(
            "{path} offers neither MJPEG nor YUYV"
        )))
    }
}

/// Auto-detect best capture device
pub fn auto_detect_device() -> Result<FoundDevice> {
    info!("Auto-detecting capture devices...");

    for i in 0..10 {
        let path = format!("/dev/video{}", i);
        if !Path::new(&path).exists() {
            continue;
        }
        if let Ok(found) = FoundDevice::probe(&path) {
            return Ok(found);
        }
    }

    Err(GlimpseError::UnsupportedDevice(
        "no suitable capture device found".into(),
    ))
}

pub struct V4l2Source {
    device: Box<Device>,
    found: FoundDevice,
    stream: Option<MmapStream<'static>>,
    width: u32,
    height: u32,
    buffer_count: u32,
}

impl V4l2Source {
    pub fn new(found: FoundDevice, config: &CaptureConfig) -> Result<Self> {
        info!("Initializing V4L2 capture: {:?}", found);
        let device = Device::with_path(&found.path)?;

        let mut fmt = device.format()?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = found.format.fourcc();
        // The driver may round to the nearest size it supports
        let fmt = device.set_format(&fmt)?;

        Ok(Self {
            device: Box::new(device),
            found,
            stream: None,
            width: fmt.width,
            height: fmt.height,
            buffer_count: config.buffer_count,
        })
    }
}

impl LiveSource for V4l2Source {
    fn device(&self) -> &str {
        &self.found.path
    }

    fn open(&mut self) -> Result<()> {
        let stream = MmapStream::with_buffers(&self.device, Type::VideoCapture, self.buffer_count)?;
        self.stream = Some(stream);
        info!("Capture stream started with {} buffers", self.buffer_count);
        Ok(())
    }

    #[instrument(skip(self))]
    fn grab(&mut self) -> Result<DynamicImage> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| GlimpseError::StreamClosed(self.found.path.clone()))?;
        let (buf, _meta) = stream.next()?;

        match self.found.format {
            PixelFormat::Mjpeg => Ok(image::load_from_memory_with_format(
                buf,
                image::ImageFormat::Jpeg,
            )?),
            PixelFormat::Yuyv => yuyv_to_rgb(buf, self.width, self.height),
        }
    }

    fn close(&mut self) {
        self.stream = None;
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

fn yuyv_to_rgb(buf: &[u8], width: u32, height: u32) -> Result<DynamicImage> {
    let expected = (width * height * 2) as usize;
    if buf.len() < expected {
        return Err(GlimpseError::InvalidFrame(format!(
            "short YUYV buffer: {} of {} bytes",
            buf.len(),
            expected
        )));
    }
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for px in buf[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (px[0], px[1], px[2], px[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }
    RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| GlimpseError::InvalidFrame("YUYV frame size mismatch".into()))
}

// BT.601, integer approximation
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = i32::from(y) - 16;
    let d = i32::from(u) - 128;
    let e = i32::from(v) - 128;
    let clamp = |x: i32| x.clamp(0, 255) as u8;
    [
        clamp((298 * c + 409 * e + 128) >> 8),
        clamp((298 * c - 100 * d - 208 * e + 128) >> 8),
        clamp((298 * c + 516 * d + 128) >> 8),
    ]
}
