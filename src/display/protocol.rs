//! Typed messages between the orchestrator and a frontend

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capture::EncodedImage;

/// Identity of one rendered surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What a surface shows
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceContent {
    /// Still image or live preview, with an optional caption over it
    Image {
        image: EncodedImage,
        caption: Option<String>,
    },
    /// Image with Add / Finish / Clear buttons and a label box
    Annotator { image: EncodedImage },
    Button { label: String },
    Text(String),
}

impl SurfaceContent {
    pub fn image(&self) -> Option<&EncodedImage> {
        match self {
            SurfaceContent::Image { image, .. } | SurfaceContent::Annotator { image } => Some(image),
            _ => None,
        }
    }
}

/// Rendered size of a surface in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

/// Rectangle in screen pixels. Width and height keep their sign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Feedback drawn over a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Overlay {
    Outline(PixelRect),
    Clear,
}

/// Input from the operator
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorEvent {
    /// Pointer click relative to the surface's top-left corner
    Click { x: f64, y: f64, rendered: Extent },
    Add { label: String },
    Finish { label: String },
    Clear,
    /// Button press or click on a capture surface
    Trigger,
    /// Finished recording, as a WAV stream
    Recorded(Bytes),
}

/// Kind of input an await is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Trigger,
    Annotation,
    Recording,
}

/// What happens to a surface once its session finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Teardown {
    #[default]
    Remove,
    Keep,
}

/// Orchestrator -> frontend
#[derive(Debug)]
pub enum Command {
    Show {
        surface: SurfaceId,
        content: SurfaceContent,
    },
    /// Swap content without removing the surface
    Replace {
        surface: SurfaceId,
        content: SurfaceContent,
    },
    Overlay {
        surface: SurfaceId,
        overlay: Overlay,
    },
    Remove {
        surface: SurfaceId,
    },
    /// Resolve `reply` exactly once with the next operator event
    Await {
        surface: SurfaceId,
        expect: Expect,
        reply: flume::Sender<OperatorEvent>,
    },
    Clipboard {
        text: String,
    },
    /// Answered after every earlier command has been applied
    Flush {
        reply: flume::Sender<()>,
    },
}
