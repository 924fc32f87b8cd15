pub mod session;

use std::path::PathBuf;

use image::DynamicImage;
use tracing::{debug, info, instrument, warn};

use crate::capture::{codec, ImageFormat};
use crate::display::{Bridge, Expect, Overlay, SurfaceContent, SurfaceId, Teardown};
use crate::{GlimpseError, Result};

pub use session::{Annotation, AnnotationSession, ClickState, NormalizedBox, Step};

/// Image handed to the annotator
#[derive(Debug, Clone)]
pub enum ImageInput {
    Path(PathBuf),
    Image(DynamicImage),
}

impl ImageInput {
    pub fn load(self) -> Result<DynamicImage> {
        match self {
            ImageInput::Path(path) => Ok(image::open(path)?),
            ImageInput::Image(image) => Ok(image),
        }
    }
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        ImageInput::Path(path)
    }
}

impl From<DynamicImage> for ImageInput {
    fn from(image: DynamicImage) -> Self {
        ImageInput::Image(image)
    }
}

/// Show `input` and collect labelled boxes until the operator presses Finish
#[instrument(skip(bridge, input))]
pub async fn label_image(
    bridge: &Bridge,
    input: impl Into<ImageInput>,
    format: ImageFormat,
    teardown: Teardown,
) -> Result<Vec<Annotation>> {
    if format == ImageFormat::Gif {
        return Err(GlimpseError::UnsupportedFormat(format!(
            "{format} is not offered by the annotator"
        )));
    }
    let input: ImageInput = input.into();
    let image = input.load()?;
    let encoded = codec::encode(&image, format)?;

    let surface = SurfaceId::new();
    bridge.show(surface, SurfaceContent::Annotator { image: encoded })?;
    info!("Annotator {} shown", surface);

    let result = collect(bridge, surface).await;
    if teardown == Teardown::Remove {
        match &result {
            Ok(_) => bridge.remove(surface)?,
            // The frontend may already be gone
            Err(e) => {
                if let Err(remove) = bridge.remove(surface) {
                    debug!("Could not remove annotator {} after {}: {}", surface, e, remove);
                }
            }
        }
    }
    let annotations = result?;
    info!("Annotator {} finished with {} boxes", surface, annotations.len());
    Ok(annotations)
}

async fn collect(bridge: &Bridge, surface: SurfaceId) -> Result<Vec<Annotation>> {
    let mut session = AnnotationSession::new();
    loop {
        let event = bridge.next_event(surface, Expect::Annotation).await?;
        let step = match session.apply(event) {
            Ok(step) => step,
            Err(GlimpseError::InvalidEvent(reason)) => {
                warn!("Annotator {} dropped an event: {}", surface, reason);
                continue;
            }
            Err(e) => return Err(e),
        };
        match step {
            Step::Idle | Step::Committed => {}
            Step::Outline(rect) => bridge.overlay(surface, Overlay::Outline(rect))?,
            Step::Cleared => bridge.overlay(surface, Overlay::Clear)?,
            Step::Finished(annotations) => return Ok(annotations),
        }
    }
}
