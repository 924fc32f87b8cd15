//! Click-driven bounding box collection
//!
//! Two clicks draw a box, `Add` commits it under the current label, `Clear`
//! drops everything, `Finish` commits a ready box and ends the session.
//! Boxes are stored relative to the rendered surface, so they stay valid for
//! the source image at any display scale.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::display::{Extent, OperatorEvent, PixelRect};
use crate::{GlimpseError, Result};

/// Box relative to image size. Width/height keep their sign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "box")]
    pub bbox: NormalizedBox,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickState {
    AwaitingFirstCorner,
    AwaitingSecondCorner {
        first: Corner,
    },
    BoxReady {
        outline: PixelRect,
        bbox: NormalizedBox,
    },
}

/// What the orchestrator should do after an event
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Nothing to show
    Idle,
    /// Draw this outline as feedback
    Outline(PixelRect),
    /// An annotation was appended
    Committed,
    /// Remove all feedback
    Cleared,
    Finished(Vec<Annotation>),
}

#[derive(Debug)]
pub struct AnnotationSession {
    state: ClickState,
    annotations: Vec<Annotation>,
    finished: bool,
}

impl Default for AnnotationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationSession {
    pub fn new() -> Self {
        Self {
            state: ClickState::AwaitingFirstCorner,
            annotations: Vec::new(),
            finished: false,
        }
    }

    pub fn state(&self) -> ClickState {
        self.state
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn apply(&mut self, event: OperatorEvent) -> Result<Step> {
        if self.finished {
            return Err(GlimpseError::SessionMisuse("annotation session already finished"));
        }
        match event {
            OperatorEvent::Click { x, y, rendered } => self.click(x, y, rendered),
            OperatorEvent::Add { label } => Ok(self.add(label)),
            OperatorEvent::Finish { label } => Ok(Step::Finished(self.finish(label))),
            OperatorEvent::Clear => {
                self.clear();
                Ok(Step::Cleared)
            }
            other => {
                warn!("Ignoring {:?} during annotation", other);
                Ok(Step::Idle)
            }
        }
    }

    pub fn click(&mut self, x: f64, y: f64, rendered: Extent) -> Result<Step> {
        match self.state {
            ClickState::AwaitingFirstCorner => {
                self.state = ClickState::AwaitingSecondCorner {
                    first: Corner { x, y },
                };
                Ok(Step::Idle)
            }
            ClickState::AwaitingSecondCorner { first } => {
                if !(rendered.width > 0.0 && rendered.height > 0.0) {
                    return Err(GlimpseError::InvalidEvent(format!(
                        "click on a surface rendered at {}x{}",
                        rendered.width, rendered.height
                    )));
                }
                let outline = PixelRect {
                    x: first.x,
                    y: first.y,
                    width: x - first.x,
                    height: y - first.y,
                };
                let bbox = NormalizedBox {
                    x: first.x / rendered.width,
                    y: first.y / rendered.height,
                    width: (x - first.x) / rendered.width,
                    height: (y - first.y) / rendered.height,
                };
                self.state = ClickState::BoxReady { outline, bbox };
                Ok(Step::Outline(outline))
            }
            // A ready box waits for Add, Clear or Finish
            ClickState::BoxReady { .. } => Ok(Step::Idle),
        }
    }

    pub fn add(&mut self, label: String) -> Step {
        match self.state {
            ClickState::BoxReady { bbox, .. } => {
                self.commit(bbox, label);
                self.state = ClickState::AwaitingFirstCorner;
                Step::Committed
            }
            _ => {
                debug!("Add without a ready box");
                Step::Idle
            }
        }
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
        self.state = ClickState::AwaitingFirstCorner;
    }

    /// Commit a ready box and hand back everything in commit order.
    /// A half-drawn box is dropped.
    pub fn finish(&mut self, label: String) -> Vec<Annotation> {
        if let ClickState::BoxReady { bbox, .. } = self.state {
            self.commit(bbox, label);
        }
        self.state = ClickState::AwaitingFirstCorner;
        self.finished = true;
        std::mem::take(&mut self.annotations)
    }

    fn commit(&mut self, bbox: NormalizedBox, label: String) {
        debug!("Committing {:?} as {:?}", bbox, label);
        metrics::counter!("annotations_committed").increment(1);
        self.annotations.push(Annotation { bbox, label });
    }
}
