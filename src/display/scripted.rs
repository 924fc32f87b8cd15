//! Headless frontend replaying a recorded operator script
//!
//! Surfaces are kept in a [`SurfaceTree`]; a snapshot is republished after
//! every command so observers can read it without blocking the frontend.

use std::collections::{BTreeMap, VecDeque};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use arc_swap::ArcSwap;
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::bridge::FrontendEndpoint;
use super::protocol::{
    Command, Expect, Extent, OperatorEvent, Overlay, PixelRect, SurfaceContent, SurfaceId,
};
use crate::Result;

/// One line of an operator script
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptEvent {
    /// Click in rendered pixels
    Click { x: f64, y: f64 },
    Add { label: String },
    Finish { label: String },
    Clear,
    Trigger,
    /// WAV file handed over as the recording
    Recorded { path: PathBuf },
}

/// Parse JSON lines, skipping blanks and `#` comments
pub fn parse_script(reader: impl BufRead) -> Result<Vec<ScriptEvent>> {
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        events.push(serde_json::from_str(line)?);
    }
    Ok(events)
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptEvent>> {
    let file = std::fs::File::open(path)?;
    parse_script(std::io::BufReader::new(file))
}

#[derive(Debug, Clone)]
pub struct SurfaceState {
    pub content: SurfaceContent,
    pub outlines: Vec<PixelRect>,
    /// Number of in-place content swaps
    pub revisions: u32,
}

/// Everything the frontend currently shows
#[derive(Debug, Clone, Default)]
pub struct SurfaceTree {
    pub surfaces: BTreeMap<SurfaceId, SurfaceState>,
    pub clipboard: Option<String>,
    /// Surfaces ever created, removed ones included
    pub created: u32,
    /// Await requests left unanswered because the script ran out
    pub unanswered: u32,
}

impl SurfaceTree {
    pub fn get(&self, surface: &SurfaceId) -> Option<&SurfaceState> {
        self.surfaces.get(surface)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

pub struct ScriptedFrontend {
    endpoint: FrontendEndpoint,
    script: VecDeque<ScriptEvent>,
    /// Rendered size relative to image size
    scale: f64,
    tree: SurfaceTree,
    published: Arc<ArcSwap<SurfaceTree>>,
}

impl ScriptedFrontend {
    pub fn new(endpoint: FrontendEndpoint, script: Vec<ScriptEvent>) -> Self {
        Self {
            endpoint,
            script: script.into(),
            scale: 1.0,
            tree: SurfaceTree::default(),
            published: Arc::new(ArcSwap::from_pointee(SurfaceTree::default())),
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Run on a dedicated thread until every bridge is dropped
    pub fn spawn(self) -> FrontendHandle {
        let published = self.published.clone();
        let thread = thread::Builder::new()
            .name("scripted-frontend".into())
            .spawn(move || self.run());
        FrontendHandle { thread, published }
    }

    pub fn run(mut self) -> SurfaceTree {
        info!("Scripted frontend running ({} events)", self.script.len());
        while let Some(command) = self.endpoint.recv() {
            self.apply(command);
            self.published.store(Arc::new(self.tree.clone()));
        }
        if !self.script.is_empty() {
            warn!("{} script events were never consumed", self.script.len());
        }
        self.tree
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Show { surface, content } => {
                self.tree.created += 1;
                self.tree.surfaces.insert(
                    surface,
                    SurfaceState {
                        content,
                        outlines: Vec::new(),
                        revisions: 0,
                    },
                );
            }
            Command::Replace { surface, content } => match self.tree.surfaces.get_mut(&surface) {
                Some(state) => {
                    state.content = content;
                    state.revisions += 1;
                }
                None => warn!("Replace on unknown surface {}", surface),
            },
            Command::Overlay { surface, overlay } => match self.tree.surfaces.get_mut(&surface) {
                Some(state) => match overlay {
                    Overlay::Outline(rect) => state.outlines.push(rect),
                    Overlay::Clear => state.outlines.clear(),
                },
                None => warn!("Overlay on unknown surface {}", surface),
            },
            Command::Remove { surface } => {
                if self.tree.surfaces.remove(&surface).is_none() {
                    debug!("Remove on unknown surface {}", surface);
                }
            }
            Command::Await {
                surface,
                expect,
                reply,
            } => match self.next_event(&surface, expect) {
                Some(event) => {
                    if reply.send(event).is_err() {
                        debug!("Orchestrator stopped waiting on {}", surface);
                    }
                }
                // Dropping `reply` tells the orchestrator nobody will answer
                None => self.tree.unanswered += 1,
            },
            Command::Clipboard { text } => self.tree.clipboard = Some(text),
            Command::Flush { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn next_event(&mut self, surface: &SurfaceId, expect: Expect) -> Option<OperatorEvent> {
        loop {
            let step = self.script.pop_front()?;
            match self.translate(surface, step) {
                Some(event) => {
                    debug!("Answering {:?} await with {:?}", expect, event);
                    return Some(event);
                }
                None => continue,
            }
        }
    }

    fn translate(&self, surface: &SurfaceId, step: ScriptEvent) -> Option<OperatorEvent> {
        Some(match step {
            ScriptEvent::Click { x, y } => OperatorEvent::Click {
                x,
                y,
                rendered: self.rendered_extent(surface),
            },
            ScriptEvent::Add { label } => OperatorEvent::Add { label },
            ScriptEvent::Finish { label } => OperatorEvent::Finish { label },
            ScriptEvent::Clear => OperatorEvent::Clear,
            ScriptEvent::Trigger => OperatorEvent::Trigger,
            ScriptEvent::Recorded { path } => match std::fs::read(&path) {
                Ok(data) => OperatorEvent::Recorded(Bytes::from(data)),
                Err(e) => {
                    warn!("Skipping recording {}: {}", path.display(), e);
                    return None;
                }
            },
        })
    }

    fn rendered_extent(&self, surface: &SurfaceId) -> Extent {
        let (w, h) = self
            .tree
            .get(surface)
            .and_then(|state| state.content.image())
            .map(|image| (image.width, image.height))
            .unwrap_or((0, 0));
        Extent {
            width: f64::from(w) * self.scale,
            height: f64::from(h) * self.scale,
        }
    }
}

/// Running frontend: live snapshot plus the final tree on join
pub struct FrontendHandle {
    thread: std::io::Result<JoinHandle<SurfaceTree>>,
    published: Arc<ArcSwap<SurfaceTree>>,
}

impl FrontendHandle {
    pub fn snapshot(&self) -> Arc<SurfaceTree> {
        self.published.load_full()
    }

    /// Wait for the frontend to drain. Drop every bridge first.
    pub fn join(self) -> Result<SurfaceTree> {
        let thread = self.thread?;
        thread
            .join()
            .map_err(|_| std::io::Error::other("scripted frontend panicked").into())
    }
}
