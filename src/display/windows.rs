//! Named windows that update in place

use std::collections::HashMap;

use tracing::{debug, instrument};

use super::bridge::Bridge;
use super::protocol::{SurfaceContent, SurfaceId};
use crate::capture::EncodedImage;
use crate::Result;

/// Maps stable window names to the surface showing them
pub struct NamedWindows {
    bridge: Bridge,
    windows: HashMap<String, SurfaceId>,
}

impl NamedWindows {
    pub fn new(bridge: Bridge) -> Self {
        Self {
            bridge,
            windows: HashMap::new(),
        }
    }

    /// Create the window on first use, swap its content afterwards
    #[instrument(skip(self, image), fields(image = ?image))]
    pub fn show(&mut self, name: &str, image: EncodedImage) -> Result<SurfaceId> {
        let content = SurfaceContent::Image {
            image,
            caption: None,
        };
        match self.windows.get(name) {
            Some(&surface) => {
                debug!("Updating window {} in place", name);
                self.bridge.replace(surface, content)?;
                Ok(surface)
            }
            None => {
                let surface = SurfaceId::new();
                debug!("Creating window {} as {}", name, surface);
                self.bridge.show(surface, content)?;
                self.windows.insert(name.to_string(), surface);
                Ok(surface)
            }
        }
    }

    pub fn close(&mut self, name: &str) -> Result<bool> {
        match self.windows.remove(name) {
            Some(surface) => {
                self.bridge.remove(surface)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn surface(&self, name: &str) -> Option<SurfaceId> {
        self.windows.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
