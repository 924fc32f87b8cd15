//! Exclusive ownership of live devices

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::{GlimpseError, Result};

/// Devices currently held. Owned by the caller and cloned into presenters.
#[derive(Clone, Default, Debug)]
pub struct DeviceLeases {
    held: Arc<Mutex<HashSet<String>>>,
}

impl DeviceLeases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, device: &str) -> Result<Lease> {
        if !lock(&self.held).insert(device.to_string()) {
            return Err(GlimpseError::StreamAlreadyAcquired(device.to_string()));
        }
        debug!("Lease acquired on {}", device);
        Ok(Lease {
            device: device.to_string(),
            held: self.held.clone(),
        })
    }

    pub fn is_held(&self, device: &str) -> bool {
        lock(&self.held).contains(device)
    }
}

/// Released on drop
#[derive(Debug)]
pub struct Lease {
    device: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl Lease {
    pub fn device(&self) -> &str {
        &self.device
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        lock(&self.held).remove(&self.device);
        debug!("Lease released on {}", self.device);
    }
}

// A poisoned set is still a valid set of names
fn lock(held: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    held.lock().unwrap_or_else(|e| e.into_inner())
}
