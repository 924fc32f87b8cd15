//! Orchestrator side of the display bridge

use flume::{Receiver, Sender, TryRecvError};
use tracing::{debug, trace};

use super::protocol::{Command, Expect, OperatorEvent, Overlay, SurfaceContent, SurfaceId};
use crate::{GlimpseError, Result};

/// Create a connected bridge / frontend pair
pub fn channel() -> (Bridge, FrontendEndpoint) {
    let (tx, rx) = flume::unbounded();
    (Bridge { tx }, FrontendEndpoint { rx })
}

/// Sends commands to a frontend. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bridge {
    tx: Sender<Command>,
}

impl Bridge {
    fn send(&self, command: Command) -> Result<()> {
        trace!("-> {:?}", command);
        self.tx.send(command).map_err(|_| GlimpseError::FrontendClosed)
    }

    pub fn show(&self, surface: SurfaceId, content: SurfaceContent) -> Result<()> {
        self.send(Command::Show { surface, content })
    }

    pub fn replace(&self, surface: SurfaceId, content: SurfaceContent) -> Result<()> {
        self.send(Command::Replace { surface, content })
    }

    pub fn overlay(&self, surface: SurfaceId, overlay: Overlay) -> Result<()> {
        self.send(Command::Overlay { surface, overlay })
    }

    pub fn remove(&self, surface: SurfaceId) -> Result<()> {
        self.send(Command::Remove { surface })
    }

    pub fn clipboard(&self, text: String) -> Result<()> {
        self.send(Command::Clipboard { text })
    }

    /// Ask for the next operator event on `surface`
    pub fn request(&self, surface: SurfaceId, expect: Expect) -> Result<Pending<OperatorEvent>> {
        let (reply, rx) = flume::bounded(1);
        self.send(Command::Await {
            surface,
            expect,
            reply,
        })?;
        Ok(Pending { rx })
    }

    /// Suspend until the operator acts on `surface`
    pub async fn next_event(&self, surface: SurfaceId, expect: Expect) -> Result<OperatorEvent> {
        let event = self.request(surface, expect)?.resolved().await?;
        debug!("Operator event on {}: {:?}", surface, event);
        Ok(event)
    }

    /// Wait until the frontend has applied everything sent so far
    pub async fn flush(&self) -> Result<()> {
        let (reply, rx) = flume::bounded(1);
        self.send(Command::Flush { reply })?;
        Pending { rx }.resolved().await
    }
}

/// A result the frontend resolves at most once
#[derive(Debug)]
pub struct Pending<T> {
    rx: Receiver<T>,
}

impl<T> Pending<T> {
    /// Block the current thread until resolved
    pub fn wait(self) -> Result<T> {
        self.rx.recv().map_err(|_| GlimpseError::FrontendClosed)
    }

    pub async fn resolved(self) -> Result<T> {
        self.rx
            .recv_async()
            .await
            .map_err(|_| GlimpseError::FrontendClosed)
    }

    /// `Ok(None)` while the frontend has not answered yet
    pub fn poll(&self) -> Result<Option<T>> {
        match self.rx.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(GlimpseError::FrontendClosed),
        }
    }
}

/// Frontend side of the bridge
#[derive(Debug)]
pub struct FrontendEndpoint {
    rx: Receiver<Command>,
}

impl FrontendEndpoint {
    /// Next command; `None` once every `Bridge` clone is gone
    pub fn recv(&self) -> Option<Command> {
        self.rx.recv().ok()
    }

    pub async fn recv_async(&self) -> Option<Command> {
        self.rx.recv_async().await.ok()
    }
}
