pub mod bridge;
pub mod protocol;
pub mod scripted;
pub mod windows;

pub use bridge::{Bridge, FrontendEndpoint, Pending};
pub use protocol::{
    Command, Expect, Extent, OperatorEvent, Overlay, PixelRect, SurfaceContent, SurfaceId,
    Teardown,
};
pub use scripted::{FrontendHandle, ScriptEvent, ScriptedFrontend, SurfaceTree};
pub use windows::NamedWindows;
