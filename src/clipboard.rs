use std::path::Path;

use tracing::{error, info, instrument};

use crate::display::{Bridge, Expect, OperatorEvent, SurfaceContent, SurfaceId};
use crate::Result;

/// Put a text file on the operator's clipboard once they press the button.
/// Clipboard writes need a focused page, hence the click.
#[instrument(skip(bridge))]
pub async fn copy_to_clipboard(bridge: &Bridge, path: &Path) -> Result<usize> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => {
            error!("Cannot read {}: {}", path.display(), e);
            return Err(e.into());
        }
    };

    let surface = SurfaceId::new();
    bridge.show(
        surface,
        SurfaceContent::Button {
            label: "Copy2Clipboard".into(),
        },
    )?;
    loop {
        if let OperatorEvent::Trigger | OperatorEvent::Click { .. } =
            bridge.next_event(surface, Expect::Trigger).await?
        {
            break;
        }
    }

    let len = text.len();
    bridge.clipboard(text)?;
    bridge.remove(surface)?;
    info!("Copied {} bytes from {}", len, path.display());
    Ok(len)
}
