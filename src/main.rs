//! Glimpse: interactive capture and annotation with a headless frontend

mod cli;

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use glimpse::annotate::{self, ImageInput};
use glimpse::capture::{self, codec, DeviceLeases, VideoGrabber, Webcam};
use glimpse::clipboard;
use glimpse::display::{
    self, scripted, Bridge, FrontendHandle, NamedWindows, ScriptedFrontend, Teardown,
};
use glimpse::Config;

use cli::{AppArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("glimpse=info")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_writer(std::io::stderr)
        .init();

    let args = AppArgs::parse();
    let config = Config::load(args.config.as_deref())?;
    info!("Glimpse launching: {:?}", args.command);

    let leases = DeviceLeases::new();

    match args.command {
        Command::Annotate {
            image,
            script,
            format,
            keep,
        } => {
            let (bridge, frontend) = spawn_frontend(Some(script.as_path()), &config)?;
            let teardown = if keep {
                Teardown::Keep
            } else {
                config.display.teardown
            };
            let format = format.unwrap_or(config.display.format);
            let boxes =
                annotate::label_image(&bridge, ImageInput::Path(image), format, teardown).await?;
            finish(bridge, frontend)?;
            println!("{}", serde_json::to_string_pretty(&boxes)?);
        }
        Command::Snapshot { script, out } => {
            let (bridge, frontend) = spawn_frontend(Some(script.as_path()), &config)?;
            let source = capture::open_source(&config.capture)?;
            let mut webcam = Webcam::new(source, leases, bridge.clone(), &config.capture);
            let frame = webcam.capture().await?;
            drop(webcam);
            finish(bridge, frontend)?;
            tokio::fs::write(&out, &frame.data).await?;
            info!("Snapshot written to {}", out.display());
        }
        Command::Grab {
            frames,
            settle_ms,
            out_dir,
        } => {
            let (bridge, frontend) = spawn_frontend(None, &config)?;
            let settle = Duration::from_millis(settle_ms.unwrap_or(config.capture.settle_ms));
            tokio::fs::create_dir_all(&out_dir).await?;

            let source = capture::open_source(&config.capture)?;
            let mut grabber = VideoGrabber::start(source, &leases, bridge.clone(), &config.capture)?;
            for _ in 0..frames {
                let frame = grabber.next_frame(settle).await?;
                let path = out_dir.join(format!("frame_{:05}.jpg", frame.meta.sequence));
                tokio::fs::write(&path, &frame.data).await?;
            }
            grabber.stop()?;
            drop(grabber);
            finish(bridge, frontend)?;
            info!("{} frames written to {}", frames, out_dir.display());
        }
        Command::Show { name, images } => {
            let (bridge, frontend) = spawn_frontend(None, &config)?;
            let mut windows = NamedWindows::new(bridge.clone());
            for path in &images {
                let image = image::open(path)?;
                windows.show(&name, codec::encode(&image, config.display.format)?)?;
            }
            drop(windows);
            let tree = finish(bridge, frontend)?;
            println!(
                "{} image(s) shown, {} surface(s) on screen",
                images.len(),
                tree.len()
            );
        }
        Command::Record { script } => {
            let (bridge, frontend) = spawn_frontend(Some(script.as_path()), &config)?;
            let clip = capture::record_audio(&bridge).await?;
            finish(bridge, frontend)?;
            println!(
                "{} samples, {} Hz, {} channel(s), {:.2}s",
                clip.samples.len(),
                clip.sample_rate,
                clip.channels,
                clip.duration_secs()
            );
        }
        Command::Clipboard { file, script } => {
            let (bridge, frontend) = spawn_frontend(Some(script.as_path()), &config)?;
            let copied = clipboard::copy_to_clipboard(&bridge, &file).await?;
            finish(bridge, frontend)?;
            println!("{copied} bytes copied");
        }
    }

    info!("Glimpse shutting down");
    Ok(())
}

fn spawn_frontend(script: Option<&Path>, config: &Config) -> Result<(Bridge, FrontendHandle)> {
    let events = match script {
        Some(path) => scripted::load_script(path)?,
        None => Vec::new(),
    };
    let (bridge, endpoint) = display::bridge::channel();
    let handle = ScriptedFrontend::new(endpoint, events)
        .with_scale(config.display.scale)
        .spawn();
    Ok((bridge, handle))
}

fn finish(bridge: Bridge, frontend: FrontendHandle) -> Result<display::SurfaceTree> {
    drop(bridge);
    Ok(frontend.join()?)
}
