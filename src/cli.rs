use std::path::PathBuf;

use clap::{Parser, Subcommand};

use glimpse::capture::ImageFormat;

/// Interactive capture and annotation, driven by a recorded operator script.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct AppArgs {
    /// TOML configuration file layered over the defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Collect labelled boxes on an image and print them as JSON.
    Annotate {
        image: PathBuf,
        /// Operator events, one JSON value per line.
        #[arg(long)]
        script: PathBuf,
        /// Encoding used to show the image (png or jpeg).
        #[arg(long)]
        format: Option<ImageFormat>,
        /// Leave the annotator on screen after Finish.
        #[arg(long, default_value_t = false)]
        keep: bool,
    },
    /// Take one snapshot after the operator clicks the preview.
    Snapshot {
        #[arg(long)]
        script: PathBuf,
        #[arg(long, default_value = "snapshot.jpg")]
        out: PathBuf,
    },
    /// Grab a run of frames from a continuously open stream.
    Grab {
        #[arg(long, default_value_t = 5)]
        frames: u32,
        /// Settle delay per frame; defaults to the configured value.
        #[arg(long)]
        settle_ms: Option<u64>,
        #[arg(long, default_value = "frames")]
        out_dir: PathBuf,
    },
    /// Show images one after another in a single named window.
    Show {
        name: String,
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Record an audio clip handed over by the operator script.
    Record {
        #[arg(long)]
        script: PathBuf,
    },
    /// Copy a text file to the clipboard after a button press.
    Clipboard {
        file: PathBuf,
        #[arg(long)]
        script: PathBuf,
    },
}
