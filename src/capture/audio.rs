//! Short audio clips recorded by the frontend
//!
//! The frontend hands over a WAV stream. Streaming encoders write it before
//! they know its length, so the RIFF size is rewritten and an oversize
//! `data` chunk is clamped to what actually arrived.

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use crate::display::{Bridge, Expect, OperatorEvent, SurfaceContent, SurfaceId};
use crate::{GlimpseError, Result};

const RECORDING_PROMPT: &str = "Recording... press to stop";

#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples
    pub samples: Vec<i16>,
}

impl AudioClip {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.channels) / f64::from(self.sample_rate)
    }

    /// Parse a PCM WAV stream, repairing streamed headers first
    pub fn from_wav(data: &[u8]) -> Result<Self> {
        let wav = repair_riff_size(data)?;
        parse_pcm(&wav)
    }
}

/// Show the stop button and wait for the recording
#[instrument(skip(bridge))]
pub async fn record_audio(bridge: &Bridge) -> Result<AudioClip> {
    let surface = SurfaceId::new();
    bridge.show(
        surface,
        SurfaceContent::Button {
            label: RECORDING_PROMPT.into(),
        },
    )?;

    let recording = loop {
        match bridge.next_event(surface, Expect::Recording).await? {
            OperatorEvent::Recorded(data) => break data,
            other => debug!("Still recording, ignoring {:?}", other),
        }
    };
    bridge.remove(surface)?;

    let clip = AudioClip::from_wav(&recording)?;
    info!(
        "Recorded {:.2}s at {} Hz, {} channel(s)",
        clip.duration_secs(),
        clip.sample_rate,
        clip.channels
    );
    Ok(clip)
}

/// Bytes 4..8 become `len - 8`, little endian
pub fn repair_riff_size(data: &[u8]) -> Result<Bytes> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(GlimpseError::InvalidAudio("missing RIFF/WAVE header".into()));
    }
    let size = u32::try_from(data.len() - 8)
        .map_err(|_| GlimpseError::InvalidAudio("stream larger than 4 GiB".into()))?;
    let mut fixed = data.to_vec();
    fixed[4..8].copy_from_slice(&size.to_le_bytes());
    Ok(Bytes::from(fixed))
}

struct Format {
    tag: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

fn parse_pcm(wav: &[u8]) -> Result<AudioClip> {
    let mut format: Option<Format> = None;
    let mut pos = 12;

    while pos + 8 <= wav.len() {
        let id = &wav[pos..pos + 4];
        let declared = read_u32(wav, pos + 4) as usize;
        let body_start = pos + 8;
        let available = wav.len() - body_start;
        let len = if declared > available {
            warn!(
                "Chunk {:?} declares {} bytes, {} available",
                String::from_utf8_lossy(id),
                declared,
                available
            );
            available
        } else {
            declared
        };
        let body = &wav[body_start..body_start + len];

        match id {
            b"fmt " => {
                if body.len() < 16 {
                    return Err(GlimpseError::InvalidAudio("short fmt chunk".into()));
                }
                format = Some(Format {
                    tag: read_u16(body, 0),
                    channels: read_u16(body, 2),
                    sample_rate: read_u32(body, 4),
                    bits_per_sample: read_u16(body, 14),
                });
            }
            b"data" => {
                let format = format
                    .as_ref()
                    .ok_or_else(|| GlimpseError::InvalidAudio("data before fmt".into()))?;
                return decode_samples(format, body);
            }
            other => debug!("Skipping chunk {:?}", String::from_utf8_lossy(other)),
        }

        // Chunks are word aligned
        pos = body_start + len + (len & 1);
    }

    Err(GlimpseError::InvalidAudio("no data chunk".into()))
}

fn decode_samples(format: &Format, body: &[u8]) -> Result<AudioClip> {
    // 1 = integer PCM
    if format.tag != 1 {
        return Err(GlimpseError::UnsupportedFormat(format!(
            "WAV encoding tag {}",
            format.tag
        )));
    }
    if format.channels == 0 {
        return Err(GlimpseError::InvalidAudio("zero channels".into()));
    }
    let samples = match format.bits_per_sample {
        8 => body.iter().map(|&s| (i16::from(s) - 128) << 8).collect(),
        16 => body
            .chunks_exact(2)
            .map(|s| i16::from_le_bytes([s[0], s[1]]))
            .collect(),
        bits => {
            return Err(GlimpseError::UnsupportedFormat(format!(
                "{bits}-bit PCM"
            )))
        }
    };
    Ok(AudioClip {
        sample_rate: format.sample_rate,
        channels: format.channels,
        samples,
    })
}

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}
