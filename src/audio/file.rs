use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::{Hint, ProbeResult};
use symphonia::core::units::TimeBase;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::backend::{AudioUri, MediaProvider, MediaResource, PlaybackEvent};
use super::clocked::ClockedResource;
use super::counters::{CounterSnapshot, ResourceCounters};

/// Container-level facts about a local audio file
#[derive(Debug, Clone)]
pub struct AudioFile {
    /// Path the file was probed from
    pub path: String,
    /// Length derived from the container, or from its packets
    pub duration_seconds: f64,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 when the container does not say)
    pub channels: u16,
}

impl AudioFile {
    /// Probe `path`, checking that a decoder exists for its first audio track
    pub fn probe(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Probing audio file: {}", path.display());

        let mut probed = open_format(path)?;

        let track = probed
            .format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .context("No audio track found")?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .context("No decoder available for audio track")?;

        let sample_rate = params.sample_rate.context("Audio track has no sample rate")?;
        let channels = params.channels.map(|c| c.count() as u16).unwrap_or(1);

        let duration_seconds = match params.n_frames {
            Some(frames) => frames as f64 / sample_rate as f64,
            None => {
                // Streams such as ADTS or some MP3s carry no frame count
                debug!("{} reports no frame count, scanning packets", path.display());
                scan_duration(
                    probed.format.as_mut(),
                    track_id,
                    params.time_base,
                    sample_rate,
                )
            }
        };

        info!(
            "Audio file probed: {:.1}s, {}Hz, {} channels",
            duration_seconds, sample_rate, channels
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate,
            channels,
        })
    }
}

fn open_format(path: &Path) -> Result<ProbeResult> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Unsupported or corrupt audio container")
}

/// Sum packet durations of `track_id` until the end of the stream
fn scan_duration(
    format: &mut dyn FormatReader,
    track_id: u32,
    time_base: Option<TimeBase>,
    sample_rate: u32,
) -> f64 {
    let mut ticks = 0u64;
    while let Ok(packet) = format.next_packet() {
        if packet.track_id() == track_id {
            ticks += packet.dur;
        }
    }

    match time_base {
        Some(time_base) => {
            let time = time_base.calc_time(ticks);
            time.seconds as f64 + time.frac
        }
        None => ticks as f64 / sample_rate as f64,
    }
}

/// Media provider for local files (`file://` URIs or bare paths)
pub struct FileMediaProvider {
    interval: Duration,
    counters: Arc<ResourceCounters>,
}

impl FileMediaProvider {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            counters: Arc::new(ResourceCounters::default()),
        }
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}

#[async_trait::async_trait]
impl MediaProvider for FileMediaProvider {
    async fn load(
        &self,
        uri: &AudioUri,
        events: mpsc::Sender<PlaybackEvent>,
    ) -> Result<Arc<dyn MediaResource>> {
        let path = uri
            .to_path()
            .unwrap_or_else(|| PathBuf::from(uri.as_str()));

        let audio = tokio::task::spawn_blocking(move || AudioFile::probe(path))
            .await
            .context("Probe task panicked")??;

        let resource = ClockedResource::start(
            uri.clone(),
            Duration::from_secs_f64(audio.duration_seconds),
            self.interval,
            events,
            Arc::clone(&self.counters),
        );
        Ok(resource)
    }

    fn name(&self) -> &str {
        "local files"
    }
}
