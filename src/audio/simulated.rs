// Simulated platform backend
//
// Capability provider, microphone and media provider that run entirely on
// tokio time. Used by the demo binary and the test suite; each piece can be
// slowed down or made to fail so every session error path is reachable.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn};

use super::backend::{
    AudioRouting, AudioUri, CapabilityProvider, MediaProvider, MediaResource, MicrophoneDevice,
    MicrophoneStream, PermissionStatus, PlaybackEvent, RecordingOptions, Release,
};
use super::clocked::ClockedResource;
use super::counters::{CounterSnapshot, ResourceCounters};

async fn pause_for(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Capability provider with a fixed answer
pub struct SimulatedCapabilities {
    permission: PermissionStatus,
    routing_error: Option<String>,
    delay: Duration,
    requests: AtomicUsize,
    last_routing: std::sync::Mutex<Option<AudioRouting>>,
}

impl SimulatedCapabilities {
    pub fn granting() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            routing_error: None,
            delay: Duration::ZERO,
            requests: AtomicUsize::new(0),
            last_routing: std::sync::Mutex::new(None),
        }
    }

    pub fn denying() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            ..Self::granting()
        }
    }

    /// Delay every permission request by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn rejecting_routing(mut self, reason: impl Into<String>) -> Self {
        self.routing_error = Some(reason.into());
        self
    }

    /// Number of permission requests served
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn last_routing(&self) -> Option<AudioRouting> {
        *crate::util::lock(&self.last_routing)
    }
}

#[async_trait::async_trait]
impl CapabilityProvider for SimulatedCapabilities {
    async fn request_microphone_permission(&self) -> Result<PermissionStatus> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        pause_for(self.delay).await;
        Ok(self.permission)
    }

    async fn set_audio_routing(&self, routing: AudioRouting) -> Result<()> {
        if let Some(reason) = &self.routing_error {
            bail!("{}", reason);
        }
        *crate::util::lock(&self.last_routing) = Some(routing);
        Ok(())
    }
}

/// Microphone that "records" silence and writes it out as a WAV file
pub struct SimulatedMicrophone {
    output_dir: PathBuf,
    open_delay: Duration,
    finalize_delay: Duration,
    open_error: Option<String>,
    fail_finalize: bool,
    counters: Arc<ResourceCounters>,
}

impl SimulatedMicrophone {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            open_delay: Duration::ZERO,
            finalize_delay: Duration::ZERO,
            open_error: None,
            fail_finalize: false,
            counters: Arc::new(ResourceCounters::default()),
        }
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn with_finalize_delay(mut self, delay: Duration) -> Self {
        self.finalize_delay = delay;
        self
    }

    pub fn failing_open(mut self, reason: impl Into<String>) -> Self {
        self.open_error = Some(reason.into());
        self
    }

    /// Make every capture fail to finalize
    pub fn failing_finalize(mut self) -> Self {
        self.fail_finalize = true;
        self
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}

#[async_trait::async_trait]
impl MicrophoneDevice for SimulatedMicrophone {
    async fn open(&self, options: RecordingOptions) -> Result<Arc<dyn MicrophoneStream>> {
        pause_for(self.open_delay).await;
        if let Some(reason) = &self.open_error {
            bail!("{}", reason);
        }

        self.counters.record_acquire();
        info!(
            "Simulated microphone opened ({}Hz, {} channels)",
            options.sample_rate, options.channels
        );

        Ok(Arc::new(SimulatedCapture {
            output_dir: self.output_dir.clone(),
            options,
            started_at: Instant::now(),
            finalize_delay: self.finalize_delay,
            fail_finalize: self.fail_finalize,
            finalized: AtomicBool::new(false),
            counters: Arc::clone(&self.counters),
        }))
    }

    fn name(&self) -> &str {
        "simulated microphone"
    }
}

struct SimulatedCapture {
    output_dir: PathBuf,
    options: RecordingOptions,
    started_at: Instant,
    finalize_delay: Duration,
    fail_finalize: bool,
    finalized: AtomicBool,
    counters: Arc<ResourceCounters>,
}

#[async_trait::async_trait]
impl MicrophoneStream for SimulatedCapture {
    async fn finalize(&self) -> Result<AudioUri> {
        self.counters.record_operation();
        let captured = self.started_at.elapsed();
        pause_for(self.finalize_delay).await;

        if self.finalized.swap(true, Ordering::SeqCst) {
            bail!("capture was already finalized");
        }
        if self.fail_finalize {
            bail!("encoder rejected the capture");
        }

        let path = write_silence(&self.output_dir, self.options, captured)?;
        Ok(AudioUri::from_path(path))
    }
}

impl Release for SimulatedCapture {
    fn release(&self) {
        self.counters.record_release();
        info!("Simulated microphone released");
    }
}

/// Write `length` of 16-bit silence as a WAV file in `dir`
fn write_silence(dir: &Path, options: RecordingOptions, length: Duration) -> Result<PathBuf> {
    fs::create_dir_all(dir).context("Failed to create recordings directory")?;

    let path = dir.join(format!("recording-{}.wav", uuid::Uuid::new_v4()));
    let spec = hound::WavSpec {
        channels: options.channels,
        sample_rate: options.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&path, spec)
        .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

    let frames = (length.as_secs_f64() * options.sample_rate as f64) as u64;
    for _ in 0..frames * options.channels as u64 {
        writer
            .write_sample(0i16)
            .context("Failed to write sample to WAV")?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;

    info!(
        "Recording written to {} ({:.1}s)",
        path.display(),
        length.as_secs_f64()
    );

    Ok(path)
}

/// Media provider serving a fixed catalog of URIs
pub struct SimulatedMediaProvider {
    tracks: HashMap<AudioUri, Duration>,
    interval: Duration,
    load_delay: Duration,
    counters: Arc<ResourceCounters>,
}

impl SimulatedMediaProvider {
    /// `interval` is how often loaded resources report their position
    pub fn new(interval: Duration) -> Self {
        Self {
            tracks: HashMap::new(),
            interval,
            load_delay: Duration::ZERO,
            counters: Arc::new(ResourceCounters::default()),
        }
    }

    pub fn with_track(mut self, uri: AudioUri, duration_seconds: f64) -> Self {
        self.tracks
            .insert(uri, Duration::from_secs_f64(duration_seconds.max(0.0)));
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}

#[async_trait::async_trait]
impl MediaProvider for SimulatedMediaProvider {
    async fn load(
        &self,
        uri: &AudioUri,
        events: mpsc::Sender<PlaybackEvent>,
    ) -> Result<Arc<dyn MediaResource>> {
        pause_for(self.load_delay).await;

        let Some(duration) = self.tracks.get(uri) else {
            warn!("Simulated provider has no media at {}", uri);
            bail!("no media at {}", uri);
        };

        let resource = ClockedResource::start(
            uri.clone(),
            *duration,
            self.interval,
            events,
            Arc::clone(&self.counters),
        );
        Ok(resource)
    }

    fn name(&self) -> &str {
        "simulated media"
    }
}
