// Time-driven media resource
//
// Stands in for a platform decoder: it owns no samples, only a playback
// clock that advances on a tokio interval while playing and reports its
// position over the resource's event channel.

use anyhow::{bail, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::backend::{AudioUri, MediaResource, PlaybackEvent, Release};
use super::counters::ResourceCounters;
use crate::task::TaskHandle;
use crate::util::lock;

#[derive(Debug, Default)]
struct ClockState {
    playing: bool,
    position_ms: u64,
    released: bool,
}

pub struct ClockedResource {
    uri: AudioUri,
    duration_ms: u64,
    state: Arc<Mutex<ClockState>>,
    events: mpsc::Sender<PlaybackEvent>,
    counters: Arc<ResourceCounters>,
    clock: Mutex<Option<TaskHandle>>,
}

impl ClockedResource {
    /// Acquire a resource of `duration` and start its (paused) clock
    pub fn start(
        uri: AudioUri,
        duration: Duration,
        interval: Duration,
        events: mpsc::Sender<PlaybackEvent>,
        counters: Arc<ResourceCounters>,
    ) -> Arc<Self> {
        counters.record_acquire();

        let duration_ms = duration.as_millis() as u64;
        let state = Arc::new(Mutex::new(ClockState::default()));
        let clock = TaskHandle::spawn(
            "playback-clock",
            run_clock(Arc::clone(&state), duration_ms, interval, events.clone()),
        );

        if events.try_send(PlaybackEvent::Loaded).is_err() {
            debug!("No listener for Loaded event of {}", uri);
        }

        info!("Loaded {} ({:.1}s)", uri, duration.as_secs_f64());

        Arc::new(Self {
            uri,
            duration_ms,
            state,
            events,
            counters,
            clock: Mutex::new(Some(clock)),
        })
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    pub fn position_seconds(&self) -> f64 {
        lock(&self.state).position_ms as f64 / 1000.0
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.state).playing
    }
}

async fn run_clock(
    state: Arc<Mutex<ClockState>>,
    duration_ms: u64,
    interval: Duration,
    events: mpsc::Sender<PlaybackEvent>,
) {
    let step_ms = interval.as_millis().max(1) as u64;
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let emitted = {
            let mut clock = lock(&state);
            if clock.released {
                break;
            }
            if !clock.playing {
                continue;
            }

            clock.position_ms = (clock.position_ms + step_ms).min(duration_ms);
            if clock.position_ms >= duration_ms {
                // End of media rewinds so the next play starts over
                clock.playing = false;
                clock.position_ms = 0;
                vec![
                    PlaybackEvent::PositionUpdate(duration_ms as f64 / 1000.0),
                    PlaybackEvent::Completed,
                ]
            } else {
                vec![PlaybackEvent::PositionUpdate(clock.position_ms as f64 / 1000.0)]
            }
        };

        for event in emitted {
            if events.send(event).await.is_err() {
                return;
            }
        }
    }
}

#[async_trait::async_trait]
impl MediaResource for ClockedResource {
    async fn play(&self) -> Result<()> {
        self.counters.record_operation();
        let mut clock = lock(&self.state);
        if clock.released {
            bail!("{} was already released", self.uri);
        }
        clock.playing = true;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.counters.record_operation();
        let mut clock = lock(&self.state);
        if clock.released {
            bail!("{} was already released", self.uri);
        }
        clock.playing = false;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.counters.record_operation();
        {
            let mut clock = lock(&self.state);
            if clock.released {
                bail!("{} was already released", self.uri);
            }
            clock.playing = false;
            clock.position_ms = 0;
        }
        let _ = self.events.try_send(PlaybackEvent::PositionUpdate(0.0));
        Ok(())
    }
}

impl Release for ClockedResource {
    fn release(&self) {
        self.counters.record_release();
        {
            let mut clock = lock(&self.state);
            clock.released = true;
            clock.playing = false;
        }
        if let Some(mut task) = lock(&self.clock).take() {
            task.cancel();
        }
        info!("Released {}", self.uri);
    }
}
