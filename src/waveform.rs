// Cosmetic recording visualizer
//
// Bar heights are not derived from captured audio. While recording, every
// bar runs its own looping animation task towards random peaks; when
// recording stops the loops are cancelled and a single settle task eases all
// bars back to the floor.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::config::WaveformConfig;
use crate::task::TaskHandle;
use crate::util::lock;

/// Small xorshift generator; animation only needs cheap, seedable noise
#[derive(Debug, Clone)]
struct BarRng(u64);

impl BarRng {
    fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed })
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in [0, 1)
    fn next_unit(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform in [lo, hi]
    fn between(&mut self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        lo + self.next_u64() % (hi - lo + 1)
    }
}

fn ease(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub struct Waveform {
    config: WaveformConfig,
    levels: Arc<Mutex<Vec<f32>>>,
    bars: Vec<TaskHandle>,
    settle: Option<TaskHandle>,
    rng: BarRng,
    recording: bool,
}

impl Waveform {
    pub fn new(config: WaveformConfig) -> Self {
        let seed = config
            .seed
            .unwrap_or_else(|| uuid::Uuid::new_v4().as_u128() as u64);
        let levels = vec![config.floor; config.bar_count];

        Self {
            config,
            levels: Arc::new(Mutex::new(levels)),
            bars: Vec::new(),
            settle: None,
            rng: BarRng::new(seed),
            recording: false,
        }
    }

    /// Start or stop the looping animation. Must be called within a tokio runtime.
    pub fn set_recording(&mut self, recording: bool) {
        if recording == self.recording {
            return;
        }
        self.recording = recording;

        if recording {
            self.settle = None;
            for index in 0..self.config.bar_count {
                let seed = self.rng.next_u64();
                self.bars.push(TaskHandle::spawn(
                    "waveform-bar",
                    animate_bar(Arc::clone(&self.levels), index, self.config.clone(), seed),
                ));
            }
            debug!("Waveform animating {} bars", self.bars.len());
        } else {
            self.bars.clear();
            self.settle = Some(TaskHandle::spawn(
                "waveform-settle",
                settle(Arc::clone(&self.levels), self.config.clone()),
            ));
            debug!("Waveform settling");
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Current bar heights as fractions of the maximum
    pub fn levels(&self) -> Vec<f32> {
        lock(&self.levels).clone()
    }

    /// Number of bars with a live looping animation
    pub fn looping_bars(&self) -> usize {
        self.bars.iter().filter(|bar| bar.is_running()).count()
    }

    /// Whether any animation (loops or the settle pass) is still running
    pub fn is_animating(&self) -> bool {
        self.looping_bars() > 0 || self.settle.as_ref().map_or(false, TaskHandle::is_running)
    }

    /// Cancel every animation task
    pub fn dispose(&mut self) {
        self.bars.clear();
        self.settle = None;
        self.recording = false;
    }
}

async fn animate_bar(levels: Arc<Mutex<Vec<f32>>>, index: usize, config: WaveformConfig, seed: u64) {
    let mut rng = BarRng::new(seed);
    let frame = Duration::from_millis(config.frame_ms.max(1));

    tokio::time::sleep(Duration::from_millis(config.stagger_ms * index as u64)).await;

    loop {
        let target = config.floor + rng.next_unit() * (1.0 - config.floor);
        let span = rng.between(config.min_segment_ms, config.max_segment_ms);
        let steps = (span / frame.as_millis() as u64).max(1);

        let from = lock(&levels)[index];
        for step in 1..=steps {
            tokio::time::sleep(frame).await;
            let level = if step == steps {
                target
            } else {
                from + (target - from) * ease(step as f32 / steps as f32)
            };
            lock(&levels)[index] = level;
        }
    }
}

async fn settle(levels: Arc<Mutex<Vec<f32>>>, config: WaveformConfig) {
    let frame = Duration::from_millis(config.frame_ms.max(1));
    let steps = (config.settle_ms / frame.as_millis() as u64).max(1);
    let from = lock(&levels).clone();

    for step in 1..=steps {
        tokio::time::sleep(frame).await;
        let t = ease(step as f32 / steps as f32);
        let mut current = lock(&levels);
        for (level, start) in current.iter_mut().zip(&from) {
            *level = if step == steps {
                config.floor
            } else {
                start + (config.floor - start) * t
            };
        }
    }
}
