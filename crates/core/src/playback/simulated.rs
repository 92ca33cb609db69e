use std::collections::{HashMap, HashSet};

use super::{AudioBackend, AudioEvent};
use crate::{FeedError, Result};

/// In-process audio resource with a manually advanced clock.
///
/// Used by the command line simulator and by tests wherever a real media
/// runtime is unavailable. Durations are registered per source; sources
/// without a registration use `default_duration`.
#[derive(Debug, Clone)]
pub struct SimulatedAudio {
    durations: HashMap<String, f64>,
    failing: HashSet<String>,
    default_duration: f64,
    metadata_delay: f64,
    reject_play: bool,
    source: Option<String>,
    duration: Option<f64>,
    loading_for: f64,
    current_time: f64,
    paused: bool,
    load_calls: usize,
    play_calls: usize,
}

impl Default for SimulatedAudio {
    fn default() -> Self {
        Self::new(900.0)
    }
}

impl SimulatedAudio {
    pub fn new(default_duration: f64) -> Self {
        Self {
            durations: HashMap::new(),
            failing: HashSet::new(),
            default_duration,
            metadata_delay: 0.0,
            reject_play: false,
            source: None,
            duration: None,
            loading_for: 0.0,
            current_time: 0.0,
            paused: true,
            load_calls: 0,
            play_calls: 0,
        }
    }

    pub fn with_duration(mut self, source: impl Into<String>, seconds: f64) -> Self {
        self.durations.insert(source.into(), seconds);
        self
    }

    /// Loading `source` fails as if the file were missing.
    pub fn with_failing_source(mut self, source: impl Into<String>) -> Self {
        self.failing.insert(source.into());
        self
    }

    /// Metadata becomes available only after this much pumped time.
    pub fn with_metadata_delay(mut self, seconds: f64) -> Self {
        self.metadata_delay = seconds.max(0.0);
        self
    }

    /// Every `play()` call is refused, like a runtime enforcing autoplay rules.
    pub fn rejecting_playback(mut self) -> Self {
        self.reject_play = true;
        self
    }

    pub fn set_reject_play(&mut self, reject: bool) {
        self.reject_play = reject;
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls
    }
}

impl AudioBackend for SimulatedAudio {
    fn load(&mut self, source: &str) -> Result<()> {
        self.load_calls += 1;
        self.paused = true;
        self.current_time = 0.0;
        if self.failing.contains(source) {
            self.source = None;
            self.duration = None;
            return Err(FeedError::AudioLoad {
                source_ref: source.to_string(),
                reason: "no such file".to_string(),
            });
        }

        self.source = Some(source.to_string());
        let duration = self
            .durations
            .get(source)
            .copied()
            .unwrap_or(self.default_duration);
        if self.metadata_delay > 0.0 {
            self.duration = None;
            self.loading_for = 0.0;
        } else {
            self.duration = Some(duration);
        }
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.play_calls += 1;
        if self.reject_play {
            return Err(FeedError::PlaybackRejected(
                "play() requires a user gesture".to_string(),
            ));
        }
        if self.source.is_none() {
            return Err(FeedError::PlaybackRejected("no source loaded".to_string()));
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        let upper = self.duration.unwrap_or(f64::MAX);
        self.current_time = seconds.clamp(0.0, upper);
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn pump(&mut self, delta_secs: f64) -> Vec<AudioEvent> {
        let mut events = Vec::new();
        let Some(source) = self.source.clone() else {
            return events;
        };

        if self.duration.is_none() {
            self.loading_for += delta_secs;
            if self.loading_for >= self.metadata_delay {
                let duration = self
                    .durations
                    .get(&source)
                    .copied()
                    .unwrap_or(self.default_duration);
                self.duration = Some(duration);
                events.push(AudioEvent::LoadedMetadata);
            }
            return events;
        }

        if self.paused || delta_secs <= 0.0 {
            return events;
        }

        let duration = self.duration.unwrap_or(self.default_duration);
        self.current_time = (self.current_time + delta_secs).min(duration);
        events.push(AudioEvent::TimeUpdate);
        if self.current_time >= duration {
            self.paused = true;
            events.push(AudioEvent::Ended);
        }
        events
    }
}
