use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{FeedError, Result};

/// Top-level configuration structure for the feed engine.
///
/// Every threshold and band here is an empirically tuned default rather than
/// a hard constraint, so all of them can be overridden from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub gesture: GestureConfig,
    pub planner: PlannerConfig,
    pub timing: TimingConfig,
}

impl FeedConfig {
    /// Parses a configuration document. Missing fields keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Defaults tuned for users who prefer reduced motion.
    pub fn reduced_motion() -> Self {
        Self {
            timing: TimingConfig {
                reduced_motion: true,
                ..TimingConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.gesture.validate()?;
        self.planner.validate()?;
        self.timing.validate()
    }
}

/// Pixel thresholds used by the gesture router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Displacement after which the dominant axis is locked.
    pub axis_lock_px: f32,
    /// Below this displacement an interaction counts as a tap.
    pub min_move_px: f32,
    /// Displacement along the locked axis required to emit a swipe.
    pub swipe_distance_px: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            axis_lock_px: 14.0,
            min_move_px: 10.0,
            swipe_distance_px: 42.0,
        }
    }
}

impl GestureConfig {
    fn validate(&self) -> Result<()> {
        let values = [self.axis_lock_px, self.min_move_px, self.swipe_distance_px];
        if values.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(FeedError::InvalidConfig(
                "gesture thresholds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Duration bands and padding used when deriving playback windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub clip_min_secs: f64,
    pub clip_max_secs: f64,
    /// Full track band used when a recording carries no authored length.
    pub full_min_secs: f64,
    pub full_max_secs: f64,
    /// Reserved at both ends of the full track when placing a clip.
    pub edge_padding_secs: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            clip_min_secs: 30.0,
            clip_max_secs: 60.0,
            full_min_secs: 600.0,
            full_max_secs: 1200.0,
            edge_padding_secs: 10.0,
        }
    }
}

impl PlannerConfig {
    fn validate(&self) -> Result<()> {
        if !(self.clip_min_secs > 0.0 && self.clip_min_secs <= self.clip_max_secs) {
            return Err(FeedError::InvalidConfig(format!(
                "clip band {}..{} is empty or inverted",
                self.clip_min_secs, self.clip_max_secs
            )));
        }
        if !(self.full_min_secs > 0.0 && self.full_min_secs <= self.full_max_secs) {
            return Err(FeedError::InvalidConfig(format!(
                "full track band {}..{} is empty or inverted",
                self.full_min_secs, self.full_max_secs
            )));
        }
        if !(self.edge_padding_secs >= 0.0 && self.edge_padding_secs.is_finite()) {
            return Err(FeedError::InvalidConfig(
                "edge padding must be a finite, non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cosmetic timings for banners, reveals and the typed quote effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub banner_ms: u64,
    pub banner_reduced_ms: u64,
    pub end_cta_delay_ms: u64,
    pub end_cta_reduced_ms: u64,
    pub reduced_motion: bool,
    pub quote_chars_per_second: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            banner_ms: 500,
            banner_reduced_ms: 220,
            end_cta_delay_ms: 1600,
            end_cta_reduced_ms: 300,
            reduced_motion: false,
            quote_chars_per_second: 28.0,
        }
    }
}

impl TimingConfig {
    /// How long the "recording changed" banner stays visible.
    pub fn banner_duration_ms(&self) -> u64 {
        if self.reduced_motion {
            self.banner_reduced_ms
        } else {
            self.banner_ms
        }
    }

    /// Delay before the end-of-feed call to action appears.
    pub fn end_cta_delay(&self) -> u64 {
        if self.reduced_motion {
            self.end_cta_reduced_ms
        } else {
            self.end_cta_delay_ms
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.quote_chars_per_second > 0.0 && self.quote_chars_per_second.is_finite()) {
            return Err(FeedError::InvalidConfig(
                "quote_chars_per_second must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
