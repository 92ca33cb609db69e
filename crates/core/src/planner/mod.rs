//! Stateless derivation of clip windows and visual variants from seeds.

use serde::{Deserialize, Serialize};

use crate::{
    config::PlannerConfig,
    navigator::InnerPage,
    playback::{PlaybackWindow, WindowKind},
    seed::{SeedKey, SeedPurpose},
    Recording,
};

/// `{start, end}` offsets in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipWindow {
    pub start: f64,
    pub end: f64,
}

impl ClipWindow {
    pub fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

/// Deterministic background parameters for one page. Hues and rotation are
/// in degrees, focal points in percent of the viewport, drift in px/s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualVariant {
    pub hue_primary: f64,
    pub hue_secondary: f64,
    pub hue_tertiary: f64,
    pub focal_point_a: Point2,
    pub focal_point_b: Point2,
    pub drift_vector: Point2,
    pub rotation: f64,
}

/// Audio source plus window for a single visible page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagePlan {
    pub source: String,
    pub window: PlaybackWindow,
}

/// Turns seed keys into concrete scheduling numbers. Holds no state beyond
/// its configuration, so every derivation is reproducible.
#[derive(Debug, Clone, Default)]
pub struct ContentWindowPlanner {
    config: PlannerConfig,
}

impl ContentWindowPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Highlight clip length, drawn from the clip band.
    pub fn derive_clip_duration(&self, seed: &SeedKey) -> f64 {
        seed.stream()
            .range(self.config.clip_min_secs, self.config.clip_max_secs)
    }

    /// Full track length for recordings without an authored duration.
    pub fn derive_full_duration(&self, seed: &SeedKey) -> f64 {
        seed.stream()
            .range(self.config.full_min_secs, self.config.full_max_secs)
    }

    /// Places a clip of `clip_duration` inside `[padding, full - padding]`.
    ///
    /// A clip longer than the padded range is shortened to fit. A track too
    /// short to hold any padded clip yields an empty window.
    pub fn derive_clip_window(
        &self,
        seed: &SeedKey,
        full_duration: f64,
        clip_duration: f64,
    ) -> ClipWindow {
        let padding = self.config.edge_padding_secs;
        let full = if full_duration.is_finite() {
            full_duration.max(0.0)
        } else {
            0.0
        };
        let usable = full - 2.0 * padding;
        if usable <= 0.0 || !(clip_duration > 0.0) {
            let pinned = padding.min(full);
            return ClipWindow {
                start: pinned,
                end: pinned,
            };
        }

        let clip = clip_duration.min(usable);
        let latest_start = full - padding - clip;
        let start = seed.stream().range(padding, latest_start.max(padding));
        ClipWindow {
            start,
            end: full.min(start + clip),
        }
    }

    pub fn derive_visual_variant(&self, seed: &SeedKey) -> VisualVariant {
        let mut stream = seed.stream();
        VisualVariant {
            hue_primary: stream.range(0.0, 360.0),
            hue_secondary: stream.range(0.0, 360.0),
            hue_tertiary: stream.range(0.0, 360.0),
            focal_point_a: Point2 {
                x: stream.range(10.0, 90.0),
                y: stream.range(10.0, 90.0),
            },
            focal_point_b: Point2 {
                x: stream.range(10.0, 90.0),
                y: stream.range(10.0, 90.0),
            },
            drift_vector: Point2 {
                x: stream.range(-12.0, 12.0),
                y: stream.range(-12.0, 12.0),
            },
            rotation: stream.range(0.0, 360.0),
        }
    }

    /// Authored full track length, or the derived one when absent.
    pub fn full_duration(&self, recording: &Recording) -> f64 {
        match recording.duration_secs {
            Some(duration) if duration > 0.0 && duration.is_finite() => duration,
            _ => self.derive_full_duration(&SeedKey::recording(&recording.id, SeedPurpose::FullLen)),
        }
    }

    /// Resolves the source and window the given page should play.
    ///
    /// Snippets always play from the recording's full track: explicit
    /// offsets are clamped to the track, otherwise the window is derived
    /// from the snippet's seed.
    pub fn plan_page(&self, recording: &Recording, page: InnerPage) -> PagePlan {
        let full = self.full_duration(recording);
        let window = match page {
            InnerPage::OnFullTrack => PlaybackWindow::new(WindowKind::Full, 0.0, full),
            InnerPage::OnSnippet { index } => match recording.snippets.get(index) {
                Some(snippet) => {
                    let clip = match snippet.offsets {
                        Some(offsets) => ClipWindow {
                            start: offsets.start.clamp(0.0, full),
                            end: offsets.end.min(full),
                        },
                        None => {
                            let len_key =
                                SeedKey::snippet(&recording.id, &snippet.id, SeedPurpose::SnippetLen);
                            let start_key = SeedKey::snippet(
                                &recording.id,
                                &snippet.id,
                                SeedPurpose::SnippetStart,
                            );
                            let clip_duration = self.derive_clip_duration(&len_key);
                            self.derive_clip_window(&start_key, full, clip_duration)
                        }
                    };
                    PlaybackWindow::new(WindowKind::Snippet, clip.start, clip.end)
                }
                None => PlaybackWindow::none(),
            },
        };

        PagePlan {
            source: recording.full_track.clone(),
            window,
        }
    }

    /// Background parameters for the given page.
    pub fn page_variant(&self, recording: &Recording, page: InnerPage) -> VisualVariant {
        let key = match page {
            InnerPage::OnSnippet { index } => match recording.snippets.get(index) {
                Some(snippet) => SeedKey::snippet(&recording.id, &snippet.id, SeedPurpose::Visual),
                None => SeedKey::recording(&recording.id, SeedPurpose::Visual),
            },
            InnerPage::OnFullTrack => SeedKey::recording(&recording.id, SeedPurpose::Visual),
        };
        self.derive_visual_variant(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::ClipOffsets, Catalog};

    fn planner() -> ContentWindowPlanner {
        ContentWindowPlanner::default()
    }

    #[test]
    fn clip_duration_is_stable_for_identical_seeds() {
        let planner = planner();
        let a = SeedKey::raw("rec-1:sn-1:snippetLen");
        let b = SeedKey::raw("rec-1:sn-1:snippetLen");

        let first = planner.derive_clip_duration(&a);
        for _ in 0..10 {
            assert_eq!(planner.derive_clip_duration(&a), first);
            assert_eq!(planner.derive_clip_duration(&b), first);
        }
        assert_eq!(
            ContentWindowPlanner::default().derive_clip_duration(&b),
            first
        );
        assert!((50.39..50.40).contains(&first));
    }

    #[test]
    fn durations_fall_in_their_bands() {
        let planner = planner();
        for n in 0..500 {
            let clip = planner.derive_clip_duration(&SeedKey::raw(format!("clip-{n}")));
            assert!((30.0..60.0).contains(&clip));
            let full = planner.derive_full_duration(&SeedKey::raw(format!("full-{n}")));
            assert!((600.0..1200.0).contains(&full));
        }
    }

    #[test]
    fn clip_windows_respect_padding_and_bounds() {
        let planner = planner();
        let padding = planner.config().edge_padding_secs;
        for n in 0..500 {
            let full = 100.0 + f64::from(n) * 3.0;
            let clip = 30.0 + f64::from(n % 31);
            let window = planner.derive_clip_window(&SeedKey::raw(format!("w-{n}")), full, clip);

            assert!(0.0 <= window.start);
            assert!(window.start < window.end);
            assert!(window.end <= full);
            assert!(window.start >= padding);
            assert!(full - window.end >= padding - 1e-9);
        }
    }

    #[test]
    fn oversized_clip_is_shortened_to_fit() {
        let window = planner().derive_clip_window(&SeedKey::raw("tight"), 50.0, 45.0);
        assert_eq!(window.start, 10.0);
        assert_eq!(window.end, 40.0);
    }

    #[test]
    fn degenerate_track_yields_empty_window() {
        let window = planner().derive_clip_window(&SeedKey::raw("tiny"), 15.0, 30.0);
        assert!(window.is_empty());
        assert_eq!(window.len(), 0.0);

        let window = planner().derive_clip_window(&SeedKey::raw("nan"), f64::NAN, 30.0);
        assert!(window.is_empty());
    }

    #[test]
    fn visual_variants_are_reproducible() {
        let planner = planner();
        let key = SeedKey::raw("rec-1:sn-2:visual");
        let variant = planner.derive_visual_variant(&key);
        assert_eq!(variant, planner.derive_visual_variant(&key));
        assert!((0.0..360.0).contains(&variant.hue_primary));
        assert!((10.0..90.0).contains(&variant.focal_point_b.y));
        assert!((-12.0..12.0).contains(&variant.drift_vector.x));
        assert_ne!(
            variant,
            planner.derive_visual_variant(&SeedKey::raw("rec-1:sn-3:visual"))
        );
    }

    #[test]
    fn plans_pages_against_the_full_track() {
        let planner = planner();
        let mut recording = Catalog::sample("planner", 1).get(0).cloned().unwrap();
        recording.duration_secs = Some(900.0);
        recording.snippets[0].offsets = Some(ClipOffsets {
            start: 12.0,
            end: 40.0,
        });
        let catalog = Catalog::new(vec![recording]).unwrap();
        let recording = catalog.get(0).unwrap();

        let explicit = planner.plan_page(recording, InnerPage::OnSnippet { index: 0 });
        assert_eq!(explicit.source, recording.full_track);
        assert_eq!(explicit.window.kind, WindowKind::Snippet);
        assert_eq!((explicit.window.start, explicit.window.end), (12.0, 40.0));

        let derived = planner.plan_page(recording, InnerPage::OnSnippet { index: 1 });
        assert!(derived.window.end <= 900.0 - 10.0 + 1e-9);
        assert!((29.999..=60.0).contains(&derived.window.len()));
        assert_eq!(derived, planner.plan_page(recording, InnerPage::OnSnippet { index: 1 }));

        let full = planner.plan_page(recording, InnerPage::OnFullTrack);
        assert_eq!(full.window.kind, WindowKind::Full);
        assert_eq!((full.window.start, full.window.end), (0.0, 900.0));

        let missing = planner.plan_page(recording, InnerPage::OnSnippet { index: 99 });
        assert_eq!(missing.window.kind, WindowKind::None);
    }

    #[test]
    fn explicit_offsets_are_clamped_to_the_track() {
        let planner = planner();
        let mut recording = Catalog::sample("planner", 1).get(0).cloned().unwrap();
        recording.duration_secs = Some(100.0);
        recording.snippets[0].offsets = Some(ClipOffsets {
            start: 50.0,
            end: 500.0,
        });
        recording.snippets[1].offsets = Some(ClipOffsets {
            start: 150.0,
            end: 180.0,
        });

        let overlong = planner.plan_page(&recording, InnerPage::OnSnippet { index: 0 });
        assert_eq!((overlong.window.start, overlong.window.end), (50.0, 100.0));
        assert!(overlong.window.is_playable());

        let beyond = planner.plan_page(&recording, InnerPage::OnSnippet { index: 1 });
        assert_eq!(beyond.window.len(), 0.0);
        assert!(!beyond.window.is_playable());
    }

    #[test]
    fn missing_duration_falls_back_to_derived_length() {
        let planner = planner();
        let mut recording = Catalog::sample("planner", 1).get(0).cloned().unwrap();
        recording.duration_secs = None;
        let full = planner.full_duration(&recording);
        assert!((600.0..1200.0).contains(&full));
        assert_eq!(full, planner.full_duration(&recording));
    }
}
