//! Single-owner playback of the feed's shared audio resource.
//!
//! [`PlaybackController`] is the only component that touches the
//! [`AudioBackend`]. Everything else asks it to bind a window, play, pause or
//! seek, which keeps at most one recording audible at any time.

mod simulated;

pub use simulated::SimulatedAudio;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::Result;

/// What the visible page plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// A curated highlight, clamped at its end.
    Snippet,
    /// The full track, played to its natural end.
    Full,
    /// Nothing to play.
    None,
}

/// Resolved `{start, end}` offsets into the page's audio source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackWindow {
    pub kind: WindowKind,
    pub start: f64,
    pub end: f64,
}

impl PlaybackWindow {
    /// Builds a window, degrading anything with `start >= end` (or
    /// non-finite bounds) to a zero-length window that cannot play.
    pub fn new(kind: WindowKind, start: f64, end: f64) -> Self {
        let start = if start.is_finite() { start.max(0.0) } else { 0.0 };
        let end = if end.is_finite() { end.max(start) } else { start };
        Self { kind, start, end }
    }

    pub fn none() -> Self {
        Self {
            kind: WindowKind::None,
            start: 0.0,
            end: 0.0,
        }
    }

    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_playable(&self) -> bool {
        self.kind != WindowKind::None && self.end > self.start
    }
}

/// Interface of the environment's audio resource: a media element, a native
/// player binding, or [`SimulatedAudio`].
pub trait AudioBackend {
    fn load(&mut self, source: &str) -> Result<()>;
    /// May be refused by the runtime, e.g. before any user gesture.
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    /// `None` until metadata has loaded.
    fn duration(&self) -> Option<f64>;

    /// Lets environments without their own media clock advance playback by
    /// `delta_secs` and report what happened. Real players ignore it and
    /// deliver notifications through [`PlaybackController::handle_event`].
    fn pump(&mut self, _delta_secs: f64) -> Vec<AudioEvent> {
        Vec::new()
    }
}

/// Notifications raised by the audio resource.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    LoadedMetadata,
    TimeUpdate,
    Ended,
    Error(String),
}

/// Things the controller reports back to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackNotice {
    Started,
    /// Autoplay was held back or refused; a manual play control is needed.
    Blocked,
    /// A snippet reached its curated end and was pinned there.
    ReachedWindowEnd,
    Ended,
    LoadFailed { source_ref: String },
}

/// Elapsed time relative to the window start, for scrub bar rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackProgress {
    pub elapsed: f64,
    pub duration: f64,
    pub playing: bool,
    pub blocked: bool,
}

impl PlaybackProgress {
    /// Fraction in `[0, 1]`; zero for zero-length windows.
    pub fn ratio(&self) -> f64 {
        if self.duration <= 0.0 {
            0.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }
}

#[derive(Debug)]
pub struct PlaybackController<B: AudioBackend> {
    backend: B,
    source: Option<String>,
    window: PlaybackWindow,
    metadata_ready: bool,
    pending_seek: Option<f64>,
    clamp_to_end: bool,
    gesture_unlocked: bool,
    wants_play: bool,
    playing: bool,
    blocked: bool,
    load_failed: bool,
}

impl<B: AudioBackend> PlaybackController<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            source: None,
            window: PlaybackWindow::none(),
            metadata_ready: false,
            pending_seek: None,
            clamp_to_end: false,
            gesture_unlocked: false,
            wants_play: false,
            playing: false,
            blocked: false,
            load_failed: false,
        }
    }

    /// Read-only view of the resource. Mutation goes through the controller.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn window(&self) -> PlaybackWindow {
        self.window
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True when playback needs a manual press (autoplay held back or
    /// refused, or the source failed to load).
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    pub fn gesture_unlocked(&self) -> bool {
        self.gesture_unlocked
    }

    /// Whether a snippet window is still pinned at its end.
    pub fn clamps_to_end(&self) -> bool {
        self.clamp_to_end
    }

    /// Records that the user interacted in this session, lifting the
    /// autoplay gate.
    pub fn note_user_gesture(&mut self) {
        if !self.gesture_unlocked {
            debug!("autoplay gate lifted by user gesture");
        }
        self.gesture_unlocked = true;
    }

    /// Binds the resource to `window` of `source` and asks for autoplay.
    ///
    /// The source is only reloaded when it differs from the current one.
    /// The seek to `window.start` happens once metadata is available.
    pub fn bind_window(&mut self, source: &str, window: PlaybackWindow) -> Vec<PlaybackNotice> {
        let mut notices = Vec::new();
        self.window = window;
        self.clamp_to_end = window.kind == WindowKind::Snippet;
        self.pending_seek = None;

        if !window.is_playable() {
            debug!(source, ?window, "binding non-playable window");
            self.halt();
            return notices;
        }

        if self.source.as_deref() != Some(source) || self.load_failed {
            self.halt();
            if let Err(err) = self.backend.load(source) {
                warn!(source, error = %err, "audio source failed to load");
                self.source = Some(source.to_string());
                self.metadata_ready = false;
                self.load_failed = true;
                self.blocked = true;
                notices.push(PlaybackNotice::LoadFailed {
                    source_ref: source.to_string(),
                });
                return notices;
            }
            self.source = Some(source.to_string());
            self.load_failed = false;
            self.metadata_ready = self.backend.duration().is_some();
        }

        if self.metadata_ready {
            self.backend.set_current_time(window.start);
        } else {
            self.pending_seek = Some(window.start);
        }
        info!(source, start = window.start, end = window.end, kind = ?window.kind, "window bound");

        self.wants_play = true;
        if self.metadata_ready {
            notices.extend(self.attempt_play());
        }
        notices
    }

    /// Explicit play control. Counts as a user gesture and retries a failed
    /// load once.
    pub fn press_play(&mut self) -> Vec<PlaybackNotice> {
        self.note_user_gesture();
        let mut notices = Vec::new();
        if self.load_failed {
            if let Some(source) = self.source.clone() {
                notices.extend(self.bind_window(&source, self.window));
                return notices;
            }
        }
        if !self.window.is_playable() {
            return notices;
        }
        self.wants_play = true;
        if self.at_snippet_end() {
            self.backend.set_current_time(self.window.start);
        }
        if self.metadata_ready {
            notices.extend(self.attempt_play());
        }
        notices
    }

    pub fn pause(&mut self) {
        self.wants_play = false;
        if self.playing {
            self.backend.pause();
            self.playing = false;
        }
    }

    pub fn toggle_play(&mut self) -> Vec<PlaybackNotice> {
        if self.playing {
            self.pause();
            Vec::new()
        } else {
            self.press_play()
        }
    }

    /// Pauses for a sheet that overlays the page. The source and window stay
    /// bound so the position survives; detaching happens only through
    /// [`PlaybackController::teardown`] when the feed leaves its active
    /// state, or through the next `bind_window` when the page changes.
    pub fn calm(&mut self) {
        if self.playing {
            debug!("calming playback");
        }
        self.pause();
    }

    /// Pauses and detaches from the current window. Used whenever the feed
    /// leaves its active state.
    pub fn teardown(&mut self) {
        self.halt();
        self.window = PlaybackWindow::none();
        self.pending_seek = None;
        self.clamp_to_end = false;
        debug!("playback torn down");
    }

    /// Seeks to `target` seconds relative to the window start.
    ///
    /// The absolute position is clamped into `[0, source duration]`. Seeking
    /// outside a snippet window releases its end clamp. Returns the
    /// resulting relative position.
    pub fn seek(&mut self, target: f64) -> f64 {
        if self.window.kind == WindowKind::None {
            return 0.0;
        }
        let target = if target.is_finite() { target } else { 0.0 };
        let upper = self.backend.duration().unwrap_or(self.window.end);
        let absolute = (self.window.start + target).clamp(0.0, upper.max(0.0));

        if self.window.kind == WindowKind::Snippet
            && (absolute < self.window.start || absolute > self.window.end)
            && self.clamp_to_end
        {
            debug!(absolute, "seek left the snippet window, releasing end clamp");
            self.clamp_to_end = false;
        }

        if self.metadata_ready {
            self.backend.set_current_time(absolute);
        } else {
            self.pending_seek = Some(absolute);
        }
        absolute - self.window.start
    }

    pub fn progress(&self) -> PlaybackProgress {
        let duration = self.effective_len();
        let current = self.pending_seek.unwrap_or_else(|| self.backend.current_time());
        PlaybackProgress {
            elapsed: (current - self.window.start).clamp(0.0, duration),
            duration,
            playing: self.playing,
            blocked: self.blocked,
        }
    }

    /// Per-frame hook: advances backends without their own clock, handles
    /// their notifications and enforces the snippet end clamp.
    pub fn on_frame(&mut self, delta_secs: f64) -> Vec<PlaybackNotice> {
        let mut notices = Vec::new();
        for event in self.backend.pump(delta_secs) {
            notices.extend(self.handle_event(event));
        }
        notices.extend(self.enforce_clamp());
        notices
    }

    /// Applies a notification from the audio resource.
    pub fn handle_event(&mut self, event: AudioEvent) -> Vec<PlaybackNotice> {
        match event {
            AudioEvent::LoadedMetadata => {
                self.metadata_ready = true;
                if let Some(position) = self.pending_seek.take() {
                    self.backend.set_current_time(position);
                }
                if self.wants_play {
                    self.attempt_play()
                } else {
                    Vec::new()
                }
            }
            AudioEvent::TimeUpdate => self.enforce_clamp().into_iter().collect(),
            AudioEvent::Ended => {
                self.playing = false;
                self.wants_play = false;
                vec![PlaybackNotice::Ended]
            }
            AudioEvent::Error(reason) => {
                warn!(%reason, "audio resource reported an error");
                self.halt();
                self.load_failed = true;
                self.blocked = true;
                vec![PlaybackNotice::LoadFailed {
                    source_ref: self.source.clone().unwrap_or_default(),
                }]
            }
        }
    }

    fn attempt_play(&mut self) -> Vec<PlaybackNotice> {
        if !self.gesture_unlocked {
            if !self.blocked {
                info!("autoplay held back until the first user gesture");
            }
            self.blocked = true;
            return vec![PlaybackNotice::Blocked];
        }

        match self.backend.play() {
            Ok(()) => {
                self.playing = true;
                self.blocked = false;
                vec![PlaybackNotice::Started]
            }
            Err(err) => {
                info!(error = %err, "playback refused by runtime");
                self.playing = false;
                self.blocked = true;
                vec![PlaybackNotice::Blocked]
            }
        }
    }

    fn enforce_clamp(&mut self) -> Option<PlaybackNotice> {
        if !(self.playing && self.clamp_to_end && self.window.kind == WindowKind::Snippet) {
            return None;
        }
        if self.backend.current_time() < self.window.end {
            return None;
        }
        self.backend.pause();
        self.backend.set_current_time(self.window.end);
        self.playing = false;
        self.wants_play = false;
        debug!(end = self.window.end, "snippet reached window end");
        Some(PlaybackNotice::ReachedWindowEnd)
    }

    fn at_snippet_end(&self) -> bool {
        self.clamp_to_end && self.backend.current_time() >= self.window.end
    }

    fn effective_len(&self) -> f64 {
        match self.window.kind {
            WindowKind::None => 0.0,
            WindowKind::Snippet => self.window.len(),
            WindowKind::Full => {
                let end = self.backend.duration().unwrap_or(self.window.end);
                (end - self.window.start).max(0.0)
            }
        }
    }

    fn halt(&mut self) {
        self.backend.pause();
        self.playing = false;
        self.wants_play = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "audio/rec-1/full.mp3";

    fn unlocked(backend: SimulatedAudio) -> PlaybackController<SimulatedAudio> {
        let mut controller = PlaybackController::new(backend);
        controller.note_user_gesture();
        controller
    }

    #[test]
    fn snippet_playback_is_pinned_at_window_end() {
        let mut controller = unlocked(SimulatedAudio::new(600.0));
        let notices = controller.bind_window(SOURCE, PlaybackWindow::new(WindowKind::Snippet, 20.0, 50.0));
        assert_eq!(notices, vec![PlaybackNotice::Started]);
        assert_eq!(controller.backend().current_time(), 20.0);

        let mut reached = false;
        for _ in 0..40 {
            let notices = controller.on_frame(1.0);
            reached |= notices.contains(&PlaybackNotice::ReachedWindowEnd);
            assert!(controller.backend().current_time() <= 50.0);
        }

        assert!(reached);
        assert!(!controller.is_playing());
        assert!(controller.backend().is_paused());
        assert_eq!(controller.backend().current_time(), 50.0);
        assert_eq!(controller.progress().elapsed, 30.0);
    }

    #[test]
    fn full_window_runs_to_natural_end() {
        let mut controller = unlocked(SimulatedAudio::new(10.0));
        controller.bind_window(SOURCE, PlaybackWindow::new(WindowKind::Full, 0.0, 10.0));

        let mut notices = Vec::new();
        for _ in 0..12 {
            notices.extend(controller.on_frame(1.0));
        }
        assert!(notices.contains(&PlaybackNotice::Ended));
        assert!(!notices.contains(&PlaybackNotice::ReachedWindowEnd));
        assert_eq!(controller.progress().elapsed, 10.0);
    }

    #[test]
    fn autoplay_is_blocked_before_any_gesture() {
        let mut controller = PlaybackController::new(SimulatedAudio::new(600.0));
        let notices =
            controller.bind_window(SOURCE, PlaybackWindow::new(WindowKind::Snippet, 20.0, 50.0));

        assert_eq!(notices, vec![PlaybackNotice::Blocked]);
        assert!(controller.is_blocked());
        assert_eq!(controller.backend().play_calls(), 0);

        let notices = controller.press_play();
        assert_eq!(notices, vec![PlaybackNotice::Started]);
        assert!(!controller.is_blocked());
        assert!(controller.is_playing());
    }

    #[test]
    fn runtime_rejection_sets_blocked_without_retrying() {
        let mut controller = unlocked(SimulatedAudio::new(600.0).rejecting_playback());
        let notices =
            controller.bind_window(SOURCE, PlaybackWindow::new(WindowKind::Full, 0.0, 600.0));
        assert_eq!(notices, vec![PlaybackNotice::Blocked]);

        for _ in 0..10 {
            controller.on_frame(0.016);
        }
        assert_eq!(controller.backend().play_calls(), 1);
        assert!(controller.is_blocked());
    }

    #[test]
    fn same_source_is_not_reloaded() {
        let mut controller = unlocked(SimulatedAudio::new(600.0));
        controller.bind_window(SOURCE, PlaybackWindow::new(WindowKind::Snippet, 20.0, 50.0));
        controller.bind_window(SOURCE, PlaybackWindow::new(WindowKind::Snippet, 80.0, 120.0));
        assert_eq!(controller.backend().load_calls(), 1);
        assert_eq!(controller.backend().current_time(), 80.0);

        controller.bind_window("audio/rec-2/full.mp3", PlaybackWindow::new(WindowKind::Full, 0.0, 600.0));
        assert_eq!(controller.backend().load_calls(), 2);
    }

    #[test]
    fn seek_waits_for_metadata() {
        let mut controller = unlocked(SimulatedAudio::new(600.0).with_metadata_delay(0.1));
        let notices =
            controller.bind_window(SOURCE, PlaybackWindow::new(WindowKind::Snippet, 30.0, 60.0));
        assert!(notices.is_empty());
        assert!(!controller.is_playing());

        let notices = controller.on_frame(0.2);
        assert_eq!(notices, vec![PlaybackNotice::Started]);
        assert_eq!(controller.backend().current_time(), 30.0);
    }

    #[test]
    fn seeking_clamps_and_releases_the_end_clamp() {
        let mut controller = unlocked(SimulatedAudio::new(600.0));
        controller.bind_window(SOURCE, PlaybackWindow::new(WindowKind::Snippet, 20.0, 50.0));

        assert_eq!(controller.seek(10.0), 10.0);
        assert!(controller.clamps_to_end());

        assert_eq!(controller.seek(-100.0), -20.0);
        assert_eq!(controller.backend().current_time(), 0.0);
        assert!(!controller.clamps_to_end());
        assert_eq!(controller.progress().elapsed, 0.0);

        assert_eq!(controller.seek(10_000.0), 580.0);
        assert_eq!(controller.progress().elapsed, 30.0);

        controller.seek(40.0);
        for _ in 0..20 {
            assert!(!controller.on_frame(1.0).contains(&PlaybackNotice::ReachedWindowEnd));
        }
        assert!(controller.backend().current_time() > 50.0);
    }

    #[test]
    fn load_failure_degrades_to_blocked_page() {
        let mut controller = unlocked(SimulatedAudio::new(600.0).with_failing_source(SOURCE));
        let notices =
            controller.bind_window(SOURCE, PlaybackWindow::new(WindowKind::Snippet, 20.0, 50.0));

        assert_eq!(
            notices,
            vec![PlaybackNotice::LoadFailed {
                source_ref: SOURCE.to_string()
            }]
        );
        assert!(controller.is_blocked());
        assert!(controller.load_failed());
        assert!(!controller.is_playing());
        assert_eq!(controller.progress().elapsed, 0.0);
    }

    #[test]
    fn zero_length_window_never_plays() {
        let window = PlaybackWindow::new(WindowKind::Snippet, 40.0, 30.0);
        assert_eq!(window.len(), 0.0);
        assert!(!window.is_playable());

        let mut controller = unlocked(SimulatedAudio::new(600.0));
        assert!(controller.bind_window(SOURCE, window).is_empty());
        assert!(!controller.is_playing());
        assert_eq!(controller.progress().ratio(), 0.0);
    }

    #[test]
    fn calm_pauses_but_keeps_the_binding() {
        let mut controller = unlocked(SimulatedAudio::new(600.0));
        controller.bind_window(SOURCE, PlaybackWindow::new(WindowKind::Full, 0.0, 600.0));
        controller.on_frame(5.0);

        controller.calm();
        assert!(!controller.is_playing());
        assert!(controller.backend().is_paused());
        assert_eq!(controller.source(), Some(SOURCE));
        assert_eq!(controller.window().kind, WindowKind::Full);

        assert_eq!(controller.press_play(), vec![PlaybackNotice::Started]);
        assert_eq!(controller.backend().current_time(), 5.0);
        assert_eq!(controller.backend().load_calls(), 1);
    }

    #[test]
    fn teardown_pauses_and_detaches() {
        let mut controller = unlocked(SimulatedAudio::new(600.0));
        controller.bind_window(SOURCE, PlaybackWindow::new(WindowKind::Full, 0.0, 600.0));
        assert!(controller.is_playing());

        controller.teardown();
        assert!(!controller.is_playing());
        assert!(controller.backend().is_paused());
        assert_eq!(controller.window().kind, WindowKind::None);
    }
}
