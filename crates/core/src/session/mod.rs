use tracing::debug;

use crate::{
    gesture::{GestureRouter, PointerEvent, SwipeDirection},
    navigator::{FeedNavigator, FeedState, NavEvent, NavIntent, Overlay, RequestOutcome},
    playback::{AudioBackend, PlaybackController, PlaybackNotice, PlaybackProgress},
    timeline::{FrameClock, FrameScheduler, FrameTask, TaskHandle, TypedReveal},
    Catalog, FeedConfig, Result,
};

/// Everything a renderer needs to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Swiped(SwipeDirection),
    Nav(NavEvent),
    Playback(PlaybackNotice),
}

/// One feed view: gesture input, navigation, planning and playback wired
/// together on a single thread.
///
/// Each call runs a transition to completion (including window planning
/// and binding) before returning, so the next gesture always sees a
/// settled state.
#[derive(Debug)]
pub struct FeedSession<B: AudioBackend> {
    config: FeedConfig,
    router: GestureRouter,
    navigator: FeedNavigator,
    playback: PlaybackController<B>,
    scheduler: FrameScheduler,
    clock: FrameClock,
    quote: Option<TypedReveal>,
    quote_task: Option<TaskHandle>,
}

impl<B: AudioBackend> FeedSession<B> {
    pub fn new(config: FeedConfig, backend: B) -> Self {
        Self {
            router: GestureRouter::new(config.gesture.clone()),
            navigator: FeedNavigator::new(&config),
            playback: PlaybackController::new(backend),
            scheduler: FrameScheduler::new(),
            clock: FrameClock::default(),
            quote: None,
            quote_task: None,
            config,
        }
    }

    pub fn state(&self) -> FeedState {
        self.navigator.state()
    }

    pub fn navigator(&self) -> &FeedNavigator {
        &self.navigator
    }

    pub fn playback(&self) -> &PlaybackController<B> {
        &self.playback
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn progress(&self) -> PlaybackProgress {
        self.playback.progress()
    }

    /// The part of the visible quote revealed so far.
    pub fn visible_quote(&self, now_ms: u64) -> Option<&str> {
        let quote = self.navigator.current_quote()?;
        let reveal = self.quote.as_ref()?;
        Some(reveal.visible_text(quote, now_ms))
    }

    pub fn load_catalog(&mut self, catalog: Catalog, now_ms: u64) -> Vec<SessionEvent> {
        let events = self.navigator.load_catalog(catalog, now_ms);
        self.apply_nav_events(events, now_ms)
    }

    pub fn pointer_down(&mut self, event: PointerEvent) {
        self.router.pointer_down(event);
    }

    pub fn pointer_move(&mut self, event: PointerEvent) {
        self.router.pointer_move(event);
    }

    pub fn pointer_up(&mut self, event: PointerEvent) -> Vec<SessionEvent> {
        let Some(direction) = self.router.pointer_up(event) else {
            return Vec::new();
        };
        let mut out = vec![SessionEvent::Swiped(direction)];
        out.extend(self.intent(NavIntent::from(direction), event.timestamp_ms));
        out
    }

    pub fn pointer_cancel(&mut self, pointer_id: u32) {
        self.router.cancel(pointer_id);
    }

    /// Applies an intent from any input (swipe, keyboard, buttons). Counts
    /// as a user gesture for the autoplay gate.
    pub fn intent(&mut self, intent: NavIntent, now_ms: u64) -> Vec<SessionEvent> {
        self.playback.note_user_gesture();
        let events = self.navigator.apply(intent, now_ms);
        self.apply_nav_events(events, now_ms)
    }

    pub fn press_play(&mut self) -> Vec<SessionEvent> {
        if !matches!(self.navigator.state(), FeedState::Active { .. }) {
            return Vec::new();
        }
        wrap_playback(self.playback.press_play())
    }

    pub fn toggle_play(&mut self) -> Vec<SessionEvent> {
        if !matches!(self.navigator.state(), FeedState::Active { .. }) {
            return Vec::new();
        }
        wrap_playback(self.playback.toggle_play())
    }

    /// Seeks relative to the visible window's start.
    pub fn seek(&mut self, seconds: f64) -> f64 {
        self.playback.seek(seconds)
    }

    pub fn open_overlay(&mut self, overlay: Overlay, now_ms: u64) -> Vec<SessionEvent> {
        let events = self.navigator.open_overlay(overlay);
        self.apply_nav_events(events, now_ms)
    }

    pub fn close_overlay(&mut self, overlay: Overlay, now_ms: u64) -> Vec<SessionEvent> {
        let events = self.navigator.close_overlay(overlay);
        self.apply_nav_events(events, now_ms)
    }

    pub fn request_new_content(&mut self, now_ms: u64) -> Vec<SessionEvent> {
        let events = self.navigator.request_new_content();
        self.apply_nav_events(events, now_ms)
    }

    pub fn finish_request(
        &mut self,
        outcome: RequestOutcome,
        now_ms: u64,
    ) -> Result<Vec<SessionEvent>> {
        let events = self.navigator.finish_request(outcome, now_ms)?;
        Ok(self.apply_nav_events(events, now_ms))
    }

    /// Render-loop callback. Runs the visible page's frame tasks and the
    /// navigator's timed reveals.
    pub fn frame(&mut self, now_ms: u64) -> Vec<SessionEvent> {
        let delta = self.clock.advance(now_ms);
        let mut out: Vec<SessionEvent> = self
            .navigator
            .tick(now_ms)
            .into_iter()
            .map(SessionEvent::Nav)
            .collect();

        for task in self.scheduler.due() {
            match task.kind {
                FrameTask::ProgressPoll => {
                    out.extend(wrap_playback(self.playback.on_frame(delta)));
                }
                FrameTask::QuoteReveal => {
                    let done = self
                        .quote
                        .as_ref()
                        .map(|reveal| reveal.is_complete(now_ms))
                        .unwrap_or(true);
                    if done {
                        let handle = self.quote_task.take().unwrap_or(task.handle);
                        self.scheduler.cancel(handle);
                    }
                }
            }
        }
        out
    }

    fn apply_nav_events(&mut self, events: Vec<NavEvent>, now_ms: u64) -> Vec<SessionEvent> {
        let mut out = Vec::with_capacity(events.len());
        for event in events {
            match &event {
                NavEvent::PageChanged { plan, .. } => {
                    self.enter_page(now_ms);
                    out.push(SessionEvent::Nav(event.clone()));
                    out.extend(wrap_playback(
                        self.playback.bind_window(&plan.source, plan.window),
                    ));
                    continue;
                }
                NavEvent::LeftActive => {
                    self.scheduler.enter_page();
                    self.quote = None;
                    self.quote_task = None;
                    self.playback.teardown();
                }
                NavEvent::OverlayOpened(overlay) if overlay.calms_playback() => {
                    self.playback.calm();
                }
                _ => {}
            }
            out.push(SessionEvent::Nav(event));
        }
        out
    }

    /// Cancels the previous page's frame tasks and starts the new page's.
    fn enter_page(&mut self, now_ms: u64) {
        let page = self.scheduler.enter_page();
        self.clock.reset();
        self.scheduler.schedule(FrameTask::ProgressPoll, now_ms);

        self.quote = self.navigator.current_quote().map(|quote| {
            TypedReveal::start(quote, now_ms, self.config.timing.quote_chars_per_second)
        });
        self.quote_task = self
            .quote
            .as_ref()
            .map(|_| self.scheduler.schedule(FrameTask::QuoteReveal, now_ms));
        debug!(?page, quote = self.quote.is_some(), "frame tasks started");
    }
}

fn wrap_playback(notices: Vec<PlaybackNotice>) -> Vec<SessionEvent> {
    notices.into_iter().map(SessionEvent::Playback).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        navigator::InnerPage,
        playback::{SimulatedAudio, WindowKind},
        Recording, Snippet,
    };

    fn recording(id: &str, snippets: usize) -> Recording {
        Recording {
            id: id.to_string(),
            speaker_id: format!("{id}-speaker"),
            speaker_name: "Speaker".to_string(),
            relationship: Some("neighbour".to_string()),
            topic: None,
            duration_secs: Some(900.0),
            snippets: (0..snippets)
                .map(|n| Snippet {
                    id: format!("sn-{}", n + 1),
                    recording_id: id.to_string(),
                    audio: format!("{id}/sn-{}.mp3", n + 1),
                    summary: "We kept the lights on".to_string(),
                    themes: Default::default(),
                    offsets: None,
                })
                .collect(),
            full_track: format!("{id}/full.mp3"),
        }
    }

    fn session() -> FeedSession<SimulatedAudio> {
        let catalog = Catalog::new(vec![recording("rec-1", 3), recording("rec-2", 2)]).unwrap();
        let mut session = FeedSession::new(FeedConfig::default(), SimulatedAudio::new(900.0));
        session.load_catalog(catalog, 0);
        session
    }

    fn swipe(session: &mut FeedSession<SimulatedAudio>, dx: f32, dy: f32, at: u64) -> Vec<SessionEvent> {
        session.pointer_down(PointerEvent::new(7, 200.0, 300.0, at));
        session.pointer_move(PointerEvent::new(7, 200.0 + dx / 2.0, 300.0 + dy / 2.0, at + 16));
        session.pointer_up(PointerEvent::new(7, 200.0 + dx, 300.0 + dy, at + 32))
    }

    fn active(recording_index: usize, inner: InnerPage) -> FeedState {
        FeedState::Active {
            recording_index,
            inner,
        }
    }

    #[test]
    fn swipes_drive_the_two_level_navigation() {
        let mut session = session();
        let mut states = Vec::new();
        for n in 0..4 {
            swipe(&mut session, -80.0, 0.0, n * 100);
            states.push(session.state());
        }
        assert_eq!(
            states,
            vec![
                active(0, InnerPage::OnSnippet { index: 1 }),
                active(0, InnerPage::OnSnippet { index: 2 }),
                active(0, InnerPage::OnFullTrack),
                active(0, InnerPage::OnSnippet { index: 0 }),
            ]
        );

        swipe(&mut session, -80.0, 0.0, 500);
        swipe(&mut session, -80.0, 0.0, 600);
        let events = swipe(&mut session, 0.0, 120.0, 700);
        assert_eq!(session.state(), active(1, InnerPage::OnSnippet { index: 0 }));
        let announcements = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Nav(NavEvent::RecordingChanged { .. })))
            .count();
        assert_eq!(announcements, 1);
    }

    #[test]
    fn first_page_waits_for_a_gesture_before_playing() {
        let mut session = session();
        assert!(session.playback().is_blocked());
        assert!(!session.playback().is_playing());

        let events = swipe(&mut session, -80.0, 0.0, 100);
        assert!(events.contains(&SessionEvent::Playback(PlaybackNotice::Started)));
        assert!(session.playback().is_playing());
        assert!(!session.playback().is_blocked());
    }

    #[test]
    fn taps_do_not_navigate_or_unlock_audio() {
        let mut session = session();
        assert!(swipe(&mut session, 4.0, 3.0, 100).is_empty());
        assert_eq!(session.state(), active(0, InnerPage::OnSnippet { index: 0 }));
        assert!(!session.playback().gesture_unlocked());
    }

    #[test]
    fn frames_clamp_snippets_at_their_end() {
        let mut session = session();
        session.press_play();
        let window = session.playback().window();
        assert_eq!(window.kind, WindowKind::Snippet);

        let mut now = 0;
        let mut reached = false;
        while now < 120_000 {
            now += 100;
            let events = session.frame(now);
            reached |= events.contains(&SessionEvent::Playback(PlaybackNotice::ReachedWindowEnd));
        }
        assert!(reached);
        assert_eq!(session.playback().backend().current_time(), window.end);
        assert!(!session.playback().is_playing());
        assert_eq!(session.progress().elapsed, window.len());
    }

    #[test]
    fn page_change_cancels_previous_frame_tasks() {
        let mut session = session();
        let first_page = session.scheduler().current_page();
        assert_eq!(session.scheduler().len(), 2);

        swipe(&mut session, -80.0, 0.0, 100);
        let second_page = session.scheduler().current_page();
        assert_ne!(first_page, second_page);
        assert!(session
            .scheduler()
            .due()
            .iter()
            .all(|task| task.handle.page() == second_page));
    }

    #[test]
    fn quote_is_typed_out_then_its_task_retires() {
        let mut session = session();
        assert_eq!(session.visible_quote(0), Some(""));
        assert_eq!(session.visible_quote(250), Some("We kept"));

        session.frame(0);
        session.frame(10_000);
        assert_eq!(session.visible_quote(10_000), Some("We kept the lights on"));
        assert_eq!(session.scheduler().len(), 1);
    }

    #[test]
    fn reaction_sheet_calms_playback_and_page_change_closes_it() {
        let mut session = session();
        swipe(&mut session, -80.0, 0.0, 100);
        assert!(session.playback().is_playing());

        session.open_overlay(Overlay::Reactions, 200);
        assert!(!session.playback().is_playing());

        let events = swipe(&mut session, -80.0, 0.0, 300);
        assert!(events.contains(&SessionEvent::Nav(NavEvent::OverlaysClosed(vec![
            Overlay::Reactions
        ]))));
        assert!(session.playback().is_playing());
    }

    #[test]
    fn leaving_active_tears_playback_down() {
        let mut session = session();
        swipe(&mut session, 0.0, 120.0, 100);
        assert!(session.playback().is_playing());

        let events = swipe(&mut session, 0.0, 120.0, 200);
        assert_eq!(session.state(), FeedState::EndOfFeed);
        assert!(events.contains(&SessionEvent::Nav(NavEvent::LeftActive)));
        assert!(!session.playback().is_playing());
        assert!(session.scheduler().is_empty());
        assert!(session.press_play().is_empty());

        session.frame(300);
        let events = session.frame(1_900);
        assert!(events.contains(&SessionEvent::Nav(NavEvent::CallToActionRevealed)));
    }

    #[test]
    fn sideways_swipe_on_single_page_recording_keeps_playing() {
        let catalog = Catalog::new(vec![recording("rec-1", 0), recording("rec-2", 1)]).unwrap();
        let mut session = FeedSession::new(FeedConfig::default(), SimulatedAudio::new(900.0));
        session.load_catalog(catalog, 0);
        assert_eq!(session.state(), active(0, InnerPage::OnFullTrack));
        session.press_play();

        let mut now = 0;
        while now < 30_000 {
            now += 100;
            session.frame(now);
        }
        let before = session.progress().elapsed;
        assert!(before > 25.0);

        let events = swipe(&mut session, -80.0, 0.0, now);
        assert_eq!(events, vec![SessionEvent::Swiped(SwipeDirection::Left)]);
        assert_eq!(session.state(), active(0, InnerPage::OnFullTrack));
        assert!(session.playback().is_playing());
        assert_eq!(session.progress().elapsed, before);
    }

    #[test]
    fn missing_audio_keeps_the_page_navigable() {
        let catalog = Catalog::new(vec![recording("rec-1", 2), recording("rec-2", 1)]).unwrap();
        let backend = SimulatedAudio::new(900.0).with_failing_source("rec-1/full.mp3");
        let mut session = FeedSession::new(FeedConfig::default(), backend);
        session.load_catalog(catalog, 0);

        let events = swipe(&mut session, -80.0, 0.0, 100);
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Playback(PlaybackNotice::LoadFailed { .. })
        )));
        assert!(session.playback().is_blocked());
        assert_eq!(session.state(), active(0, InnerPage::OnSnippet { index: 1 }));

        swipe(&mut session, 0.0, 120.0, 200);
        assert_eq!(session.state(), active(1, InnerPage::OnSnippet { index: 0 }));
        assert!(session.playback().is_playing());
    }
}
