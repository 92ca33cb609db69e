//! Two-level navigation: which recording is active, and which page
//! (a snippet or the full track) of that recording is visible.
//!
//! Top-level flow:
//!
//! ```text
//! Loading --catalog ready--> Active --past last recording--> EndOfFeed
//!                              |                                 |
//!                              +--ask for more on last-----+     | ask for next content
//!                                                          v     v
//!                                                RequestingNewContent --submit/decline--> Active
//! ```
//!
//! Recordings are consumed forward only; the recording index never
//! decreases within a session.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    config::{FeedConfig, TimingConfig},
    gesture::SwipeDirection,
    planner::{ContentWindowPlanner, PagePlan, VisualVariant},
    timeline::TimedReveal,
    Catalog, Recording, Result,
};

/// Visible page within the active recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InnerPage {
    OnSnippet { index: usize },
    /// The full track is the last page of a recording.
    OnFullTrack,
}

impl InnerPage {
    /// First page of a recording with `snippet_count` snippets.
    pub fn first(snippet_count: usize) -> Self {
        if snippet_count == 0 {
            InnerPage::OnFullTrack
        } else {
            InnerPage::OnSnippet { index: 0 }
        }
    }

    /// Next page, wrapping from the full track back to the first snippet.
    pub fn advance(self, snippet_count: usize) -> Self {
        if snippet_count == 0 {
            return InnerPage::OnFullTrack;
        }
        match self {
            InnerPage::OnSnippet { index } if index + 1 >= snippet_count => InnerPage::OnFullTrack,
            InnerPage::OnSnippet { index } => InnerPage::OnSnippet { index: index + 1 },
            InnerPage::OnFullTrack => InnerPage::OnSnippet { index: 0 },
        }
    }

    /// Previous page; the first snippet wraps back to the full track.
    pub fn retreat(self, snippet_count: usize) -> Self {
        if snippet_count == 0 {
            return InnerPage::OnFullTrack;
        }
        match self {
            InnerPage::OnSnippet { index: 0 } => InnerPage::OnFullTrack,
            InnerPage::OnSnippet { index } => InnerPage::OnSnippet {
                index: (index - 1).min(snippet_count - 1),
            },
            InnerPage::OnFullTrack => InnerPage::OnSnippet {
                index: snippet_count - 1,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedState {
    Loading,
    Active {
        recording_index: usize,
        inner: InnerPage,
    },
    EndOfFeed,
    RequestingNewContent,
}

/// Navigation intents, decoupled from the gesture that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavIntent {
    AdvanceWithin,
    RetreatWithin,
    NextRecording,
    /// Accepted but ignored: the feed is forward only.
    PreviousRecording,
}

impl From<SwipeDirection> for NavIntent {
    fn from(direction: SwipeDirection) -> Self {
        match direction {
            SwipeDirection::Left => NavIntent::AdvanceWithin,
            SwipeDirection::Right => NavIntent::RetreatWithin,
            SwipeDirection::Down => NavIntent::NextRecording,
            SwipeDirection::Up => NavIntent::PreviousRecording,
        }
    }
}

/// Secondary UI attached to the visible page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Overlay {
    Transcript,
    Reactions,
}

impl Overlay {
    /// Whether opening this overlay should pause playback.
    pub fn calms_playback(self) -> bool {
        matches!(self, Overlay::Reactions)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Submitted(Vec<Recording>),
    Declined,
}

/// Side effects of a transition, consumed by the session and renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    /// A new page is visible and should be bound for playback.
    PageChanged {
        recording_index: usize,
        page: InnerPage,
        plan: PagePlan,
    },
    /// Transient banner announcing a new recording.
    RecordingChanged {
        from: usize,
        to: usize,
        banner_until_ms: u64,
    },
    BannerDismissed,
    OverlayOpened(Overlay),
    OverlayClosed(Overlay),
    /// Every open overlay was closed because the page changed.
    OverlaysClosed(Vec<Overlay>),
    /// The top state left `Active`; playback must be torn down.
    LeftActive,
    EnteredEndOfFeed { cta_at_ms: u64 },
    CallToActionRevealed,
    RequestingNewContent,
    CatalogExtended { added: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestOrigin {
    EndOfFeed,
    Active {
        recording_index: usize,
        inner: InnerPage,
    },
}

#[derive(Debug)]
pub struct FeedNavigator {
    timing: TimingConfig,
    planner: ContentWindowPlanner,
    catalog: Catalog,
    state: FeedState,
    overlays: BTreeSet<Overlay>,
    banner: Option<TimedReveal>,
    end_cta: Option<TimedReveal>,
    last_active: Option<(usize, InnerPage)>,
    request_origin: Option<RequestOrigin>,
}

impl FeedNavigator {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            timing: config.timing.clone(),
            planner: ContentWindowPlanner::new(config.planner.clone()),
            catalog: Catalog::default(),
            state: FeedState::Loading,
            overlays: BTreeSet::new(),
            banner: None,
            end_cta: None,
            last_active: None,
            request_origin: None,
        }
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn planner(&self) -> &ContentWindowPlanner {
        &self.planner
    }

    /// True when the feed has no recordings at all.
    pub fn is_empty_feed(&self) -> bool {
        self.state != FeedState::Loading && self.catalog.is_empty()
    }

    pub fn current_recording(&self) -> Option<&Recording> {
        match self.state {
            FeedState::Active {
                recording_index, ..
            } => self.catalog.get(recording_index),
            _ => None,
        }
    }

    pub fn current_page(&self) -> Option<InnerPage> {
        match self.state {
            FeedState::Active { inner, .. } => Some(inner),
            _ => None,
        }
    }

    pub fn current_plan(&self) -> Option<PagePlan> {
        let page = self.current_page()?;
        let recording = self.current_recording()?;
        Some(self.planner.plan_page(recording, page))
    }

    pub fn current_variant(&self) -> Option<VisualVariant> {
        let page = self.current_page()?;
        let recording = self.current_recording()?;
        Some(self.planner.page_variant(recording, page))
    }

    /// Summary text of the visible snippet, if a snippet is visible.
    pub fn current_quote(&self) -> Option<&str> {
        let recording = self.current_recording()?;
        match self.current_page()? {
            InnerPage::OnSnippet { index } => recording
                .snippets
                .get(index)
                .map(|snippet| snippet.summary.as_str()),
            InnerPage::OnFullTrack => None,
        }
    }

    pub fn overlays(&self) -> impl Iterator<Item = Overlay> + '_ {
        self.overlays.iter().copied()
    }

    pub fn banner_visible(&self) -> bool {
        self.banner.map(|b| !b.has_fired()).unwrap_or(false)
    }

    pub fn call_to_action_visible(&self) -> bool {
        self.state == FeedState::EndOfFeed && self.end_cta.map(|c| c.has_fired()).unwrap_or(false)
    }

    /// Supplies the catalog and leaves `Loading`. An empty catalog goes
    /// straight to the end-of-feed state, from where more content can be
    /// requested.
    pub fn load_catalog(&mut self, catalog: Catalog, now_ms: u64) -> Vec<NavEvent> {
        if self.state != FeedState::Loading {
            debug!(state = ?self.state, "catalog already loaded, ignoring");
            return Vec::new();
        }
        self.catalog = catalog;
        info!(recordings = self.catalog.len(), "catalog ready");

        let mut events = Vec::new();
        if self.catalog.is_empty() {
            self.enter_end_of_feed(now_ms, &mut events);
        } else {
            self.enter_recording(0, &mut events);
        }
        events
    }

    /// Convenience for routing a swipe straight into [`FeedNavigator::apply`].
    pub fn apply_swipe(&mut self, direction: SwipeDirection, now_ms: u64) -> Vec<NavEvent> {
        self.apply(NavIntent::from(direction), now_ms)
    }

    pub fn apply(&mut self, intent: NavIntent, now_ms: u64) -> Vec<NavEvent> {
        let FeedState::Active {
            recording_index,
            inner,
        } = self.state
        else {
            debug!(state = ?self.state, ?intent, "intent ignored outside active state");
            return Vec::new();
        };
        let snippet_count = self
            .catalog
            .get(recording_index)
            .map(Recording::snippet_count)
            .unwrap_or(0);

        let mut events = Vec::new();
        match intent {
            NavIntent::AdvanceWithin | NavIntent::RetreatWithin => {
                let page = if intent == NavIntent::AdvanceWithin {
                    inner.advance(snippet_count)
                } else {
                    inner.retreat(snippet_count)
                };
                if page == inner {
                    debug!(recording_index, ?page, "single page recording, nothing to turn");
                } else {
                    self.change_page(recording_index, page, &mut events);
                }
            }
            NavIntent::NextRecording => {
                let next = recording_index + 1;
                if next < self.catalog.len() {
                    let banner_until_ms = now_ms.saturating_add(self.timing.banner_duration_ms());
                    self.banner = Some(TimedReveal::after(now_ms, self.timing.banner_duration_ms()));
                    events.push(NavEvent::RecordingChanged {
                        from: recording_index,
                        to: next,
                        banner_until_ms,
                    });
                    self.enter_recording(next, &mut events);
                } else {
                    self.leave_active(&mut events);
                    self.enter_end_of_feed(now_ms, &mut events);
                }
            }
            NavIntent::PreviousRecording => {
                debug!(recording_index, "previous recording is not offered");
            }
        }
        events
    }

    /// Opens the request form from the end of the feed, or from the last
    /// recording once the user has reached it.
    pub fn request_new_content(&mut self) -> Vec<NavEvent> {
        let origin = match self.state {
            FeedState::EndOfFeed => RequestOrigin::EndOfFeed,
            FeedState::Active {
                recording_index,
                inner,
            } if recording_index + 1 >= self.catalog.len() => RequestOrigin::Active {
                recording_index,
                inner,
            },
            state => {
                debug!(?state, "new content can only be requested at the end of the feed");
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        if matches!(origin, RequestOrigin::Active { .. }) {
            self.leave_active(&mut events);
        }
        self.end_cta = None;
        self.request_origin = Some(origin);
        self.state = FeedState::RequestingNewContent;
        info!(?origin, "requesting new content");
        events.push(NavEvent::RequestingNewContent);
        events
    }

    /// Closes the request form. Submitted recordings are appended to the
    /// feed; when the request came from the end of the feed, the first new
    /// recording becomes active.
    pub fn finish_request(&mut self, outcome: RequestOutcome, now_ms: u64) -> Result<Vec<NavEvent>> {
        if self.state != FeedState::RequestingNewContent {
            debug!(state = ?self.state, "no pending content request");
            return Ok(Vec::new());
        }
        let origin = self.request_origin.unwrap_or(RequestOrigin::EndOfFeed);
        let mut events = Vec::new();

        let first_new = match outcome {
            RequestOutcome::Submitted(recordings) if !recordings.is_empty() => {
                let first_new = self.catalog.len();
                let added = recordings.len();
                self.catalog.extend(recordings)?;
                info!(added, "catalog extended");
                events.push(NavEvent::CatalogExtended { added });
                Some(first_new)
            }
            _ => None,
        };
        self.request_origin = None;

        match (origin, first_new) {
            (RequestOrigin::EndOfFeed, Some(index)) => self.enter_recording(index, &mut events),
            (
                RequestOrigin::Active {
                    recording_index,
                    inner,
                },
                _,
            ) => self.change_page(recording_index, inner, &mut events),
            (RequestOrigin::EndOfFeed, None) => match self.last_active {
                Some((recording_index, inner)) => {
                    self.change_page(recording_index, inner, &mut events)
                }
                None => self.enter_end_of_feed(now_ms, &mut events),
            },
        }
        Ok(events)
    }

    pub fn open_overlay(&mut self, overlay: Overlay) -> Vec<NavEvent> {
        if !matches!(self.state, FeedState::Active { .. }) {
            return Vec::new();
        }
        if self.overlays.insert(overlay) {
            vec![NavEvent::OverlayOpened(overlay)]
        } else {
            Vec::new()
        }
    }

    pub fn close_overlay(&mut self, overlay: Overlay) -> Vec<NavEvent> {
        if self.overlays.remove(&overlay) {
            vec![NavEvent::OverlayClosed(overlay)]
        } else {
            Vec::new()
        }
    }

    /// Advances timed reveals.
    pub fn tick(&mut self, now_ms: u64) -> Vec<NavEvent> {
        let mut events = Vec::new();
        if let Some(banner) = self.banner.as_mut() {
            if banner.poll(now_ms) {
                events.push(NavEvent::BannerDismissed);
            }
        }
        if self.state == FeedState::EndOfFeed {
            if let Some(cta) = self.end_cta.as_mut() {
                if cta.poll(now_ms) {
                    events.push(NavEvent::CallToActionRevealed);
                }
            }
        }
        events
    }

    fn enter_recording(&mut self, recording_index: usize, events: &mut Vec<NavEvent>) {
        let snippet_count = self
            .catalog
            .get(recording_index)
            .map(Recording::snippet_count)
            .unwrap_or(0);
        self.change_page(recording_index, InnerPage::first(snippet_count), events);
    }

    fn change_page(&mut self, recording_index: usize, page: InnerPage, events: &mut Vec<NavEvent>) {
        let Some(recording) = self.catalog.get(recording_index) else {
            return;
        };
        let plan = self.planner.plan_page(recording, page);

        if !self.overlays.is_empty() {
            let closed = std::mem::take(&mut self.overlays).into_iter().collect();
            events.push(NavEvent::OverlaysClosed(closed));
        }

        self.state = FeedState::Active {
            recording_index,
            inner: page,
        };
        self.end_cta = None;
        info!(recording_index, ?page, start = plan.window.start, end = plan.window.end, "page changed");
        events.push(NavEvent::PageChanged {
            recording_index,
            page,
            plan,
        });
    }

    fn leave_active(&mut self, events: &mut Vec<NavEvent>) {
        if let FeedState::Active {
            recording_index,
            inner,
        } = self.state
        {
            self.last_active = Some((recording_index, inner));
            if !self.overlays.is_empty() {
                let closed = std::mem::take(&mut self.overlays).into_iter().collect();
                events.push(NavEvent::OverlaysClosed(closed));
            }
            events.push(NavEvent::LeftActive);
        }
    }

    fn enter_end_of_feed(&mut self, now_ms: u64, events: &mut Vec<NavEvent>) {
        let delay = self.timing.end_cta_delay();
        let cta = TimedReveal::after(now_ms, delay);
        self.end_cta = Some(cta);
        self.state = FeedState::EndOfFeed;
        info!(empty = self.catalog.is_empty(), "end of feed");
        events.push(NavEvent::EnteredEndOfFeed {
            cta_at_ms: cta.at_ms(),
        });
    }
}
