//! Core library for the Testimony Feed.
//!
//! The feed presents recorded testimonies one at a time. Each recording is a
//! handful of curated snippets plus its full track, and the user moves
//! through them with swipes alone. The crate is split by subsystem:
//!
//! * [`seed`] derives stable pseudo-random values from string keys.
//! * [`planner`] turns those values into clip windows and visual variants.
//! * [`gesture`] classifies pointer motion into swipe directions.
//! * [`navigator`] runs the two-level feed state machine.
//! * [`playback`] owns the single shared audio resource.
//! * [`timeline`] hosts frame-driven effects and timed reveals.
//! * [`session`] wires the above into one feed view.
//! * [`proxy`] models the message contract of the voice proxy channel.

pub mod catalog;
pub mod config;
pub mod error;
pub mod gesture;
pub mod navigator;
pub mod planner;
pub mod playback;
pub mod proxy;
pub mod seed;
pub mod session;
pub mod timeline;

pub use catalog::{Catalog, ClipOffsets, Recording, Snippet};
pub use config::{FeedConfig, GestureConfig, PlannerConfig, TimingConfig};
pub use error::{FeedError, Result};
pub use gesture::{GestureRouter, GestureSample, PointerEvent, SwipeDirection};
pub use navigator::{FeedNavigator, FeedState, InnerPage, NavEvent, NavIntent, Overlay, RequestOutcome};
pub use planner::{ClipWindow, ContentWindowPlanner, PagePlan, VisualVariant};
pub use playback::{
    AudioBackend, AudioEvent, PlaybackController, PlaybackNotice, PlaybackProgress,
    PlaybackWindow, SimulatedAudio, WindowKind,
};
pub use proxy::{ProxyInbound, ProxyNotice, ProxyOutbound, VoiceProxyChannel};
pub use seed::{SeedKey, SeedPurpose, SeededStream};
pub use session::{FeedSession, SessionEvent};
pub use timeline::{FrameClock, FrameScheduler, TimedReveal, TypedReveal};
