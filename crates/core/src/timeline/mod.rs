//! Frame-driven effects and timed reveals.
//!
//! Effects that run on every render frame (playback progress polling, the
//! typed quote reveal) are registered with a [`FrameScheduler`] and bound to
//! the [`PageToken`] of the page that started them. Entering a new page
//! cancels everything the previous page scheduled, and the scheduler never
//! hands out a task whose page is no longer current.

use serde::{Deserialize, Serialize};

/// Converts absolute frame timestamps into per-frame deltas.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    last_ms: Option<u64>,
}

impl FrameClock {
    pub fn reset(&mut self) {
        self.last_ms = None;
    }

    /// Seconds elapsed since the previous frame; zero on the first frame or
    /// if time went backwards.
    pub fn advance(&mut self, now_ms: u64) -> f64 {
        let delta = self
            .last_ms
            .map(|last| now_ms.saturating_sub(last))
            .unwrap_or(0);
        self.last_ms = Some(now_ms);
        delta as f64 / 1000.0
    }
}

/// Identity of one visible page. Changes every time the page changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PageToken(u64);

impl PageToken {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameTask {
    ProgressPoll,
    QuoteReveal,
}

/// Returned when a frame effect starts; cancelling it stops the effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    id: u64,
    page: PageToken,
}

impl TaskHandle {
    pub fn page(&self) -> PageToken {
        self.page
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub handle: TaskHandle,
    pub kind: FrameTask,
    pub started_ms: u64,
}

#[derive(Debug, Default)]
pub struct FrameScheduler {
    tasks: Vec<ScheduledTask>,
    next_id: u64,
    current_page: PageToken,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_page(&self) -> PageToken {
        self.current_page
    }

    /// Moves to a fresh page, cancelling every task of the previous one.
    pub fn enter_page(&mut self) -> PageToken {
        self.tasks.clear();
        self.current_page = self.current_page.next();
        self.current_page
    }

    /// Registers `kind` for the current page.
    pub fn schedule(&mut self, kind: FrameTask, now_ms: u64) -> TaskHandle {
        let handle = TaskHandle {
            id: self.next_id,
            page: self.current_page,
        };
        self.next_id += 1;
        self.tasks.push(ScheduledTask {
            handle,
            kind,
            started_ms: now_ms,
        });
        handle
    }

    /// Returns `true` if the task was still scheduled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.handle != handle);
        before != self.tasks.len()
    }

    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.tasks.iter().any(|task| task.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks to run this frame. Only tasks of the current page are returned.
    pub fn due(&self) -> Vec<ScheduledTask> {
        self.tasks
            .iter()
            .filter(|task| task.handle.page == self.current_page)
            .cloned()
            .collect()
    }
}

/// One-shot timer that fires once `at_ms` has been reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedReveal {
    at_ms: u64,
    fired: bool,
}

impl TimedReveal {
    pub fn after(now_ms: u64, delay_ms: u64) -> Self {
        Self {
            at_ms: now_ms.saturating_add(delay_ms),
            fired: false,
        }
    }

    pub fn at_ms(&self) -> u64 {
        self.at_ms
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Returns `true` exactly once, on the first poll at or after `at_ms`.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if self.fired || now_ms < self.at_ms {
            return false;
        }
        self.fired = true;
        true
    }
}

/// Character-by-character reveal of a quote, driven by frame time.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedReveal {
    total_chars: usize,
    started_ms: u64,
    chars_per_second: f64,
}

impl TypedReveal {
    pub fn start(text: &str, now_ms: u64, chars_per_second: f64) -> Self {
        Self {
            total_chars: text.chars().count(),
            started_ms: now_ms,
            chars_per_second,
        }
    }

    pub fn visible_chars(&self, now_ms: u64) -> usize {
        let elapsed = now_ms.saturating_sub(self.started_ms) as f64 / 1000.0;
        let shown = (elapsed * self.chars_per_second).floor();
        if shown <= 0.0 {
            0
        } else {
            (shown as usize).min(self.total_chars)
        }
    }

    pub fn is_complete(&self, now_ms: u64) -> bool {
        self.visible_chars(now_ms) >= self.total_chars
    }

    /// The revealed prefix of `text`.
    pub fn visible_text<'a>(&self, text: &'a str, now_ms: u64) -> &'a str {
        let count = self.visible_chars(now_ms);
        match text.char_indices().nth(count) {
            Some((byte, _)) => &text[..byte],
            None => text,
        }
    }
}
