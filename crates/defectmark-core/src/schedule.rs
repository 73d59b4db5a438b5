//! Render scheduling.
//!
//! Resize and zoom arrive in bursts while the user drags a window edge or
//! spins a wheel; those requests are debounced. Everything else renders on
//! the next poll. Callers pass `now` explicitly.

use crate::config::EngineConfig;
use std::time::{Duration, Instant};

/// Default quiet period for resize/zoom bursts.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// How urgently a state change needs a new frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderRequest {
    /// Nothing visible changed.
    #[default]
    None,
    /// Render on the next poll.
    Immediate,
    /// Render once the burst has been quiet for the debounce delay.
    Debounced,
}

impl RenderRequest {
    /// The more urgent of two requests. A debounced request wins over an
    /// immediate one so bursts stay coalesced.
    pub fn merge(self, other: RenderRequest) -> RenderRequest {
        match (self, other) {
            (RenderRequest::Debounced, _) | (_, RenderRequest::Debounced) => RenderRequest::Debounced,
            (RenderRequest::Immediate, _) | (_, RenderRequest::Immediate) => RenderRequest::Immediate,
            _ => RenderRequest::None,
        }
    }
}

/// Trailing-edge debouncer.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Record an event; pushes the deadline back.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// True once per burst, when the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Decides when a host should render a new frame.
#[derive(Debug, Clone)]
pub struct RenderScheduler {
    debounce: Debouncer,
    dirty: bool,
    frames: u64,
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl RenderScheduler {
    /// A new scheduler wants an initial frame.
    pub fn new(delay: Duration) -> Self {
        Self {
            debounce: Debouncer::new(delay),
            dirty: true,
            frames: 0,
        }
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self::new(Duration::from_millis(config.resize_debounce_ms))
    }

    pub fn request(&mut self, request: RenderRequest, now: Instant) {
        match request {
            RenderRequest::None => {}
            RenderRequest::Immediate => self.dirty = true,
            RenderRequest::Debounced => self.debounce.trigger(now),
        }
    }

    /// Returns true when a frame should be rendered now.
    ///
    /// While a debounced burst is in progress, immediate requests wait and
    /// are folded into the frame rendered when the burst settles.
    pub fn poll(&mut self, now: Instant) -> bool {
        let render = if self.debounce.is_pending() {
            self.debounce.fire(now)
        } else {
            self.dirty
        };
        if render {
            self.dirty = false;
            self.frames += 1;
        }
        render
    }

    /// When the host should poll again, if a burst is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    pub fn is_idle(&self) -> bool {
        !self.dirty && !self.debounce.is_pending()
    }

    /// Frames granted so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
