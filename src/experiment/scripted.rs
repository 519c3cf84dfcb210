//! Deterministic collaborators for tests and dry runs.

use std::cell::Cell;
use std::collections::VecDeque;
use std::time::Duration;

use crate::experiment::io::{Clock, Frame, InputEvent, InputSource, Presenter};

/// Replays a fixed list of events.
///
/// Untimed waits consume the next event; an exhausted script reports quit so
/// a session driven past its script stops. Timed waits only consume a queued
/// quit and otherwise let the timeout elapse, so scripted selections are not
/// swallowed by feedback or ITI holds.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    events: VecDeque<InputEvent>,
}

impl ScriptedInput {
    pub fn new(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl InputSource for ScriptedInput {
    fn wait_event(&mut self, timeout: Option<Duration>) -> Option<InputEvent> {
        match timeout {
            None => Some(self.events.pop_front().unwrap_or(InputEvent::Quit)),
            Some(_) => match self.events.front() {
                Some(InputEvent::Quit) => self.events.pop_front(),
                _ => None,
            },
        }
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Keeps every flipped frame.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pending: Option<Frame>,
    pub frames: Vec<Frame>,
}

impl Presenter for RecordingPresenter {
    fn present(&mut self, frame: &Frame) {
        self.pending = Some(frame.clone());
    }

    fn flip(&mut self) {
        if let Some(frame) = self.pending.take() {
            self.frames.push(frame);
        }
    }
}
