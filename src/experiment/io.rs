//! Collaborator contracts between the experiment core and whatever draws the
//! stimuli, reads the participant's input and keeps time.
//!
//! The core only builds [`Frame`]s and consumes [`InputEvent`]s. It never
//! constructs a window, mouse or clock of its own; those are injected into
//! the session at construction.

use std::time::Duration;

use crate::core::coord::Coord;
use crate::core::error::Outcome;
use crate::core::layout::ScreenPos;

/// One grating placed on screen.
#[derive(Clone, Debug, PartialEq)]
pub struct Stimulus {
    pub coord: Coord,
    pub pos: ScreenPos,
    pub ori: f32,
    pub sf: f32,
    pub size: f32,
}

/// Running score shown in the corner of every trial frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScoreBoard {
    pub total: i64,
    /// Total before the last selection, set on feedback frames only.
    pub previous: Option<i64>,
    pub delta: Option<i64>,
}

impl ScoreBoard {
    pub fn total(total: i64) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }
}

/// Score label drawn above one stimulus during feedback.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedbackEntry {
    pub coord: Coord,
    pub pos: ScreenPos,
    pub score: i64,
    pub selected: bool,
    /// Highlighted as the best gem on offer. On training feedback the
    /// selected gem loses the highlight when another sampled gem scores more.
    pub best: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenKind {
    Welcome,
    Training,
    Test,
    Break,
    BreakComplete,
    End,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Screen {
    pub kind: ScreenKind,
    pub title: String,
    pub body: String,
    /// Example gems drawn under the text.
    pub stimuli: Vec<Stimulus>,
    /// Index into `stimuli` of the gem that must be clicked to advance.
    /// Without one the screen advances on a continue signal.
    pub click_target: Option<usize>,
}

impl Screen {
    pub fn text(kind: ScreenKind, title: &str, body: &str) -> Self {
        Self {
            kind,
            title: title.to_string(),
            body: body.to_string(),
            stimuli: Vec::new(),
            click_target: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// Instructions, break and end screens.
    Screen(Screen),
    /// The search array awaiting a selection.
    Search {
        header: String,
        stimuli: Vec<Stimulus>,
        board: ScoreBoard,
    },
    Feedback {
        header: Option<String>,
        stimuli: Vec<Stimulus>,
        entries: Vec<FeedbackEntry>,
        board: ScoreBoard,
        /// The frame stays up until a continue signal rather than for a fixed
        /// duration.
        awaits_continue: bool,
    },
    /// Inter-trial frame: score only.
    Blank { board: ScoreBoard },
}

/// Draws frames. `present` composes the back buffer, `flip` shows it.
pub trait Presenter {
    fn present(&mut self, frame: &Frame);

    fn flip(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    /// A click at `pos`, stamped with the session clock.
    Select { pos: ScreenPos, time: Duration },
    Continue,
    Quit,
}

pub trait InputSource {
    /// Block until the next event. With a timeout, `None` means it elapsed
    /// with nothing to report. Without one, `None` means the source is gone.
    fn wait_event(&mut self, timeout: Option<Duration>) -> Option<InputEvent>;
}

/// Elapsed time since the session clock started.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Hold for `duration`, discarding everything but quit.
pub fn wait_timed<I, C>(input: &mut I, clock: &C, duration: Duration) -> Outcome<()>
where
    I: InputSource + ?Sized,
    C: Clock + ?Sized,
{
    let deadline = clock.now() + duration;
    loop {
        let now = clock.now();
        if now >= deadline {
            return Outcome::Completed(());
        }
        match input.wait_event(Some(deadline - now)) {
            Some(InputEvent::Quit) => return Outcome::Quit,
            Some(_) => continue,
            None => return Outcome::Completed(()),
        }
    }
}

/// Block until a continue signal. With `accept_click` any selection also
/// advances. A vanished input source counts as quit.
pub fn wait_continue<I>(input: &mut I, accept_click: bool) -> Outcome<()>
where
    I: InputSource + ?Sized,
{
    loop {
        match input.wait_event(None) {
            Some(InputEvent::Continue) => return Outcome::Completed(()),
            Some(InputEvent::Select { .. }) if accept_click => return Outcome::Completed(()),
            Some(InputEvent::Select { .. }) => continue,
            Some(InputEvent::Quit) | None => return Outcome::Quit,
        }
    }
}

/// Block until a selection lands within `radius` of `target`. Other
/// events are ignored; quit or a vanished source ends the wait.
pub fn wait_click_on<I>(input: &mut I, target: ScreenPos, radius: f32) -> Outcome<()>
where
    I: InputSource + ?Sized,
{
    loop {
        match input.wait_event(None) {
            Some(InputEvent::Select { pos, .. }) if pos.distance(target) <= radius => {
                return Outcome::Completed(());
            }
            Some(InputEvent::Select { .. } | InputEvent::Continue) => continue,
            Some(InputEvent::Quit) | None => return Outcome::Quit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::scripted::ScriptedInput;

    fn click(x: f32, y: f32) -> InputEvent {
        InputEvent::Select {
            pos: ScreenPos::new(x, y),
            time: Duration::ZERO,
        }
    }

    #[test]
    fn click_wait_ignores_misses_and_continue() {
        let mut input = ScriptedInput::new(vec![
            click(-100.0, -200.0),
            InputEvent::Continue,
            click(110.0, -190.0),
        ]);
        let out = wait_click_on(&mut input, ScreenPos::new(100.0, -200.0), 30.0);
        assert_eq!(out, Outcome::Completed(()));
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn click_wait_observes_quit() {
        let mut input = ScriptedInput::new(vec![click(0.0, 0.0), InputEvent::Quit]);
        let out = wait_click_on(&mut input, ScreenPos::new(100.0, -200.0), 30.0);
        assert!(out.is_quit());
    }
}
