//! Display-free sessions: frames are forwarded over a channel to a simulated
//! participant running on its own thread, which answers through the input
//! channel exactly as a person at the mouse would.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::score::ScoreFunction;
use crate::experiment::channel::InputSender;
use crate::experiment::io::{Clock, Frame, InputEvent, Presenter, ScreenKind, Stimulus};

/// Sends every flipped frame down a channel.
#[derive(Debug)]
pub struct HeadlessPresenter {
    tx: Sender<Frame>,
    pending: Option<Frame>,
}

impl HeadlessPresenter {
    pub fn new() -> (Self, Receiver<Frame>) {
        let (tx, rx) = unbounded();
        (Self { tx, pending: None }, rx)
    }
}

impl Presenter for HeadlessPresenter {
    fn present(&mut self, frame: &Frame) {
        self.pending = Some(frame.clone());
    }

    fn flip(&mut self) {
        if let Some(frame) = self.pending.take() {
            if self.tx.send(frame).is_err() {
                debug!("no viewer attached; frame dropped");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Uniform choice among the offered gems.
    Random,
    /// Always the highest-scoring gem on offer.
    Greedy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParticipantStats {
    pub frames_seen: usize,
    pub selections: usize,
}

pub struct SimulatedParticipant<C> {
    strategy: Strategy,
    scorer: Box<dyn ScoreFunction>,
    rng: SmallRng,
    clock: C,
    /// Simulated reaction time range in milliseconds.
    think_ms: (u64, u64),
    stats: ParticipantStats,
}

impl<C: Clock + Send + 'static> SimulatedParticipant<C> {
    /// `scorer` is consulted by the greedy strategy only.
    pub fn new(strategy: Strategy, scorer: Box<dyn ScoreFunction>, seed: u64, clock: C) -> Self {
        Self {
            strategy,
            scorer,
            rng: SmallRng::seed_from_u64(seed),
            clock,
            think_ms: (350, 1200),
            stats: ParticipantStats::default(),
        }
    }

    pub fn with_think_ms(mut self, lo: u64, hi: u64) -> Self {
        self.think_ms = (lo.min(hi), lo.max(hi));
        self
    }

    /// The reply a participant gives to `frame`, if any.
    pub fn respond(&mut self, frame: &Frame) -> Option<InputEvent> {
        self.stats.frames_seen += 1;
        match frame {
            Frame::Screen(screen) => match (screen.kind, screen.click_target) {
                (ScreenKind::Break, _) => None,
                (_, Some(i)) => screen.stimuli.get(i).map(|target| InputEvent::Select {
                    pos: target.pos,
                    time: self.clock.now(),
                }),
                (_, None) => Some(InputEvent::Continue),
            },
            Frame::Search { stimuli, .. } => {
                let chosen = self.choose(stimuli)?;
                self.stats.selections += 1;
                let think = self.rng.random_range(self.think_ms.0..=self.think_ms.1);
                Some(InputEvent::Select {
                    pos: chosen.pos,
                    time: self.clock.now() + Duration::from_millis(think),
                })
            }
            Frame::Feedback {
                awaits_continue: true,
                ..
            } => Some(InputEvent::Continue),
            Frame::Feedback { .. } | Frame::Blank { .. } => None,
        }
    }

    fn choose<'s>(&mut self, stimuli: &'s [Stimulus]) -> Option<&'s Stimulus> {
        if stimuli.is_empty() {
            return None;
        }
        match self.strategy {
            Strategy::Random => stimuli.get(self.rng.random_range(0..stimuli.len())),
            Strategy::Greedy => stimuli
                .iter()
                .rev()
                .max_by_key(|s| self.scorer.score(s.coord)),
        }
    }

    /// Answer frames until the presenter side hangs up.
    pub fn spawn(mut self, frames: Receiver<Frame>, input: InputSender) -> JoinHandle<ParticipantStats> {
        std::thread::spawn(move || {
            while let Ok(frame) = frames.recv() {
                if let Some(event) = self.respond(&frame) {
                    if input.send(event).is_err() {
                        break;
                    }
                }
            }
            debug!(
                "participant done: {} frames, {} selections",
                self.stats.frames_seen, self.stats.selections
            );
            self.stats
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coord::Coord;
    use crate::core::layout::ScreenPos;
    use crate::core::score::SimpleHill;
    use crate::experiment::io::{ScoreBoard, Screen};
    use crate::experiment::scripted::ManualClock;

    fn stim(x: u32, y: u32, sx: f32) -> Stimulus {
        Stimulus {
            coord: Coord::new(x, y),
            pos: ScreenPos::new(sx, 0.0),
            ori: 0.0,
            sf: 0.1,
            size: 60.0,
        }
    }

    #[test]
    fn greedy_picks_highest_score() {
        let mut p = SimulatedParticipant::new(
            Strategy::Greedy,
            Box::new(SimpleHill::default()),
            1,
            ManualClock::default(),
        )
        .with_think_ms(500, 500);
        let frame = Frame::Search {
            header: String::new(),
            stimuli: vec![stim(0, 0, -100.0), stim(50, 50, 0.0), stim(10, 10, 100.0)],
            board: ScoreBoard::default(),
        };
        let Some(InputEvent::Select { pos, time }) = p.respond(&frame) else {
            panic!("expected a selection");
        };
        assert_eq!(pos, ScreenPos::new(0.0, 0.0));
        assert_eq!(time, Duration::from_millis(500));
    }

    #[test]
    fn screens_and_feedback_replies() {
        let mut p = SimulatedParticipant::new(
            Strategy::Random,
            Box::new(SimpleHill::default()),
            1,
            ManualClock::default(),
        );
        let screen = |kind| Frame::Screen(Screen::text(kind, "", ""));
        assert_eq!(p.respond(&screen(ScreenKind::Welcome)), Some(InputEvent::Continue));
        assert_eq!(p.respond(&screen(ScreenKind::Break)), None);

        let training = Frame::Screen(Screen {
            stimuli: vec![stim(10, 10, -100.0), stim(20, 20, 100.0)],
            click_target: Some(1),
            ..Screen::text(ScreenKind::Training, "", "")
        });
        assert_eq!(
            p.respond(&training),
            Some(InputEvent::Select {
                pos: ScreenPos::new(100.0, 0.0),
                time: Duration::ZERO,
            })
        );
        let feedback = |awaits_continue| Frame::Feedback {
            header: None,
            stimuli: Vec::new(),
            entries: Vec::new(),
            board: ScoreBoard::default(),
            awaits_continue,
        };
        assert_eq!(p.respond(&feedback(true)), Some(InputEvent::Continue));
        assert_eq!(p.respond(&feedback(false)), None);
        assert_eq!(p.respond(&Frame::Blank { board: ScoreBoard::default() }), None);
    }
}
