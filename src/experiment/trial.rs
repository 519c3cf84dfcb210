//! One search trial as an explicit state machine:
//! `AwaitingSample → AwaitingSelection → Scored → Complete`.
//!
//! Training and test trials run through the same machine; they differ only
//! in the [`TrialPolicy`] (which scores are revealed and how feedback ends).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::coord::Coord;
use crate::core::error::{GemsError, Outcome, Result};
use crate::core::landscape::Landscape;
use crate::core::layout::StimulusLayout;
use crate::core::neighborhood::SamplePolicy;
use crate::experiment::io::{
    Clock, FeedbackEntry, Frame, InputEvent, InputSource, Presenter, ScoreBoard, Stimulus,
    wait_continue, wait_timed,
};
use crate::experiment::record::{FeedbackMode, SubjectInfo, TrialRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Chebyshev radius of the neighborhood around the quarry.
    pub radius: u32,
    pub n_search_items: usize,
    #[serde(default)]
    pub policy: SamplePolicy,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            radius: 8,
            n_search_items: 9,
            policy: SamplePolicy::Strict,
        }
    }
}

/// How the feedback frame ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    /// Wait for a continue signal or a click.
    OnContinue,
    /// Hold for a fixed duration.
    After(Duration),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrialPolicy {
    pub feedback: FeedbackMode,
    pub advance: Advance,
    pub iti: Duration,
    pub header: String,
    pub feedback_header: Option<String>,
}

/// Position and score across trials. Mutated once per completed selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub pos: Coord,
    pub total: i64,
    pub trials_completed: usize,
}

impl SessionState {
    pub fn new(pos: Coord) -> Self {
        Self {
            pos,
            total: 0,
            trials_completed: 0,
        }
    }

    /// The quarry moves to the chosen cell and its score is banked.
    fn apply(&mut self, selected: Coord, score: i64) {
        self.pos = selected;
        self.total += score;
        self.trials_completed += 1;
    }
}

/// Per-trial bookkeeping copied onto the record.
#[derive(Clone, Debug, PartialEq)]
pub struct TrialMeta {
    pub subject: SubjectInfo,
    pub quarry: Option<u32>,
    pub starting_pos: Option<Coord>,
    pub trial: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TrialState {
    AwaitingSample,
    AwaitingSelection {
        stimuli: Vec<Stimulus>,
        onset: Duration,
    },
    Scored {
        record: TrialRecord,
        stimuli: Vec<Stimulus>,
        previous_total: i64,
    },
    Complete(TrialRecord),
}

impl TrialState {
    pub fn name(&self) -> &'static str {
        match self {
            TrialState::AwaitingSample => "awaiting-sample",
            TrialState::AwaitingSelection { .. } => "awaiting-selection",
            TrialState::Scored { .. } => "scored",
            TrialState::Complete(_) => "complete",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TrialOutcome {
    Completed(TrialRecord),
    /// Quit arrived during feedback or the ITI; the trial had been scored.
    QuitAfterScoring(TrialRecord),
    /// Quit arrived before a selection.
    Quit,
}

pub struct TrialEngine<'a, P: ?Sized, I: ?Sized, C: ?Sized> {
    pub landscape: &'a mut Landscape,
    pub layout: &'a StimulusLayout,
    pub presenter: &'a mut P,
    pub input: &'a mut I,
    pub clock: &'a C,
    pub search: SearchParams,
}

impl<P, I, C> TrialEngine<'_, P, I, C>
where
    P: Presenter + ?Sized,
    I: InputSource + ?Sized,
    C: Clock + ?Sized,
{
    pub fn run(
        &mut self,
        session: &mut SessionState,
        policy: &TrialPolicy,
        meta: &TrialMeta,
    ) -> Result<TrialOutcome> {
        let mut state = TrialState::AwaitingSample;
        loop {
            debug!("trial {:?}: {}", meta.trial, state.name());
            state = match state {
                TrialState::AwaitingSample => self.present_sample(session, policy)?,
                TrialState::AwaitingSelection { stimuli, onset } => {
                    match self.await_selection(&stimuli) {
                        Outcome::Completed((index, time)) => {
                            let rt = time.saturating_sub(onset);
                            self.score(session, meta, policy, stimuli, index, rt)?
                        }
                        Outcome::Quit => return Ok(TrialOutcome::Quit),
                    }
                }
                TrialState::Scored {
                    record,
                    stimuli,
                    previous_total,
                } => match self.feedback(&record, &stimuli, previous_total, policy)? {
                    Outcome::Completed(()) => TrialState::Complete(record),
                    Outcome::Quit => return Ok(TrialOutcome::QuitAfterScoring(record)),
                },
                TrialState::Complete(record) => return Ok(TrialOutcome::Completed(record)),
            };
        }
    }

    fn present_sample(&mut self, session: &SessionState, policy: &TrialPolicy) -> Result<TrialState> {
        let sample = self.landscape.sample_neighborhood(
            session.pos,
            self.search.radius,
            self.search.n_search_items,
            self.search.policy,
        )?;
        if sample.len() != self.layout.len() {
            return Err(GemsError::Configuration(format!(
                "sampled {} gems for {} screen slots",
                sample.len(),
                self.layout.len()
            )));
        }

        let mut stimuli = Vec::with_capacity(sample.len());
        for (coord, pos) in sample.into_iter().zip(self.layout.slots()) {
            let gabor = self.landscape.gabor(coord)?;
            stimuli.push(Stimulus {
                coord,
                pos: *pos,
                ori: gabor.ori,
                sf: gabor.sf,
                size: self.layout.stim_size(),
            });
        }

        self.presenter.present(&Frame::Search {
            header: policy.header.clone(),
            stimuli: stimuli.clone(),
            board: ScoreBoard::total(session.total),
        });
        self.presenter.flip();
        let onset = self.clock.now();
        Ok(TrialState::AwaitingSelection { stimuli, onset })
    }

    /// Clicks that miss every stimulus are ignored.
    fn await_selection(&mut self, stimuli: &[Stimulus]) -> Outcome<(usize, Duration)> {
        loop {
            match self.input.wait_event(None) {
                // Slots and stimuli are paired positionally.
                Some(InputEvent::Select { pos, time }) => match self.layout.hit_test(pos) {
                    Some(index) if index < stimuli.len() => {
                        return Outcome::Completed((index, time));
                    }
                    _ => debug!("click at ({:.1}, {:.1}) missed every stimulus", pos.x, pos.y),
                },
                Some(InputEvent::Continue) => continue,
                Some(InputEvent::Quit) | None => return Outcome::Quit,
            }
        }
    }

    fn score(
        &mut self,
        session: &mut SessionState,
        meta: &TrialMeta,
        policy: &TrialPolicy,
        stimuli: Vec<Stimulus>,
        index: usize,
        rt: Duration,
    ) -> Result<TrialState> {
        let selected = stimuli[index].coord;
        let score = self.landscape.score(selected)?;
        let pos = session.pos;
        let previous_total = session.total;
        session.apply(selected, score);
        debug!("selected {selected} score={score} total={}", session.total);

        let record = TrialRecord {
            subject: meta.subject.clone(),
            search_radius: self.search.radius,
            n_search_items: self.search.n_search_items,
            quarry: meta.quarry,
            starting_pos: meta.starting_pos,
            feedback: policy.feedback,
            trial: meta.trial,
            pos,
            stims: stimuli.iter().map(|s| s.coord).collect(),
            slots: stimuli.iter().map(|s| s.pos).collect(),
            selected,
            rt_ms: rt.as_secs_f64() * 1000.0,
            score,
            total: session.total,
        };
        Ok(TrialState::Scored {
            record,
            stimuli,
            previous_total,
        })
    }

    fn feedback(
        &mut self,
        record: &TrialRecord,
        stimuli: &[Stimulus],
        previous_total: i64,
        policy: &TrialPolicy,
    ) -> Result<Outcome<()>> {
        let entries = self.feedback_entries(record, stimuli, policy.feedback)?;
        let board = ScoreBoard {
            total: record.total,
            previous: Some(previous_total),
            delta: Some(record.score),
        };
        self.presenter.present(&Frame::Feedback {
            header: policy.feedback_header.clone(),
            stimuli: stimuli.to_vec(),
            entries,
            board,
            awaits_continue: policy.advance == Advance::OnContinue,
        });
        self.presenter.flip();

        let held = match policy.advance {
            Advance::OnContinue => wait_continue(&mut *self.input, true),
            Advance::After(duration) => wait_timed(&mut *self.input, self.clock, duration),
        };
        if held.is_quit() {
            return Ok(Outcome::Quit);
        }

        self.presenter.present(&Frame::Blank {
            board: ScoreBoard::total(record.total),
        });
        self.presenter.flip();
        Ok(wait_timed(&mut *self.input, self.clock, policy.iti))
    }

    fn feedback_entries(
        &mut self,
        record: &TrialRecord,
        stimuli: &[Stimulus],
        mode: FeedbackMode,
    ) -> Result<Vec<FeedbackEntry>> {
        let mut entries = Vec::with_capacity(stimuli.len());
        for stim in stimuli {
            let selected = stim.coord == record.selected;
            if mode == FeedbackMode::Selected && !selected {
                continue;
            }
            let score = self.landscape.score(stim.coord)?;
            entries.push(FeedbackEntry {
                coord: stim.coord,
                pos: stim.pos,
                score,
                selected,
                best: score > record.score,
            });
        }
        let beaten = entries.iter().any(|e| e.best);
        for entry in entries.iter_mut().filter(|e| e.selected) {
            entry.best = !beaten;
        }
        Ok(entries)
    }
}
