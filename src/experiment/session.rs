//! Session sequencing: instruction screens, the training and test phases and
//! optional breaks, with the quarry position and score carried across trials.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::coord::Coord;
use crate::core::error::{GemsError, Outcome, Result};
use crate::core::landscape::Landscape;
use crate::core::layout::{ScreenPos, StimulusLayout};
use crate::experiment::io::{
    Clock, Frame, InputSource, Presenter, Screen, ScreenKind, Stimulus, wait_click_on,
    wait_continue, wait_timed,
};
use crate::experiment::record::{FeedbackMode, SubjectInfo};
use crate::experiment::sink::TrialSink;
use crate::experiment::trial::{
    Advance, SearchParams, SessionState, TrialEngine, TrialMeta, TrialOutcome, TrialPolicy,
};

const EXAMPLE_SPACING: f32 = 200.0;
const EXAMPLE_ROW_Y: f32 = -200.0;

/// Participant-facing strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Texts {
    pub welcome: String,
    pub instructions: String,
    pub training_title: String,
    pub training: String,
    pub test_title: String,
    pub test: String,
    pub break_title: String,
    #[serde(rename = "break")]
    pub break_body: String,
    pub break_complete: String,
    pub end_title: String,
    pub end: String,
    pub trial_instructions: String,
    pub trial_feedback: String,
    /// Extra training paragraph keyed by instructions condition.
    pub training_instructions: BTreeMap<String, String>,
}

impl Default for Texts {
    fn default() -> Self {
        Self {
            welcome: "Welcome to the gem search!".into(),
            instructions: "You are an explorer looking for valuable gems. Each gem is drawn \
                as a striped circle. Gems that look alike are found near each other.\n\n\
                Press SPACEBAR to continue."
                .into(),
            training_title: "Training".into(),
            training: "Click on a gem to collect it. After each choice you will see what \
                every gem on offer was worth.\n\nClick the gem on the right to begin."
                .into(),
            test_title: "Test".into(),
            test: "Now only the gem you pick will reveal its value. Collect as many points \
                as you can.\n\nPress SPACEBAR to begin."
                .into(),
            break_title: "Break".into(),
            break_body: "Take a short rest.".into(),
            break_complete: "Press SPACEBAR when you are ready to continue.".into(),
            end_title: "Thank you!".into(),
            end: "You have completed the experiment. Please let the experimenter know.".into(),
            trial_instructions: "Pick a gem".into(),
            trial_feedback: "Gem values".into(),
            training_instructions: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub grid_rows: u32,
    pub grid_cols: u32,
    pub viewport: (f32, f32),
    pub margin: f32,
    pub stim_size: f32,
}

impl LayoutParams {
    /// Build the search layout and check that it holds exactly
    /// `n_search_items` slots.
    pub fn build(&self, n_search_items: usize) -> Result<StimulusLayout> {
        let layout = StimulusLayout::new(
            self.grid_rows,
            self.grid_cols,
            self.viewport,
            self.margin,
            self.stim_size,
        )?;
        if layout.len() != n_search_items {
            return Err(GemsError::Configuration(format!(
                "{n_search_items} search items do not fit a {}x{} stimulus grid",
                self.grid_rows, self.grid_cols
            )));
        }
        Ok(layout)
    }
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            grid_rows: 3,
            grid_cols: 3,
            viewport: (1080.0, 1080.0),
            margin: 240.0,
            stim_size: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseConfig {
    pub n_trials: usize,
    pub start_pos: Coord,
    pub quarry: Option<u32>,
    pub feedback: FeedbackMode,
    pub advance: Advance,
}

impl PhaseConfig {
    pub fn training(n_trials: usize, start_pos: Coord) -> Self {
        Self {
            n_trials,
            start_pos,
            quarry: Some(0),
            feedback: FeedbackMode::All,
            advance: Advance::OnContinue,
        }
    }

    pub fn test(n_trials: usize, start_pos: Coord, feedback_duration: Duration) -> Self {
        Self {
            n_trials,
            start_pos,
            quarry: None,
            feedback: FeedbackMode::Selected,
            advance: Advance::After(feedback_duration),
        }
    }
}

/// Immutable settings for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub subject: SubjectInfo,
    pub search: SearchParams,
    pub layout: LayoutParams,
    pub training: PhaseConfig,
    pub test: PhaseConfig,
    pub iti: Duration,
    pub break_every: Option<usize>,
    pub break_minimum: Duration,
    /// Gems shown on the welcome and training screens. The training screen
    /// advances once the last one is clicked.
    pub example_gems: Vec<Coord>,
    pub texts: Texts,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let start = Coord::new(10, 10);
        Self {
            subject: SubjectInfo::default(),
            search: SearchParams::default(),
            layout: LayoutParams::default(),
            training: PhaseConfig::training(10, start),
            test: PhaseConfig::test(10, start, Duration::from_millis(1500)),
            iti: Duration::from_secs(1),
            break_every: None,
            break_minimum: Duration::from_secs(5),
            example_gems: vec![Coord::new(10, 10), Coord::new(20, 20)],
            texts: Texts::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub subj_id: String,
    pub seed: u64,
    pub trials_completed: usize,
    pub total: i64,
    pub final_pos: Coord,
    pub quit: bool,
}

pub struct SessionController<P, I, C, S> {
    config: SessionConfig,
    landscape: Landscape,
    layout: StimulusLayout,
    presenter: P,
    input: I,
    clock: C,
    sink: S,
    state: SessionState,
}

impl<P, I, C, S> SessionController<P, I, C, S>
where
    P: Presenter,
    I: InputSource,
    C: Clock,
    S: TrialSink,
{
    pub fn new(
        config: SessionConfig,
        landscape: Landscape,
        presenter: P,
        input: I,
        clock: C,
        sink: S,
    ) -> Result<Self> {
        let layout = config.layout.build(config.search.n_search_items)?;
        landscape.check(config.training.start_pos)?;
        landscape.check(config.test.start_pos)?;
        for coord in &config.example_gems {
            landscape.check(*coord)?;
        }
        let state = SessionState::new(config.training.start_pos);
        Ok(Self {
            config,
            landscape,
            layout,
            presenter,
            input,
            clock,
            sink,
            state,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn landscape(&self) -> &Landscape {
        &self.landscape
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn into_parts(self) -> (P, I, C, S) {
        (self.presenter, self.input, self.clock, self.sink)
    }

    /// Run every phase. The sink is closed on every exit path; a quit ends
    /// the session early without an error.
    pub fn run(&mut self) -> Result<SessionSummary> {
        info!(
            "session start: subj_id={} seed={}",
            self.config.subject.subj_id,
            self.landscape.seed()
        );
        let outcome = self.run_phases();
        let closed = self.sink.close();
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(close_err) = closed {
                    warn!("closing trial log after failure: {close_err}");
                }
                return Err(err);
            }
        };
        closed?;

        let quit = outcome.is_quit();
        if quit {
            info!("session quit after {} trials", self.state.trials_completed);
        } else {
            info!("session complete: total={}", self.state.total);
        }
        Ok(self.summary(quit))
    }

    fn summary(&self, quit: bool) -> SessionSummary {
        SessionSummary {
            subj_id: self.config.subject.subj_id.clone(),
            seed: self.landscape.seed(),
            trials_completed: self.state.trials_completed,
            total: self.state.total,
            final_pos: self.state.pos,
            quit,
        }
    }

    fn run_phases(&mut self) -> Result<Outcome<()>> {
        let texts = self.config.texts.clone();

        let welcome =
            self.example_screen(ScreenKind::Welcome, &texts.welcome, &texts.instructions, false)?;
        if self.show(welcome).is_quit() {
            return Ok(Outcome::Quit);
        }

        let mut training_body = texts.training.clone();
        if let Some(extra) = texts.training_instructions.get(&self.config.subject.instructions) {
            training_body.push_str("\n\n");
            training_body.push_str(extra);
        }
        let training_screen =
            self.example_screen(ScreenKind::Training, &texts.training_title, &training_body, true)?;
        if self.show(training_screen).is_quit() {
            return Ok(Outcome::Quit);
        }
        let training = self.config.training;
        info!("training phase: {} trials", training.n_trials);
        if self.run_phase(&training, Some(texts.trial_feedback.as_str()))?.is_quit() {
            return Ok(Outcome::Quit);
        }

        if self.show_screen(ScreenKind::Test, &texts.test_title, &texts.test).is_quit() {
            return Ok(Outcome::Quit);
        }
        let test = self.config.test;
        info!("test phase: {} trials", test.n_trials);
        if self.run_phase(&test, None)?.is_quit() {
            return Ok(Outcome::Quit);
        }

        Ok(self.show_screen(ScreenKind::End, &texts.end_title, &texts.end))
    }

    fn run_phase(&mut self, phase: &PhaseConfig, feedback_header: Option<&str>) -> Result<Outcome<()>> {
        self.state.pos = phase.start_pos;
        let policy = TrialPolicy {
            feedback: phase.feedback,
            advance: phase.advance,
            iti: self.config.iti,
            header: self.config.texts.trial_instructions.clone(),
            feedback_header: feedback_header.map(str::to_string),
        };
        let is_test = phase.feedback == FeedbackMode::Selected;

        for trial in 0..phase.n_trials {
            let meta = TrialMeta {
                subject: self.config.subject.clone(),
                quarry: phase.quarry,
                starting_pos: Some(phase.start_pos),
                trial: Some(trial),
            };
            let mut engine = TrialEngine {
                landscape: &mut self.landscape,
                layout: &self.layout,
                presenter: &mut self.presenter,
                input: &mut self.input,
                clock: &self.clock,
                search: self.config.search,
            };
            match engine.run(&mut self.state, &policy, &meta)? {
                TrialOutcome::Completed(record) => self.sink.write_record(&record)?,
                TrialOutcome::QuitAfterScoring(record) => {
                    self.sink.write_record(&record)?;
                    return Ok(Outcome::Quit);
                }
                TrialOutcome::Quit => return Ok(Outcome::Quit),
            }

            let done = trial + 1;
            let due = self.config.break_every.is_some_and(|n| n > 0 && done % n == 0);
            if is_test && due && done < phase.n_trials && self.show_break().is_quit() {
                return Ok(Outcome::Quit);
            }
        }
        Ok(Outcome::Completed(()))
    }

    fn show_screen(&mut self, kind: ScreenKind, title: &str, body: &str) -> Outcome<()> {
        self.show(Screen::text(kind, title, body))
    }

    fn show(&mut self, screen: Screen) -> Outcome<()> {
        let target = screen
            .click_target
            .and_then(|i| screen.stimuli.get(i))
            .map(|stim| (stim.pos, stim.size / 2.0));
        self.presenter.present(&Frame::Screen(screen));
        self.presenter.flip();
        match target {
            Some((pos, radius)) => wait_click_on(&mut self.input, pos, radius),
            None => wait_continue(&mut self.input, false),
        }
    }

    /// Instruction screen with the example gems in a row below the text.
    fn example_screen(
        &self,
        kind: ScreenKind,
        title: &str,
        body: &str,
        click_last: bool,
    ) -> Result<Screen> {
        let n = self.config.example_gems.len();
        let mut stimuli = Vec::with_capacity(n);
        for (i, coord) in self.config.example_gems.iter().enumerate() {
            let gabor = self.landscape.gabor(*coord)?;
            let x = EXAMPLE_SPACING * i as f32 - EXAMPLE_SPACING / 2.0 * (n - 1) as f32;
            stimuli.push(Stimulus {
                coord: *coord,
                pos: ScreenPos::new(x, EXAMPLE_ROW_Y),
                ori: gabor.ori,
                sf: gabor.sf,
                size: self.layout.stim_size(),
            });
        }
        let click_target = if click_last { n.checked_sub(1) } else { None };
        Ok(Screen {
            click_target,
            stimuli,
            ..Screen::text(kind, title, body)
        })
    }

    /// Hold the break screen for the minimum duration, then wait for continue.
    fn show_break(&mut self) -> Outcome<()> {
        let texts = &self.config.texts;
        self.presenter.present(&Frame::Screen(Screen::text(
            ScreenKind::Break,
            &texts.break_title,
            &texts.break_body,
        )));
        self.presenter.flip();
        if wait_timed(&mut self.input, &self.clock, self.config.break_minimum).is_quit() {
            return Outcome::Quit;
        }
        let title = texts.break_title.clone();
        let body = format!("{}\n\n{}", texts.break_body, texts.break_complete);
        self.show_screen(ScreenKind::BreakComplete, &title, &body)
    }
}
