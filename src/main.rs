// Entry point: loads config and dispatches the run/export/replay commands.
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use gems::cli::{Args, Command, RunArgs};
use gems::config::AppConfig;
use gems::experiment::channel::{WallClock, input_channel};
use gems::experiment::headless::{HeadlessPresenter, SimulatedParticipant};
use gems::experiment::io::InputEvent;
use gems::experiment::replay::{read_log, replay};
use gems::experiment::session::SessionController;
use gems::experiment::sink::{CsvTrialLog, output_path};
use gems::experiment::trial::Advance;
use gems::logging;

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    if let Err(err) = logging::init_tracing(&args.log) {
        eprintln!("logging disabled: {err}");
    }
    let config = AppConfig::load_or_default(&args.config);

    match &args.command {
        Command::Run(run_args) => run(&config, run_args),
        Command::Export { output } => export(&config, output.as_deref()),
        Command::Replay { log, seed } => replay_log(&config, log, *seed),
    }
}

fn run(config: &AppConfig, run_args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let mut session = config.session_config(run_args.subject())?;
    if run_args.no_wait {
        session.iti = Duration::ZERO;
        session.break_minimum = Duration::ZERO;
        session.test.advance = Advance::After(Duration::ZERO);
    }
    let landscape = config.build_landscape()?;
    let log_path = output_path(&config.data_dir(), &session.subject.subj_id);
    let sink = CsvTrialLog::create(&log_path)?;

    let (tx, input) = input_channel();
    let clock = WallClock::start();
    let (presenter, frames) = HeadlessPresenter::new();
    let participant = SimulatedParticipant::new(
        run_args.strategy.into(),
        config.score_function()?,
        run_args.participant_seed,
        clock,
    )
    .spawn(frames, tx.clone());

    let quit_tx = tx;
    ctrlc::set_handler(move || {
        if quit_tx.send(InputEvent::Quit).is_err() {
            warn!("session already finished");
        }
    })?;

    let mut controller =
        match SessionController::new(session, landscape, presenter, input, clock, sink) {
            Ok(controller) => controller,
            Err(err) => {
                // Nothing was logged; leave no file that would block a rerun.
                if let Err(rm) = fs::remove_file(&log_path) {
                    warn!("could not remove {}: {rm}", log_path.display());
                }
                return Err(err.into());
            }
        };
    let summary = controller.run()?;
    // Dropping the presenter closes the frame channel and ends the participant.
    drop(controller);
    match participant.join() {
        Ok(stats) => info!(
            "participant: {} frames, {} selections",
            stats.frames_seen, stats.selections
        ),
        Err(_) => warn!("participant thread panicked"),
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn export(config: &AppConfig, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let mut landscape = config.build_landscape()?;
    match output {
        Some(path) => {
            landscape.write_csv(BufWriter::new(File::create(path)?))?;
            info!("landscape written to {}", path.display());
        }
        None => landscape.write_csv(io::stdout().lock())?,
    }
    Ok(())
}

fn replay_log(config: &AppConfig, log: &Path, seed: u64) -> Result<(), Box<dyn Error>> {
    let trials = read_log(BufReader::new(File::open(log)?))?;
    let mut cfg = config.clone();
    cfg.landscape.seed = Some(seed);
    let mut landscape = cfg.build_landscape()?;
    let report = replay(&mut landscape, &trials, cfg.search.sample_policy)?;
    if report.is_exact() {
        info!("{} trials reproduced exactly", report.trials);
    } else {
        warn!(
            "{} of {} trials differ from the log",
            report.mismatches.len(),
            report.trials
        );
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
