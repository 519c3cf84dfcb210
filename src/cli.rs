use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::experiment::headless::Strategy;
use crate::experiment::record::SubjectInfo;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Path to config TOML
    #[arg(long, default_value = "gems.toml")]
    pub config: String,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a full session with a simulated participant
    Run(RunArgs),
    /// Write every landscape cell as CSV (x,y,ori,sf,score)
    Export {
        /// Output path; stdout when omitted
        #[arg(value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Re-sample the stimuli of a logged session and compare
    Replay {
        /// Trial log written by `run`
        #[arg(value_name = "LOG")]
        log: PathBuf,

        /// Sampling seed of the logged session
        #[arg(long)]
        seed: u64,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// How the simulated participant chooses
    #[arg(long, value_enum, default_value_t = StrategyArg::Greedy)]
    pub strategy: StrategyArg,

    /// Seed for the participant's own choices and reaction times
    #[arg(long, default_value_t = 0)]
    pub participant_seed: u64,

    #[arg(long, default_value = "GEMS000")]
    pub subj_id: String,

    #[arg(long, default_value = "")]
    pub date: String,

    #[arg(long, default_value = "")]
    pub computer: String,

    #[arg(long, default_value = "")]
    pub experimenter: String,

    /// Instructions condition label
    #[arg(long, default_value = "")]
    pub instructions: String,

    /// Skip feedback, ITI and break holds
    #[arg(long, default_value_t = false)]
    pub no_wait: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    Random,
    Greedy,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Random => Strategy::Random,
            StrategyArg::Greedy => Strategy::Greedy,
        }
    }
}

impl RunArgs {
    pub fn subject(&self) -> SubjectInfo {
        SubjectInfo {
            subj_id: self.subj_id.clone(),
            date: self.date.clone(),
            computer: self.computer.clone(),
            experimenter: self.experimenter.clone(),
            instructions: self.instructions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let args = Args::try_parse_from([
            "gems",
            "--config",
            "lab.toml",
            "run",
            "--strategy",
            "random",
            "--subj-id",
            "GEMS104",
            "--instructions",
            "orientation",
            "--no-wait",
        ])
        .unwrap();
        assert_eq!(args.config, "lab.toml");
        let Command::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.strategy, StrategyArg::Random);
        assert!(run.no_wait);
        let subject = run.subject();
        assert_eq!(subject.subj_id, "GEMS104");
        assert_eq!(subject.instructions, "orientation");
    }

    #[test]
    fn replay_requires_seed() {
        assert!(Args::try_parse_from(["gems", "replay", "data/S1.csv"]).is_err());
        let args = Args::try_parse_from(["gems", "replay", "data/S1.csv", "--seed", "42"]).unwrap();
        assert!(matches!(args.command, Command::Replay { seed: 42, .. }));
    }
}
