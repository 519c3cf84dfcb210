//! Regenerate the stimuli of a logged session from its sampling seed.
//!
//! Samples are drawn from one generator in trial order, so replaying every
//! logged row in file order against a landscape built with the same seed
//! must reproduce each row's `stims` exactly.

use std::io::BufRead;

use serde::Serialize;
use tracing::warn;

use crate::core::coord::{Coord, parse_coord_list};
use crate::core::error::{GemsError, Result};
use crate::core::landscape::Landscape;
use crate::core::neighborhood::SamplePolicy;
use crate::experiment::record::DATA_COLUMNS;
use crate::experiment::sink::split_line;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedTrial {
    /// 1-based data row (header excluded).
    pub row: usize,
    pub radius: u32,
    pub n_search_items: usize,
    pub pos: Coord,
    pub stims: Vec<Coord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayMismatch {
    pub row: usize,
    pub pos: Coord,
    pub logged: Vec<Coord>,
    pub regenerated: Vec<Coord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub trials: usize,
    pub mismatches: Vec<ReplayMismatch>,
}

impl ReplayReport {
    pub fn is_exact(&self) -> bool {
        self.mismatches.is_empty()
    }
}

fn column(name: &str) -> Result<usize> {
    DATA_COLUMNS
        .iter()
        .position(|c| *c == name)
        .ok_or_else(|| GemsError::Parse(format!("no {name} column")))
}

pub fn read_log<R: BufRead>(reader: R) -> Result<Vec<LoggedTrial>> {
    let mut lines = reader.lines();
    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| GemsError::Parse("empty trial log".into()))?;
    if split_line(header.trim_end()) != DATA_COLUMNS {
        return Err(GemsError::Parse(format!("unexpected trial log header: {header}")));
    }

    let (radius_ix, n_ix) = (column("search_radius")?, column("n_search_items")?);
    let (pos_ix, stims_ix) = (column("pos")?, column("stims")?);

    let mut trials = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = i + 1;
        let fields = split_line(line.trim_end());
        if fields.len() != DATA_COLUMNS.len() {
            return Err(GemsError::Parse(format!(
                "row {row}: expected {} fields, got {}",
                DATA_COLUMNS.len(),
                fields.len()
            )));
        }
        let bad = |what: &str| GemsError::Parse(format!("row {row}: bad {what}"));
        trials.push(LoggedTrial {
            row,
            radius: fields[radius_ix].parse().map_err(|_| bad("search_radius"))?,
            n_search_items: fields[n_ix].parse().map_err(|_| bad("n_search_items"))?,
            pos: fields[pos_ix].parse()?,
            stims: parse_coord_list(&fields[stims_ix])?,
        });
    }
    Ok(trials)
}

/// Re-sample every trial in order and compare with the log.
pub fn replay(
    landscape: &mut Landscape,
    trials: &[LoggedTrial],
    policy: SamplePolicy,
) -> Result<ReplayReport> {
    let mut report = ReplayReport::default();
    for trial in trials {
        let regenerated =
            landscape.sample_neighborhood(trial.pos, trial.radius, trial.n_search_items, policy)?;
        report.trials += 1;
        if regenerated != trial.stims {
            warn!("row {}: stimuli differ from the log", trial.row);
            report.mismatches.push(ReplayMismatch {
                row: trial.row,
                pos: trial.pos,
                logged: trial.stims.clone(),
                regenerated,
            });
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_foreign_header() {
        let err = read_log("x,y,ori,sf,score\n".as_bytes()).unwrap_err();
        assert!(matches!(err, GemsError::Parse(_)));
    }

    #[test]
    fn reads_rows() {
        let text = format!(
            "{}\nS1,,,,,8,2,0,10-10,all,0,10-10,9-9;11-12,11-12,500.000,3,3\n",
            DATA_COLUMNS.join(",")
        );
        let trials = read_log(text.as_bytes()).unwrap();
        assert_eq!(trials.len(), 1);
        assert_eq!(trials[0].radius, 8);
        assert_eq!(trials[0].n_search_items, 2);
        assert_eq!(trials[0].pos, Coord::new(10, 10));
        assert_eq!(trials[0].stims, vec![Coord::new(9, 9), Coord::new(11, 12)]);
    }
}
