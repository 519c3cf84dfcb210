use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::coord::{Coord, join_coords};
use crate::core::layout::ScreenPos;

/// Column order of the per-session trial log.
pub const DATA_COLUMNS: [&str; 17] = [
    "subj_id",
    "date",
    "computer",
    "experimenter",
    "instructions",
    "search_radius",
    "n_search_items",
    "quarry",
    "starting_pos",
    "feedback",
    "trial",
    "pos",
    "stims",
    "selected",
    "rt",
    "score",
    "total",
];

/// Intake metadata. Opaque to the core; copied onto every row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub subj_id: String,
    pub date: String,
    pub computer: String,
    pub experimenter: String,
    /// Instructions condition label.
    pub instructions: String,
}

/// Which scores the participant sees after choosing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackMode {
    /// Every sampled gem is labelled.
    All,
    /// Only the chosen gem is labelled.
    Selected,
}

impl fmt::Display for FeedbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeedbackMode::All => "all",
            FeedbackMode::Selected => "selected",
        })
    }
}

/// Outcome of one completed trial.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialRecord {
    pub subject: SubjectInfo,
    pub search_radius: u32,
    pub n_search_items: usize,
    pub quarry: Option<u32>,
    pub starting_pos: Option<Coord>,
    pub feedback: FeedbackMode,
    pub trial: Option<usize>,
    /// Quarry position the sample was drawn around.
    pub pos: Coord,
    /// Sampled cells in presentation order.
    pub stims: Vec<Coord>,
    /// Screen slot of each entry in `stims`.
    pub slots: Vec<ScreenPos>,
    pub selected: Coord,
    pub rt_ms: f64,
    pub score: i64,
    pub total: i64,
}

impl TrialRecord {
    /// Field values in [`DATA_COLUMNS`] order; missing values are empty.
    pub fn to_row(&self) -> Vec<String> {
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(ToString::to_string).unwrap_or_default()
        }
        vec![
            self.subject.subj_id.clone(),
            self.subject.date.clone(),
            self.subject.computer.clone(),
            self.subject.experimenter.clone(),
            self.subject.instructions.clone(),
            self.search_radius.to_string(),
            self.n_search_items.to_string(),
            opt(&self.quarry),
            opt(&self.starting_pos),
            self.feedback.to_string(),
            opt(&self.trial),
            self.pos.to_string(),
            join_coords(&self.stims),
            self.selected.to_string(),
            format!("{:.3}", self.rt_ms),
            self.score.to_string(),
            self.total.to_string(),
        ]
    }

    pub fn slot_of(&self, coord: Coord) -> Option<ScreenPos> {
        self.stims
            .iter()
            .position(|c| *c == coord)
            .and_then(|i| self.slots.get(i).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TrialRecord {
        TrialRecord {
            subject: SubjectInfo {
                subj_id: "GEMS101".into(),
                date: "2016-03-01".into(),
                computer: "lab-2".into(),
                experimenter: "pierce".into(),
                instructions: "orientation".into(),
            },
            search_radius: 8,
            n_search_items: 2,
            quarry: None,
            starting_pos: Some(Coord::new(10, 10)),
            feedback: FeedbackMode::Selected,
            trial: Some(3),
            pos: Coord::new(10, 10),
            stims: vec![Coord::new(9, 12), Coord::new(14, 3)],
            slots: vec![ScreenPos::new(-1.0, 0.0), ScreenPos::new(1.0, 0.0)],
            selected: Coord::new(14, 3),
            rt_ms: 812.5,
            score: 21,
            total: 84,
        }
    }

    #[test]
    fn row_matches_columns() {
        let row = record().to_row();
        assert_eq!(row.len(), DATA_COLUMNS.len());
        assert_eq!(row[7], "");
        assert_eq!(row[8], "10-10");
        assert_eq!(row[9], "selected");
        assert_eq!(row[12], "9-12;14-3");
        assert_eq!(row[13], "14-3");
        assert_eq!(row[14], "812.500");
    }

    #[test]
    fn slot_lookup() {
        let rec = record();
        assert_eq!(rec.slot_of(Coord::new(14, 3)), Some(ScreenPos::new(1.0, 0.0)));
        assert_eq!(rec.slot_of(Coord::new(0, 0)), None);
    }
}
