//! Error taxonomy shared by the landscape core and the experiment layer.

use thiserror::Error;

use crate::core::coord::Coord;

/// Errors returned by landscape, sampling and session primitives.
///
/// A participant quitting is not an error; see [`Outcome`].
#[derive(Debug, Error)]
pub enum GemsError {
    /// Invalid grid dimensions, mismatched sample/layout counts, unknown
    /// score function name and similar setup mistakes.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A coordinate outside the grid was requested.
    #[error("coordinate {coord} is outside the {n_cols}x{n_rows} grid")]
    OutOfBounds {
        coord: Coord,
        n_cols: u32,
        n_rows: u32,
    },
    /// The neighborhood holds fewer candidates than the sample requires.
    #[error("cannot sample {requested} gems from a neighborhood of {available}")]
    Sampling { requested: usize, available: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed coordinate text or trial log row.
    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, GemsError>;

/// Result of a participant-paced step: either it ran to completion or the
/// participant asked to quit while it was suspended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Completed(T),
    Quit,
}

impl<T> Outcome<T> {
    pub fn is_quit(&self) -> bool {
        matches!(self, Outcome::Quit)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(v) => Some(v),
            Outcome::Quit => None,
        }
    }
}
