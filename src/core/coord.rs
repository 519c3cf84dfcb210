use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::error::GemsError;

/// Grid cell address. `x` indexes columns (orientation axis), `y` indexes
/// rows (spatial-frequency axis).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: u32,
    pub y: u32,
}

impl Coord {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<(u32, u32)> for Coord {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

/// Trial logs encode coordinates as `x-y`.
impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.x, self.y)
    }
}

/// Accepts `x-y` and the legacy intake form `x,y`.
impl FromStr for Coord {
    type Err = GemsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (xs, ys) = s
            .split_once('-')
            .or_else(|| s.split_once(','))
            .ok_or_else(|| GemsError::Parse(format!("expected 'x-y', got {s:?}")))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|e| GemsError::Parse(format!("bad coordinate {s:?}: {e}")))
        };
        Ok(Self {
            x: parse(xs)?,
            y: parse(ys)?,
        })
    }
}

impl Serialize for Coord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// `;`-joined list of `x-y` cells.
pub fn join_coords(coords: &[Coord]) -> String {
    coords
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

pub fn parse_coord_list(s: &str) -> Result<Vec<Coord>, GemsError> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(';').map(str::parse).collect()
}
