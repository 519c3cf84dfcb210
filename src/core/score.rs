//! Score functions: pure maps from grid coordinates to gem values.

use serde::{Deserialize, Serialize};

use crate::core::coord::Coord;
use crate::core::error::{GemsError, Result};

/// A pure function of position. Implementations must not carry hidden
/// mutable state; the landscape caches the first value it sees per cell.
pub trait ScoreFunction: Send + Sync {
    fn score(&self, coord: Coord) -> i64;

    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> ScoreFunction for F
where
    F: Fn(Coord) -> i64 + Send + Sync,
{
    fn score(&self, coord: Coord) -> i64 {
        self(coord)
    }
}

/// Optional rescaling of a raw height: `floor(raw / divisor * scale)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalization {
    pub divisor: i64,
    pub scale: i64,
}

impl Normalization {
    pub fn new(divisor: i64, scale: i64) -> Result<Self> {
        if divisor <= 0 {
            return Err(GemsError::Configuration(format!(
                "normalization divisor must be positive, got {divisor}"
            )));
        }
        Ok(Self { divisor, scale })
    }

    /// Saturates at the `i64` range instead of overflowing.
    pub fn apply(&self, raw: i64) -> i64 {
        let scaled = i128::from(raw) * i128::from(self.scale);
        saturate(scaled.div_euclid(i128::from(self.divisor)))
    }
}

fn saturate(v: i128) -> i64 {
    i64::try_from(v).unwrap_or(if v < 0 { i64::MIN } else { i64::MAX })
}

/// Paraboloid with its peak at `(peak_x, peak_y)`:
/// `raw = -(x² + y²) + 2·peak_x·x + 2·peak_y·y`.
///
/// With the default peak at (50, 50) the raw height at the peak is 5000 and
/// the default normalization (÷5000, ×100) maps it to 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimpleHill {
    pub peak_x: i64,
    pub peak_y: i64,
    pub normalization: Option<Normalization>,
}

impl SimpleHill {
    pub const DEFAULT_PEAK: (i64, i64) = (50, 50);
    pub const DEFAULT_DIVISOR: i64 = 5000;
    pub const DEFAULT_SCALE: i64 = 100;

    /// Raw heights, no normalization.
    pub fn raw_hill() -> Self {
        Self {
            peak_x: Self::DEFAULT_PEAK.0,
            peak_y: Self::DEFAULT_PEAK.1,
            normalization: None,
        }
    }

    pub fn normalized_hill() -> Self {
        Self {
            normalization: Some(Normalization {
                divisor: Self::DEFAULT_DIVISOR,
                scale: Self::DEFAULT_SCALE,
            }),
            ..Self::raw_hill()
        }
    }

    /// Computed in `i128` and saturated, so extreme peaks or coordinates
    /// clamp rather than overflow.
    pub fn raw(&self, coord: Coord) -> i64 {
        let x = i128::from(coord.x);
        let y = i128::from(coord.y);
        let (px, py) = (i128::from(self.peak_x), i128::from(self.peak_y));
        saturate(-(x * x) - (y * y) + 2 * px * x + 2 * py * y)
    }

    pub fn normalized(&self, coord: Coord) -> Option<i64> {
        self.normalization.map(|n| n.apply(self.raw(coord)))
    }
}

impl Default for SimpleHill {
    fn default() -> Self {
        Self::normalized_hill()
    }
}

impl ScoreFunction for SimpleHill {
    fn score(&self, coord: Coord) -> i64 {
        self.normalized(coord).unwrap_or_else(|| self.raw(coord))
    }

    fn name(&self) -> &str {
        "simple_hill"
    }
}

/// Every cell scores the same value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Flat(pub i64);

impl ScoreFunction for Flat {
    fn score(&self, _coord: Coord) -> i64 {
        self.0
    }

    fn name(&self) -> &str {
        "flat"
    }
}

/// Resolve a configured score function by name.
pub fn score_function_from_name(
    name: &str,
    peak: (i64, i64),
    normalization: Option<Normalization>,
) -> Result<Box<dyn ScoreFunction>> {
    match name {
        "simple_hill" => Ok(Box::new(SimpleHill {
            peak_x: peak.0,
            peak_y: peak.1,
            normalization,
        })),
        "flat" => Ok(Box::new(Flat(1))),
        other => Err(GemsError::Configuration(format!(
            "unknown score function {other:?} (expected \"simple_hill\" or \"flat\")"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_peak_is_5000() {
        assert_eq!(SimpleHill::raw_hill().score(Coord::new(50, 50)), 5000);
    }

    #[test]
    fn normalized_peak_is_100() {
        assert_eq!(SimpleHill::normalized_hill().score(Coord::new(50, 50)), 100);
        assert_eq!(SimpleHill::default().score(Coord::new(50, 50)), 100);
    }

    #[test]
    fn normalization_floors() {
        // raw at (0, 1) is 99 -> 99 * 100 / 5000 = 1.98
        let hill = SimpleHill::normalized_hill();
        assert_eq!(hill.raw(Coord::new(0, 1)), 99);
        assert_eq!(hill.score(Coord::new(0, 1)), 1);
        // raw at (0, 0) is 0
        assert_eq!(hill.score(Coord::new(0, 0)), 0);
    }

    #[test]
    fn hill_is_symmetric_about_peak() {
        let hill = SimpleHill::raw_hill();
        assert_eq!(hill.raw(Coord::new(40, 50)), hill.raw(Coord::new(60, 50)));
        assert_eq!(hill.raw(Coord::new(50, 10)), hill.raw(Coord::new(50, 90)));
        assert!(hill.raw(Coord::new(49, 50)) < hill.raw(Coord::new(50, 50)));
    }

    #[test]
    fn closures_score() {
        let f = |_: Coord| 1_i64;
        assert_eq!(f.score(Coord::new(3, 3)), 1);
    }

    #[test]
    fn unknown_name_is_configuration_error() {
        let err = score_function_from_name("saddle", (50, 50), None)
            .err()
            .expect("unknown name must fail");
        assert!(matches!(err, GemsError::Configuration(_)));
    }

    #[test]
    fn extreme_values_saturate() {
        let far = Coord::new(u32::MAX, u32::MAX);
        let steep = SimpleHill {
            peak_x: i64::MAX,
            peak_y: i64::MAX,
            normalization: None,
        };
        assert_eq!(steep.raw(far), i64::MAX);
        let pit = SimpleHill {
            peak_x: i64::MIN,
            peak_y: i64::MIN,
            normalization: None,
        };
        assert_eq!(pit.raw(far), i64::MIN);
        // -2·(2^32 - 1)^2 is below i64::MIN
        assert_eq!(SimpleHill::raw_hill().raw(far), i64::MIN);

        let n = Normalization::new(5000, 100).unwrap();
        assert_eq!(n.apply(i64::MAX), i64::MAX / 50);
        assert_eq!(Normalization::new(1, i64::MAX).unwrap().apply(i64::MAX), i64::MAX);
        assert_eq!(Normalization::new(1, i64::MAX).unwrap().apply(i64::MIN), i64::MIN);
    }

    #[test]
    fn zero_divisor_rejected() {
        assert!(Normalization::new(0, 100).is_err());
        assert!(Normalization::new(5000, 100).is_ok());
    }
}
