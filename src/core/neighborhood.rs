//! Square (Chebyshev) neighborhoods on the landscape grid and seeded draws
//! from them.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::core::coord::Coord;
use crate::core::error::{GemsError, Result};
use crate::core::landscape::Landscape;

/// What `draw` does when the neighborhood is smaller than the requested
/// count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplePolicy {
    /// Fail with [`GemsError::Sampling`].
    #[default]
    Strict,
    /// Return the whole (shuffled) neighborhood.
    Available,
}

/// All in-bounds cells within Chebyshev distance `radius` of `center`,
/// including `center`. Enumeration is canonical: x ascending outer, y
/// ascending inner.
pub fn neighborhood(landscape: &Landscape, center: Coord, radius: u32) -> Result<Vec<Coord>> {
    landscape.check(center)?;
    let (x_lo, x_hi) = clip(center.x, radius, landscape.n_cols());
    let (y_lo, y_hi) = clip(center.y, radius, landscape.n_rows());
    let mut out = Vec::with_capacity(cell_count((x_lo, x_hi), (y_lo, y_hi)));
    for x in x_lo..=x_hi {
        for y in y_lo..=y_hi {
            out.push(Coord::new(x, y));
        }
    }
    Ok(out)
}

/// Inclusive `[c - r, c + r]` clipped to `[0, len)`. `len` is non-zero.
fn clip(c: u32, r: u32, len: u32) -> (u32, u32) {
    (c.saturating_sub(r), c.saturating_add(r).min(len - 1))
}

/// Cells in the inclusive rectangle, counted in `usize`.
fn cell_count((x_lo, x_hi): (u32, u32), (y_lo, y_hi): (u32, u32)) -> usize {
    let span = |lo: u32, hi: u32| ((hi - lo) as usize).saturating_add(1);
    span(x_lo, x_hi).saturating_mul(span(y_lo, y_hi))
}

/// Shuffle `candidates` with `rng` and keep the first `count`.
pub fn draw<R: Rng + ?Sized>(
    mut candidates: Vec<Coord>,
    count: usize,
    policy: SamplePolicy,
    rng: &mut R,
) -> Result<Vec<Coord>> {
    if count > candidates.len() && policy == SamplePolicy::Strict {
        return Err(GemsError::Sampling {
            requested: count,
            available: candidates.len(),
        });
    }
    candidates.shuffle(rng);
    candidates.truncate(count);
    Ok(candidates)
}

/// Neighborhood of `center` drawn with a caller-supplied generator. Same seed
/// and same neighborhood give the same ordered sample.
pub fn sample<R: Rng + ?Sized>(
    landscape: &Landscape,
    center: Coord,
    radius: u32,
    count: usize,
    policy: SamplePolicy,
    rng: &mut R,
) -> Result<Vec<Coord>> {
    draw(neighborhood(landscape, center, radius)?, count, policy, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::landscape::LandscapeParams;
    use crate::core::score::Flat;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn grid(n: u32) -> Landscape {
        Landscape::new(LandscapeParams::with_dims(n, n), Box::new(Flat(1)), Some(0)).unwrap()
    }

    #[test]
    fn canonical_order() {
        let land = grid(3);
        let hood = neighborhood(&land, Coord::new(1, 1), 1).unwrap();
        assert_eq!(hood.first(), Some(&Coord::new(0, 0)));
        assert_eq!(hood[1], Coord::new(0, 1));
        assert_eq!(hood[3], Coord::new(1, 0));
        assert_eq!(hood.last(), Some(&Coord::new(2, 2)));
    }

    #[test]
    fn radius_zero_is_center() {
        let land = grid(5);
        assert_eq!(
            neighborhood(&land, Coord::new(2, 3), 0).unwrap(),
            vec![Coord::new(2, 3)]
        );
    }

    #[test]
    fn one_by_one_has_no_neighbors() {
        let land = grid(1);
        assert_eq!(
            neighborhood(&land, Coord::new(0, 0), 5).unwrap(),
            vec![Coord::new(0, 0)]
        );
    }

    #[test]
    fn off_grid_center_rejected() {
        let land = grid(3);
        assert!(matches!(
            neighborhood(&land, Coord::new(3, 0), 1),
            Err(GemsError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn huge_radius_does_not_overflow() {
        let land = grid(4);
        assert_eq!(neighborhood(&land, Coord::new(2, 2), u32::MAX).unwrap().len(), 16);
    }

    #[test]
    fn cell_count_exceeds_u32() {
        assert_eq!(cell_count((0, 2), (0, 2)), 9);
        assert_eq!(cell_count((5, 5), (7, 7)), 1);
        assert_eq!(cell_count((0, 65_536), (0, 65_536)), 65_537 * 65_537);
    }

    #[test]
    fn strict_policy_fails_when_short() {
        let land = grid(3);
        let mut rng = StdRng::seed_from_u64(3);
        let err = sample(&land, Coord::new(0, 0), 1, 9, SamplePolicy::Strict, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            GemsError::Sampling {
                requested: 9,
                available: 4
            }
        ));
    }

    #[test]
    fn available_policy_returns_all() {
        let land = grid(3);
        let mut rng = StdRng::seed_from_u64(3);
        let got = sample(&land, Coord::new(0, 0), 1, 9, SamplePolicy::Available, &mut rng)
            .unwrap();
        assert_eq!(got.len(), 4);
    }
}
