//! core/landscape.rs — The scored grid of gems.
//!
//! Gems are materialized lazily on first lookup and cached for the lifetime of
//! the landscape. Visual features are derived from the coordinate alone; the
//! score comes from the configured [`ScoreFunction`]. The landscape also owns
//! the seeded generator used for neighborhood sampling, so a session's
//! stimulus sequence is reproducible from its seed.

use std::collections::HashMap;
use std::io::Write;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::debug;

use crate::core::coord::Coord;
use crate::core::error::{GemsError, Result};
use crate::core::neighborhood::{self, SamplePolicy};
use crate::core::score::ScoreFunction;

pub const EXPORT_HEADER: &str = "x,y,ori,sf,score";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandscapeParams {
    pub n_rows: u32,
    pub n_cols: u32,
    /// Orientation at x = 0. The range is half-open: `max_ori` itself is
    /// never reached.
    pub min_ori: f32,
    pub max_ori: f32,
    /// Spatial frequency at y = 0 and y = n_rows - 1 respectively.
    pub min_sf: f32,
    pub max_sf: f32,
}

impl LandscapeParams {
    pub fn with_dims(n_rows: u32, n_cols: u32) -> Self {
        Self {
            n_rows,
            n_cols,
            ..Self::default()
        }
    }
}

impl Default for LandscapeParams {
    fn default() -> Self {
        Self {
            n_rows: 100,
            n_cols: 100,
            min_ori: 180.0,
            max_ori: 0.0,
            min_sf: 0.05,
            max_sf: 0.2,
        }
    }
}

/// Grating features of a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gabor {
    pub ori: f32,
    pub sf: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Gem {
    pub x: u32,
    pub y: u32,
    pub ori: f32,
    pub sf: f32,
    pub score: i64,
}

impl Gem {
    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }

    pub fn gabor(&self) -> Gabor {
        Gabor {
            ori: self.ori,
            sf: self.sf,
        }
    }

    fn csv_row(&self) -> String {
        format!("{},{},{},{},{}", self.x, self.y, self.ori, self.sf, self.score)
    }
}

pub struct Landscape {
    params: LandscapeParams,
    score_func: Box<dyn ScoreFunction>,
    gems: HashMap<Coord, Gem>,
    seed: u64,
    rng: StdRng,
}

impl std::fmt::Debug for Landscape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Landscape")
            .field("params", &self.params)
            .field("score_func", &self.score_func.name())
            .field("cached", &self.gems.len())
            .field("seed", &self.seed)
            .finish()
    }
}

impl Landscape {
    /// Fails fast on zero dimensions or non-finite feature ranges. Without a
    /// seed one is drawn from the OS and can be read back with [`seed`](Self::seed).
    pub fn new(
        params: LandscapeParams,
        score_func: Box<dyn ScoreFunction>,
        seed: Option<u64>,
    ) -> Result<Self> {
        if params.n_rows == 0 || params.n_cols == 0 {
            return Err(GemsError::Configuration(format!(
                "grid dimensions must be positive, got {} rows x {} cols",
                params.n_rows, params.n_cols
            )));
        }
        let ranges = [params.min_ori, params.max_ori, params.min_sf, params.max_sf];
        if ranges.iter().any(|v| !v.is_finite()) {
            return Err(GemsError::Configuration(
                "feature ranges must be finite".to_string(),
            ));
        }
        let seed = seed.unwrap_or_else(rand::random);
        debug!(
            "landscape {}x{} score={} seed={seed}",
            params.n_cols,
            params.n_rows,
            score_func.name()
        );
        Ok(Self {
            params,
            score_func,
            gems: HashMap::new(),
            seed,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn params(&self) -> &LandscapeParams {
        &self.params
    }

    pub fn n_rows(&self) -> u32 {
        self.params.n_rows
    }

    pub fn n_cols(&self) -> u32 {
        self.params.n_cols
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn score_func_name(&self) -> &str {
        self.score_func.name()
    }

    pub fn contains(&self, coord: Coord) -> bool {
        coord.x < self.params.n_cols && coord.y < self.params.n_rows
    }

    pub fn check(&self, coord: Coord) -> Result<()> {
        if self.contains(coord) {
            Ok(())
        } else {
            Err(GemsError::OutOfBounds {
                coord,
                n_cols: self.params.n_cols,
                n_rows: self.params.n_rows,
            })
        }
    }

    /// Number of cells materialized so far.
    pub fn cached_len(&self) -> usize {
        self.gems.len()
    }

    pub fn get(&mut self, coord: Coord) -> Result<Gem> {
        self.check(coord)?;
        if let Some(gem) = self.gems.get(&coord) {
            return Ok(*gem);
        }
        let gem = self.create(coord);
        self.gems.insert(coord, gem);
        Ok(gem)
    }

    pub fn score(&mut self, coord: Coord) -> Result<i64> {
        Ok(self.get(coord)?.score)
    }

    pub fn gabor(&self, coord: Coord) -> Result<Gabor> {
        self.check(coord)?;
        Ok(Gabor {
            ori: self.orientation(coord.x),
            sf: self.spatial_frequency(coord.y),
        })
    }

    fn create(&self, coord: Coord) -> Gem {
        Gem {
            x: coord.x,
            y: coord.y,
            ori: self.orientation(coord.x),
            sf: self.spatial_frequency(coord.y),
            score: self.score_func.score(coord),
        }
    }

    fn orientation(&self, x: u32) -> f32 {
        let t = x as f32 / self.params.n_cols as f32;
        lerp(self.params.min_ori, self.params.max_ori, t)
    }

    fn spatial_frequency(&self, y: u32) -> f32 {
        if self.params.n_rows == 1 {
            return self.params.min_sf;
        }
        let t = y as f32 / (self.params.n_rows - 1) as f32;
        lerp(self.params.min_sf, self.params.max_sf, t)
    }

    /// Every cell of the grid, x ascending outer and y ascending inner.
    /// Finite and restartable; cells not yet cached are materialized.
    pub fn export(&mut self) -> impl Iterator<Item = Gem> + '_ {
        let n_rows = self.params.n_rows;
        let n_cols = self.params.n_cols;
        (0..n_cols)
            .flat_map(move |x| (0..n_rows).map(move |y| Coord::new(x, y)))
            .map(move |coord| {
                if let Some(gem) = self.gems.get(&coord) {
                    return *gem;
                }
                let gem = self.create(coord);
                self.gems.insert(coord, gem);
                gem
            })
    }

    /// Write the export as CSV with header `x,y,ori,sf,score`.
    pub fn write_csv<W: Write>(&mut self, mut out: W) -> Result<()> {
        writeln!(out, "{EXPORT_HEADER}")?;
        for gem in self.export() {
            writeln!(out, "{}", gem.csv_row())?;
        }
        out.flush()?;
        Ok(())
    }

    /// In-bounds cells within Chebyshev `radius` of `center`.
    pub fn neighborhood(&self, center: Coord, radius: u32) -> Result<Vec<Coord>> {
        neighborhood::neighborhood(self, center, radius)
    }

    /// Draw a sample around `center` with the landscape's own generator.
    pub fn sample_neighborhood(
        &mut self,
        center: Coord,
        radius: u32,
        count: usize,
        policy: SamplePolicy,
    ) -> Result<Vec<Coord>> {
        let candidates = neighborhood::neighborhood(self, center, radius)?;
        neighborhood::draw(candidates, count, policy, &mut self.rng)
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
