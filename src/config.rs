use crate::core::coord::Coord;
use crate::core::error::{GemsError, Result};
use crate::core::landscape::{Landscape, LandscapeParams};
use crate::core::neighborhood::SamplePolicy;
use crate::core::score::{Normalization, ScoreFunction, SimpleHill, score_function_from_name};
use crate::experiment::record::SubjectInfo;
use crate::experiment::session::{LayoutParams, PhaseConfig, SessionConfig, Texts};
use crate::experiment::trial::SearchParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LandscapeConfig {
    #[serde(default = "LandscapeConfig::default_n_rows")]
    pub n_rows: u32,
    #[serde(default = "LandscapeConfig::default_n_cols")]
    pub n_cols: u32,
    #[serde(default = "LandscapeConfig::default_min_ori")]
    pub min_ori: f64,
    #[serde(default = "LandscapeConfig::default_max_ori")]
    pub max_ori: f64,
    #[serde(default = "LandscapeConfig::default_min_sf")]
    pub min_sf: f64,
    #[serde(default = "LandscapeConfig::default_max_sf")]
    pub max_sf: f64,
    #[serde(default = "LandscapeConfig::default_score_func")]
    pub score_func: String,
    #[serde(default = "LandscapeConfig::default_peak")]
    pub peak_x: i64,
    #[serde(default = "LandscapeConfig::default_peak")]
    pub peak_y: i64,
    #[serde(default = "LandscapeConfig::default_normalize")]
    pub normalize: bool,
    #[serde(default = "LandscapeConfig::default_norm_divisor")]
    pub norm_divisor: i64,
    #[serde(default = "LandscapeConfig::default_norm_scale")]
    pub norm_scale: i64,
    /// Sampling seed; drawn at startup when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl LandscapeConfig {
    fn default_n_rows() -> u32 {
        100
    }
    fn default_n_cols() -> u32 {
        100
    }
    fn default_min_ori() -> f64 {
        180.0
    }
    fn default_max_ori() -> f64 {
        0.0
    }
    fn default_min_sf() -> f64 {
        0.05
    }
    fn default_max_sf() -> f64 {
        0.2
    }
    fn default_score_func() -> String {
        "simple_hill".to_string()
    }
    fn default_peak() -> i64 {
        SimpleHill::DEFAULT_PEAK.0
    }
    fn default_normalize() -> bool {
        true
    }
    fn default_norm_divisor() -> i64 {
        SimpleHill::DEFAULT_DIVISOR
    }
    fn default_norm_scale() -> i64 {
        SimpleHill::DEFAULT_SCALE
    }

    pub fn params(&self) -> LandscapeParams {
        LandscapeParams {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            min_ori: self.min_ori as f32,
            max_ori: self.max_ori as f32,
            min_sf: self.min_sf as f32,
            max_sf: self.max_sf as f32,
        }
    }

    pub fn score_function(&self) -> Result<Box<dyn ScoreFunction>> {
        let normalization = if self.normalize {
            Some(Normalization::new(self.norm_divisor, self.norm_scale)?)
        } else {
            None
        };
        score_function_from_name(&self.score_func, (self.peak_x, self.peak_y), normalization)
    }
}

impl Default for LandscapeConfig {
    fn default() -> Self {
        Self {
            n_rows: Self::default_n_rows(),
            n_cols: Self::default_n_cols(),
            min_ori: Self::default_min_ori(),
            max_ori: Self::default_max_ori(),
            min_sf: Self::default_min_sf(),
            max_sf: Self::default_max_sf(),
            score_func: Self::default_score_func(),
            peak_x: Self::default_peak(),
            peak_y: Self::default_peak(),
            normalize: Self::default_normalize(),
            norm_divisor: Self::default_norm_divisor(),
            norm_scale: Self::default_norm_scale(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "SearchConfig::default_radius")]
    pub radius: u32,
    #[serde(default = "SearchConfig::default_n_search_items")]
    pub n_search_items: usize,
    #[serde(default)]
    pub sample_policy: SamplePolicy,
}

impl SearchConfig {
    fn default_radius() -> u32 {
        8
    }
    fn default_n_search_items() -> usize {
        9
    }

    pub fn params(&self) -> SearchParams {
        SearchParams {
            radius: self.radius,
            n_search_items: self.n_search_items,
            policy: self.sample_policy,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            radius: Self::default_radius(),
            n_search_items: Self::default_n_search_items(),
            sample_policy: SamplePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(default = "DisplayConfig::default_viewport")]
    pub viewport: [f64; 2],
    #[serde(default = "DisplayConfig::default_grid")]
    pub grid_rows: u32,
    #[serde(default = "DisplayConfig::default_grid")]
    pub grid_cols: u32,
    #[serde(default = "DisplayConfig::default_stim_size")]
    pub stim_size: f64,
    #[serde(default = "DisplayConfig::default_margin")]
    pub margin: f64,
}

impl DisplayConfig {
    fn default_viewport() -> [f64; 2] {
        [1080.0, 1080.0]
    }
    fn default_grid() -> u32 {
        3
    }
    fn default_stim_size() -> f64 {
        60.0
    }
    fn default_margin() -> f64 {
        240.0
    }

    pub fn params(&self) -> LayoutParams {
        LayoutParams {
            grid_rows: self.grid_rows,
            grid_cols: self.grid_cols,
            viewport: (self.viewport[0] as f32, self.viewport[1] as f32),
            margin: self.margin as f32,
            stim_size: self.stim_size as f32,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            viewport: Self::default_viewport(),
            grid_rows: Self::default_grid(),
            grid_cols: Self::default_grid(),
            stim_size: Self::default_stim_size(),
            margin: Self::default_margin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    /// Test-phase feedback hold.
    #[serde(default = "TimingConfig::default_feedback_sec")]
    pub feedback_sec: f64,
    #[serde(default = "TimingConfig::default_iti_sec")]
    pub iti_sec: f64,
    #[serde(default = "TimingConfig::default_break_min_sec")]
    pub break_min_sec: f64,
}

impl TimingConfig {
    fn default_feedback_sec() -> f64 {
        1.5
    }
    fn default_iti_sec() -> f64 {
        1.0
    }
    fn default_break_min_sec() -> f64 {
        5.0
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            feedback_sec: Self::default_feedback_sec(),
            iti_sec: Self::default_iti_sec(),
            break_min_sec: Self::default_break_min_sec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSection {
    #[serde(default = "SessionSection::default_trials")]
    pub training_trials: usize,
    #[serde(default = "SessionSection::default_trials")]
    pub test_trials: usize,
    #[serde(default = "SessionSection::default_pos")]
    pub training_pos: Coord,
    #[serde(default = "SessionSection::default_pos")]
    pub starting_pos: Coord,
    /// Test trials between breaks; no breaks when absent.
    #[serde(default)]
    pub break_every: Option<usize>,
    #[serde(default = "SessionSection::default_data_dir")]
    pub data_dir: String,
    /// Gems shown on the instruction screens; the last one is clicked to
    /// start training.
    #[serde(default = "SessionSection::default_example_gems")]
    pub example_gems: Vec<Coord>,
}

impl SessionSection {
    fn default_trials() -> usize {
        10
    }
    fn default_pos() -> Coord {
        Coord::new(10, 10)
    }
    fn default_data_dir() -> String {
        "data".to_string()
    }
    fn default_example_gems() -> Vec<Coord> {
        vec![Coord::new(10, 10), Coord::new(20, 20)]
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            training_trials: Self::default_trials(),
            test_trials: Self::default_trials(),
            training_pos: Self::default_pos(),
            starting_pos: Self::default_pos(),
            break_every: None,
            data_dir: Self::default_data_dir(),
            example_gems: Self::default_example_gems(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub landscape: LandscapeConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub texts: Texts,
}

fn seconds(label: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        GemsError::Configuration(format!("{label} must be a non-negative duration, got {secs}"))
    })
}

impl AppConfig {
    pub fn load_or_default(path: &str) -> Self {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            match fs::read_to_string(path_obj) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(cfg) => return cfg,
                    Err(err) => {
                        warn!("Failed to parse config {path}: {err}. Using defaults.");
                    }
                },
                Err(err) => {
                    warn!("Failed to read config {path}: {err}. Using defaults.");
                }
            }
            return Self::default();
        }

        // File does not exist: write defaults and return them.
        let default_cfg = Self::default();
        match toml::to_string_pretty(&default_cfg) {
            Ok(text) => {
                if let Err(err) = fs::write(path_obj, Self::commented(&text)) {
                    warn!("Failed to write default config to {path}: {err}");
                }
            }
            Err(err) => warn!("Failed to serialize default config ({err}); continuing with defaults"),
        }
        default_cfg
    }

    /// Comment out every key so the written file documents the defaults
    /// without pinning them. Table headers stay live.
    fn commented(text: &str) -> String {
        text.lines()
            .map(|line| {
                let trimmed = line.trim();
                let header = trimmed.starts_with('[') && !line.starts_with(' ');
                if trimmed.is_empty() || header {
                    format!("{line}\n")
                } else {
                    format!("# {line}\n")
                }
            })
            .collect()
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.session.data_dir)
    }

    pub fn score_function(&self) -> Result<Box<dyn ScoreFunction>> {
        self.landscape.score_function()
    }

    pub fn build_landscape(&self) -> Result<Landscape> {
        Landscape::new(
            self.landscape.params(),
            self.score_function()?,
            self.landscape.seed,
        )
    }

    /// Validated runtime settings for one participant.
    pub fn session_config(&self, subject: SubjectInfo) -> Result<SessionConfig> {
        let search = self.search.params();
        let layout = self.display.params();
        layout.build(search.n_search_items)?;
        let (n_cols, n_rows) = (self.landscape.n_cols, self.landscape.n_rows);
        let positions = [self.session.training_pos, self.session.starting_pos];
        for &pos in positions.iter().chain(&self.session.example_gems) {
            if pos.x >= n_cols || pos.y >= n_rows {
                return Err(GemsError::OutOfBounds {
                    coord: pos,
                    n_cols,
                    n_rows,
                });
            }
        }

        let feedback = seconds("timing.feedback_sec", self.timing.feedback_sec)?;
        Ok(SessionConfig {
            subject,
            search,
            layout,
            training: PhaseConfig::training(self.session.training_trials, self.session.training_pos),
            test: PhaseConfig::test(self.session.test_trials, self.session.starting_pos, feedback),
            iti: seconds("timing.iti_sec", self.timing.iti_sec)?,
            break_every: self.session.break_every,
            break_minimum: seconds("timing.break_min_sec", self.timing.break_min_sec)?,
            example_gems: self.session.example_gems.clone(),
            texts: self.texts.clone(),
        })
    }
}
