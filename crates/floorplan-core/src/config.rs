use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Search configuration.
/// Key notes:
///   - `level_asa_cw` selects how the candidate bin-width set W is produced
///   - `level_asa_fbp` selects the per-width packer (RLS or beam search)
///   - `alpha`/`beta` weight envelope area vs. the distance metric in the objective
///     Candidate-width producers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CandidateWidthGen {
    /// Every integer width in [max block height, sum of block heights].
    Interval,
    /// Widths bracketing sqrt(total area) by `lb_scale`/`ub_scale`.
    Sqrt,
    /// k-subset sums of block sides with one side optionally rotated (costly; capped).
    CombRotate,
    /// k-subset sums of short sides only (costly; capped).
    CombShort,
}

impl FromStr for CandidateWidthGen {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "interval" => Ok(Self::Interval),
            "sqrt" => Ok(Self::Sqrt),
            "combrotate" | "comb_rotate" => Ok(Self::CombRotate),
            "combshort" | "comb_short" => Ok(Self::CombShort),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CandidateWidthGen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Interval => "Interval",
            Self::Sqrt => "Sqrt",
            Self::CombRotate => "CombRotate",
            Self::CombShort => "CombShort",
        };
        f.write_str(s)
    }
}

/// Per-width packers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PackerKind {
    RandomLocalSearch,
    BeamSearch,
}

impl FromStr for PackerKind {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rls" | "randomlocalsearch" | "random_local_search" => Ok(Self::RandomLocalSearch),
            "bs" | "beamsearch" | "beam_search" => Ok(Self::BeamSearch),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RandomLocalSearch => "RandomLocalSearch",
            Self::BeamSearch => "BeamSearch",
        };
        f.write_str(s)
    }
}

/// Which pins participate in a net's bounding box.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum WireLengthMode {
    BlockOnly,
    BlockAndTerminal,
}

impl FromStr for WireLengthMode {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "block" | "blockonly" | "block_only" => Ok(Self::BlockOnly),
            "terminal" | "blockandterminal" | "block_and_terminal" => Ok(Self::BlockAndTerminal),
            _ => Err(()),
        }
    }
}

impl fmt::Display for WireLengthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BlockOnly => "BlockOnly",
            Self::BlockAndTerminal => "BlockAndTerminal",
        };
        f.write_str(s)
    }
}

/// Distance term of the objective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Total half-perimeter wire-length.
    WireLengthDist,
    /// Squared Euclidean center distance over connected block pairs.
    SqrEuclideanDist,
    /// Squared Manhattan center distance over connected block pairs.
    SqrManhattanDist,
    /// Sum of squared per-net HPWL.
    SqrHpwlDist,
}

impl FromStr for DistanceMetric {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wl" | "wirelengthdist" | "wire_length" => Ok(Self::WireLengthDist),
            "sqreuclidean" | "sqreuclideandist" | "sqr_euclidean" => Ok(Self::SqrEuclideanDist),
            "sqrmanhattan" | "sqrmanhattandist" | "sqr_manhattan" => Ok(Self::SqrManhattanDist),
            "sqrhpwl" | "sqrhpwldist" | "sqr_hpwl" => Ok(Self::SqrHpwlDist),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::WireLengthDist => "WireLengthDist",
            Self::SqrEuclideanDist => "SqrEuclideanDist",
            Self::SqrManhattanDist => "SqrManhattanDist",
            Self::SqrHpwlDist => "SqrHpwlDist",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorplanConfig {
    /// RNG seed. `None` seeds from entropy (nondeterministic runs).
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Weight of the envelope area in the objective.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Weight of the distance metric in the objective.
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// Lower bracket scale for the Sqrt width producer.
    #[serde(default = "default_lb_scale")]
    pub lb_scale: f64,
    /// Upper bracket scale for the Sqrt width producer.
    #[serde(default = "default_ub_scale")]
    pub ub_scale: f64,
    /// Outer-loop wall-clock budget in seconds.
    #[serde(default = "default_ub_time")]
    pub ub_time: f64,
    /// Cap on the per-width iteration count (RLS moves / beam width).
    #[serde(default = "default_ub_iter")]
    pub ub_iter: usize,

    #[serde(default = "default_level_asa_cw")]
    pub level_asa_cw: CandidateWidthGen,
    #[serde(default = "default_level_asa_fbp")]
    pub level_asa_fbp: PackerKind,
    #[serde(default = "default_level_fbp_wl")]
    pub level_fbp_wl: WireLengthMode,
    #[serde(default = "default_level_fbp_dist")]
    pub level_fbp_dist: DistanceMetric,
}

impl Default for FloorplanConfig {
    fn default() -> Self {
        Self {
            random_seed: None,
            alpha: default_alpha(),
            beta: default_beta(),
            lb_scale: default_lb_scale(),
            ub_scale: default_ub_scale(),
            ub_time: default_ub_time(),
            ub_iter: default_ub_iter(),
            level_asa_cw: default_level_asa_cw(),
            level_asa_fbp: default_level_asa_fbp(),
            level_fbp_wl: default_level_fbp_wl(),
            level_fbp_dist: default_level_fbp_dist(),
        }
    }
}

impl FloorplanConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::FloorplanError;

        if self.alpha < 0.0 || self.beta < 0.0 {
            return Err(FloorplanError::InvalidConfig(format!(
                "alpha ({}) and beta ({}) must be non-negative",
                self.alpha, self.beta
            )));
        }
        if self.alpha + self.beta <= 0.0 {
            return Err(FloorplanError::InvalidConfig(
                "alpha + beta must be positive".into(),
            ));
        }
        if self.lb_scale <= 0.0 || self.ub_scale < self.lb_scale {
            return Err(FloorplanError::InvalidConfig(format!(
                "sqrt bracket [{}, {}] is empty or negative",
                self.lb_scale, self.ub_scale
            )));
        }
        if self.ub_time <= 0.0 {
            return Err(FloorplanError::InvalidConfig(format!(
                "ub_time ({}) must be positive",
                self.ub_time
            )));
        }
        if self.ub_iter == 0 {
            return Err(FloorplanError::InvalidConfig(
                "ub_iter must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Create a fluent builder for `FloorplanConfig`.
    pub fn builder() -> FloorplanConfigBuilder {
        FloorplanConfigBuilder::new()
    }
}

fn default_alpha() -> f64 {
    0.5
}
fn default_beta() -> f64 {
    0.5
}
fn default_lb_scale() -> f64 {
    0.8
}
fn default_ub_scale() -> f64 {
    1.2
}
fn default_ub_time() -> f64 {
    60.0
}
fn default_ub_iter() -> usize {
    1024
}
fn default_level_asa_cw() -> CandidateWidthGen {
    CandidateWidthGen::Sqrt
}
fn default_level_asa_fbp() -> PackerKind {
    PackerKind::RandomLocalSearch
}
fn default_level_fbp_wl() -> WireLengthMode {
    WireLengthMode::BlockAndTerminal
}
fn default_level_fbp_dist() -> DistanceMetric {
    DistanceMetric::WireLengthDist
}

/// Builder for `FloorplanConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct FloorplanConfigBuilder {
    cfg: FloorplanConfig,
}

impl FloorplanConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: FloorplanConfig::default(),
        }
    }
    pub fn random_seed(mut self, v: Option<u64>) -> Self {
        self.cfg.random_seed = v;
        self
    }
    pub fn weights(mut self, alpha: f64, beta: f64) -> Self {
        self.cfg.alpha = alpha;
        self.cfg.beta = beta;
        self
    }
    pub fn sqrt_bracket(mut self, lb_scale: f64, ub_scale: f64) -> Self {
        self.cfg.lb_scale = lb_scale;
        self.cfg.ub_scale = ub_scale;
        self
    }
    pub fn ub_time(mut self, secs: f64) -> Self {
        self.cfg.ub_time = secs;
        self
    }
    pub fn ub_iter(mut self, v: usize) -> Self {
        self.cfg.ub_iter = v;
        self
    }
    pub fn candidate_widths(mut self, v: CandidateWidthGen) -> Self {
        self.cfg.level_asa_cw = v;
        self
    }
    pub fn packer(mut self, v: PackerKind) -> Self {
        self.cfg.level_asa_fbp = v;
        self
    }
    pub fn wirelength_mode(mut self, v: WireLengthMode) -> Self {
        self.cfg.level_fbp_wl = v;
        self
    }
    pub fn distance_metric(mut self, v: DistanceMetric) -> Self {
        self.cfg.level_fbp_dist = v;
        self
    }
    pub fn build(self) -> FloorplanConfig {
        self.cfg
    }
}
