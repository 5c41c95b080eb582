//! Outer loop: a bandit over candidate bin widths, each backed by its own
//! persistent packer, feeding a single incumbent.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Instant;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::{CandidateWidthGen, FloorplanConfig, PackerKind};
use crate::error::{FloorplanError, Result};
use crate::instance::Instance;
use crate::model::{verify_placement, Rect};
use crate::netwire::Adjacency;
use crate::packer::beam::BeamSearcher;
use crate::packer::rls::RandomLocalSearcher;
use crate::packer::{improves, FloorplanPacker, SharedRng};

/// Cap on subset enumeration for the combinatorial width producers.
const COMB_ENUM_CAP: usize = 200_000;

/// Best placement seen across all widths and iterations.
#[derive(Debug, Clone)]
pub struct Incumbent {
    pub objective: f64,
    pub area: i64,
    pub wirelength: f64,
    /// Total block area / envelope area.
    pub fill_ratio: f64,
    /// Envelope aspect ratio, always >= 1.
    pub wh_ratio: f64,
    pub dst: Vec<Rect>,
    /// Wall-clock seconds when this incumbent was found.
    pub duration: f64,
    /// `iter` of the width that produced it.
    pub iteration: usize,
}

impl Incumbent {
    fn new() -> Self {
        Self {
            objective: f64::MAX,
            area: 0,
            wirelength: 0.0,
            fill_ratio: 0.0,
            wh_ratio: 0.0,
            dst: Vec::new(),
            duration: 0.0,
            iteration: 0,
        }
    }

    pub fn is_set(&self) -> bool {
        !self.dst.is_empty()
    }
}

/// One entry of the width population.
struct CandidateWidth<'a> {
    value: i32,
    iter: usize,
    packer: Box<dyn FloorplanPacker + 'a>,
}

/// Drives the whole search under the wall-clock budget.
pub struct AdaptiveSelecter<'a> {
    ins: &'a Instance,
    cfg: &'a FloorplanConfig,
    seed: u64,
    rng: SharedRng,
    start: Instant,
    incumbent: Incumbent,
}

impl<'a> AdaptiveSelecter<'a> {
    pub fn new(ins: &'a Instance, cfg: &'a FloorplanConfig) -> Self {
        let seed = cfg.random_seed.unwrap_or_else(rand::random);
        Self {
            ins,
            cfg,
            seed,
            rng: Rc::new(RefCell::new(StdRng::seed_from_u64(seed))),
            start: Instant::now(),
            incumbent: Incumbent::new(),
        }
    }

    /// The effective RNG seed (resolved from entropy when unconfigured).
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn incumbent(&self) -> &Incumbent {
        &self.incumbent
    }

    /// Legality of the incumbent per the final check: dimensions preserved
    /// and no overlaps.
    pub fn check_incumbent(&self) -> bool {
        self.incumbent.is_set() && verify_placement(self.ins.blocks(), &self.incumbent.dst)
    }

    pub fn run(&mut self) -> Result<&Incumbent> {
        if self.ins.block_count() == 0 {
            return Err(FloorplanError::Empty);
        }
        self.start = Instant::now();
        let src = self.ins.rects();

        let widths = candidate_widths(self.ins, self.cfg);
        if widths.is_empty() {
            return Err(FloorplanError::NoFeasibleWidth {
                instance: self.ins.name().to_string(),
                total_area: self.ins.total_area(),
                fixed_width: self.ins.fixed_width(),
                fixed_height: self.ins.fixed_height(),
            });
        }
        info!(
            candidates = widths.len(),
            producer = %self.cfg.level_asa_cw,
            packer = %self.cfg.level_asa_fbp,
            "candidate width set ready"
        );

        let graph = Rc::new(Adjacency::from_instance(self.ins));

        // One packer per width, a single warm-up iteration each.
        let mut cws: Vec<CandidateWidth<'a>> = Vec::with_capacity(widths.len());
        for value in widths {
            let mut packer = self.make_packer(src.clone(), value, graph.clone());
            packer.run(
                1,
                self.cfg.alpha,
                self.cfg.beta,
                &self.cfg.level_fbp_wl,
                &self.cfg.level_fbp_dist,
            );
            let mut cw = CandidateWidth {
                value,
                iter: 1,
                packer,
            };
            self.check_cw(&mut cw);
            cws.push(cw);
        }
        Self::resort(&mut cws);

        // Bandit loop: best-ranked widths are revisited most, with a uniform
        // escape hatch for diversification.
        while self.start.elapsed().as_secs_f64() < self.cfg.ub_time {
            let index = {
                let mut rng = self.rng.borrow_mut();
                if rng.gen_range(0..10) == 0 {
                    rng.gen_range(0..cws.len())
                } else {
                    let weights = (1..=cws.len()).map(|i| 2 * i as u32);
                    WeightedIndex::new(weights)
                        .expect("population is non-empty")
                        .sample(&mut *rng)
                }
            };
            let cw = &mut cws[index];
            let old_objective = cw.packer.objective();
            cw.iter = (cw.iter * 2).min(self.cfg.ub_iter);
            cw.packer.run(
                cw.iter,
                self.cfg.alpha,
                self.cfg.beta,
                &self.cfg.level_fbp_wl,
                &self.cfg.level_fbp_dist,
            );
            self.check_cw(&mut cws[index]);
            if improves(cws[index].packer.objective(), old_objective) {
                Self::resort(&mut cws);
            }
        }

        info!(
            objective = self.incumbent.objective,
            area = self.incumbent.area,
            wirelength = self.incumbent.wirelength,
            fill_ratio = self.incumbent.fill_ratio,
            duration = self.incumbent.duration,
            "search finished"
        );
        Ok(&self.incumbent)
    }

    fn make_packer(
        &self,
        src: Vec<Rect>,
        bin_width: i32,
        graph: Rc<Adjacency>,
    ) -> Box<dyn FloorplanPacker + 'a> {
        match self.cfg.level_asa_fbp {
            PackerKind::RandomLocalSearch => Box::new(RandomLocalSearcher::new(
                self.ins,
                src,
                bin_width,
                graph,
                self.rng.clone(),
            )),
            PackerKind::BeamSearch => Box::new(BeamSearcher::new(
                self.ins,
                src,
                bin_width,
                graph,
                self.rng.clone(),
            )),
        }
    }

    /// Descending by last objective, so the best-ranked width sits at the
    /// highest index (and gets the largest bandit weight).
    fn resort(cws: &mut [CandidateWidth<'_>]) {
        cws.sort_by(|lhs, rhs| {
            rhs.packer
                .objective()
                .partial_cmp(&lhs.packer.objective())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(lhs.value.cmp(&rhs.value))
        });
    }

    /// Outline feasibility plus incumbent bookkeeping for one width.
    fn check_cw(&mut self, cw: &mut CandidateWidth<'_>) {
        // A layout taller than the fixed outline can never be reported.
        if self.ins.fixed_height() > 0
            && cw.packer.area() / cw.value as i64 > self.ins.fixed_height() as i64
        {
            cw.packer.reset_objective();
        }
        let objective = cw.packer.objective();
        if improves(objective, self.incumbent.objective) {
            let area = cw.packer.area();
            let height = area / cw.value as i64;
            self.incumbent.duration = self.start.elapsed().as_secs_f64();
            self.incumbent.iteration = cw.iter;
            self.incumbent.objective = objective;
            self.incumbent.area = area;
            self.incumbent.wirelength = cw.packer.wirelength();
            self.incumbent.fill_ratio = self.ins.total_area() as f64 / area as f64;
            self.incumbent.wh_ratio =
                (cw.value as i64).max(height) as f64 / (cw.value as i64).min(height).max(1) as f64;
            self.incumbent.dst = cw.packer.dst().to_vec();
            debug!(
                width = cw.value,
                iter = cw.iter,
                objective,
                area,
                "incumbent improved"
            );
        }
    }
}

/// Candidate bin-width set for the configured producer, deduplicated and
/// ascending.
pub fn candidate_widths(ins: &Instance, cfg: &FloorplanConfig) -> Vec<i32> {
    let src = ins.rects();
    match cfg.level_asa_cw {
        CandidateWidthGen::Interval => widths_on_interval(&src),
        CandidateWidthGen::Sqrt => widths_on_sqrt(ins, cfg, &src),
        CandidateWidthGen::CombRotate => widths_on_comb_rotate(ins, &src),
        CandidateWidthGen::CombShort => widths_on_comb_short(ins, &src),
    }
}

/// All integer widths in [max block height, sum of block heights].
fn widths_on_interval(src: &[Rect]) -> Vec<i32> {
    let mut min_cw = 0i32;
    let mut max_cw = 0i64;
    for r in src {
        min_cw = min_cw.max(r.height);
        max_cw += r.height as i64;
    }
    (min_cw..=max_cw.min(i32::MAX as i64) as i32).collect()
}

/// Widths bracketing sqrt(total area), clamped below by the tallest block.
fn widths_on_sqrt(ins: &Instance, cfg: &FloorplanConfig, src: &[Rect]) -> Vec<i32> {
    let sqrt_area = (ins.total_area() as f64).sqrt();
    let mut min_cw = (cfg.lb_scale * sqrt_area).floor() as i32;
    for r in src {
        min_cw = min_cw.max(r.height);
    }
    let max_cw = ((cfg.ub_scale * sqrt_area).ceil() as i32).max(min_cw);
    (min_cw..=max_cw).collect()
}

fn comb_bounds(ins: &Instance, src: &[Rect]) -> (i32, i32) {
    let min_cw = src.iter().map(|r| r.height).max().unwrap_or(0);
    let max_cw = ((ins.total_area() as f64).sqrt() * 1.05).floor() as i32;
    (min_cw, max_cw)
}

fn comb_feasible(ins: &Instance, cw: i32, min_cw: i32, max_cw: i32) -> bool {
    cw >= min_cw && cw <= max_cw && cw as i64 * ins.fixed_height() as i64 > ins.total_area()
}

/// k-subset sums of the short sides, k in [3, 6].
fn widths_on_comb_short(ins: &Instance, src: &[Rect]) -> Vec<i32> {
    let (min_cw, max_cw) = comb_bounds(ins, src);
    let total_width: i32 = src.iter().map(|r| r.width).sum();
    let mut widths = BTreeSet::new();
    let n = src.len();
    for k in 3..=6.min(n) {
        let mut enumerated = 0usize;
        for comb in Combinations::new(n, k) {
            enumerated += 1;
            if enumerated > COMB_ENUM_CAP {
                warn!(k, cap = COMB_ENUM_CAP, "subset enumeration capped");
                break;
            }
            let cw: i32 = comb.iter().map(|&i| src[i].width).sum();
            if comb_feasible(ins, cw, min_cw, max_cw) {
                widths.insert(cw);
            }
            // Complement subset, by sum.
            let ncw = total_width - cw;
            if comb_feasible(ins, ncw, min_cw, max_cw) {
                widths.insert(ncw);
            }
        }
    }
    widths.into_iter().collect()
}

/// k-subset sums with any half of the subset rotated, k in [3, 6].
fn widths_on_comb_rotate(ins: &Instance, src: &[Rect]) -> Vec<i32> {
    let (min_cw, max_cw) = comb_bounds(ins, src);
    let mut widths = BTreeSet::new();
    let n = src.len();
    for k in 3..=6.min(n) {
        let mut enumerated = 0usize;
        'subsets: for comb in Combinations::new(n, k) {
            for kk in 1..=k / 2 {
                for rotated in Combinations::new(k, kk) {
                    enumerated += 1;
                    if enumerated > COMB_ENUM_CAP {
                        warn!(k, cap = COMB_ENUM_CAP, "subset enumeration capped");
                        break 'subsets;
                    }
                    let mut in_rotated = vec![false; k];
                    for &i in &rotated {
                        in_rotated[i] = true;
                    }
                    let mut rcw = 0i32;
                    let mut nrcw = 0i32;
                    for (pos, &block) in comb.iter().enumerate() {
                        if in_rotated[pos] {
                            rcw += src[block].height;
                            nrcw += src[block].width;
                        } else {
                            rcw += src[block].width;
                            nrcw += src[block].height;
                        }
                    }
                    if comb_feasible(ins, rcw, min_cw, max_cw) {
                        widths.insert(rcw);
                    }
                    if comb_feasible(ins, nrcw, min_cw, max_cw) {
                        widths.insert(nrcw);
                    }
                }
            }
        }
    }
    widths.into_iter().collect()
}

/// Lexicographic k-subset walker over `0..n`.
struct Combinations {
    n: usize,
    k: usize,
    indices: Vec<usize>,
    started: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            k,
            indices: (0..k).collect(),
            started: false,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.k == 0 || self.k > self.n {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }
        // Advance the rightmost index that still has room.
        let mut i = self.k;
        while i > 0 {
            i -= 1;
            if self.indices[i] < self.n - self.k + i {
                self.indices[i] += 1;
                for j in i + 1..self.k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                return Some(self.indices.clone());
            }
        }
        None
    }
}
