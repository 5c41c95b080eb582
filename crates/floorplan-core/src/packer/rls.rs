use std::rc::Rc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::config::{DistanceMetric, WireLengthMode};
use crate::instance::Instance;
use crate::model::Rect;
use crate::netwire::{self, Adjacency};
use crate::skyline::{self, Skyline};

use super::{
    find_rect_bottom_left, improves, objective, ties, BestSolution, FloorplanPacker, SharedRng,
};

/// A block ordering and the best objective it has produced.
#[derive(Debug, Clone)]
struct SortRule {
    sequence: Vec<usize>,
    objective: f64,
}

/// Random local search over block orderings: a pool of sort rules feeds the
/// greedy bottom-left-score constructor; swap/rotate moves perturb the
/// best-performing rules most often.
pub struct RandomLocalSearcher<'a> {
    ins: &'a Instance,
    src: Vec<Rect>,
    bin_width: i32,
    graph: Rc<Adjacency>,
    rng: SharedRng,
    sort_rules: Vec<SortRule>,
    rule_dist: WeightedIndex<u32>,
    initialized: bool,
    best: BestSolution,
}

impl<'a> RandomLocalSearcher<'a> {
    pub fn new(
        ins: &'a Instance,
        src: Vec<Rect>,
        bin_width: i32,
        graph: Rc<Adjacency>,
        rng: SharedRng,
    ) -> Self {
        let mut searcher = Self {
            ins,
            src,
            bin_width,
            graph,
            rng,
            sort_rules: Vec::new(),
            rule_dist: WeightedIndex::new([2u32, 4, 6, 8, 10]).expect("static weights"),
            initialized: false,
            best: BestSolution::new(),
        };
        searcher.init_sort_rules();
        searcher
    }

    fn init_sort_rules(&mut self) {
        let n = self.src.len();
        let seq: Vec<usize> = (0..n).collect();
        self.sort_rules = (0..5)
            .map(|_| SortRule {
                sequence: seq.clone(),
                objective: f64::MAX,
            })
            .collect();
        // 1: decreasing area
        self.sort_rules[1]
            .sequence
            .sort_by_key(|&r| (-self.ins.blocks()[r].area, r));
        // 2: decreasing height
        self.sort_rules[2]
            .sequence
            .sort_by_key(|&r| (-self.src[r].height, r));
        // 3: decreasing width
        self.sort_rules[3]
            .sequence
            .sort_by_key(|&r| (-self.src[r].width, r));
        // 4: uniform shuffle
        {
            use rand::seq::SliceRandom;
            let mut rng = self.rng.borrow_mut();
            self.sort_rules[4].sequence.shuffle(&mut *rng);
        }
    }

    /// Greedily builds a complete placement from `sequence`. Returns the
    /// envelope height and the placement, indexed by block id.
    fn construct(&self, sequence: &[usize]) -> (i32, Vec<Rect>) {
        let mut sky: Skyline = skyline::new_skyline(self.bin_width);
        let mut dst = self.src.clone();
        let mut packed = vec![false; self.src.len()];
        let mut left = self.src.len();
        let mut height = 0;

        while left > 0 {
            let bottom = skyline::bottom_index(&sky);
            let min_width = sequence
                .iter()
                .copied()
                .filter(|&r| !packed[r])
                .map(|r| self.src[r].width)
                .min()
                .unwrap_or(0);

            // The lowest segment cannot take any remaining block: fill the pit.
            if sky[bottom].width < min_width {
                skyline::raise_bottom(&mut sky, bottom);
                continue;
            }

            let remaining = sequence.iter().copied().filter(|&r| !packed[r]);
            let chosen = find_rect_bottom_left(&self.src, remaining, &sky, bottom, self.bin_width)
                .expect("every remaining block must admit a placement");

            let y = sky[bottom].y;
            dst[chosen.block] = Rect::new(chosen.block, chosen.x, y, chosen.width, chosen.height);
            skyline::insert(&mut sky, bottom, chosen.x, chosen.width, chosen.height);
            packed[chosen.block] = true;
            left -= 1;
            height = height.max(y + chosen.height);
        }

        (height, dst)
    }

    fn evaluate(
        &self,
        height: i32,
        dst: &[Rect],
        alpha: f64,
        beta: f64,
        wl_mode: &WireLengthMode,
        metric: &DistanceMetric,
    ) -> (f64, i64, f64) {
        let area = height as i64 * self.bin_width as i64;
        let packed = vec![true; dst.len()];
        let eval = netwire::evaluate(self.ins, &self.graph, dst, &packed, wl_mode, metric);
        (objective(area, eval.dist, alpha, beta), area, eval.wirelength)
    }

    /// Swaps two distinct positions of the ordering.
    fn swap_sort_rule(&self, rule: &mut SortRule) {
        let n = rule.sequence.len();
        if n < 2 {
            return;
        }
        let mut rng = self.rng.borrow_mut();
        let a = rng.gen_range(0..n);
        let mut b = rng.gen_range(0..n);
        while a == b {
            b = rng.gen_range(0..n);
        }
        rule.sequence.swap(a, b);
    }

    /// Rotates the ordering by a random offset.
    fn rotate_sort_rule(&self, rule: &mut SortRule) {
        let n = rule.sequence.len();
        if n < 2 {
            return;
        }
        let offset = self.rng.borrow_mut().gen_range(0..n);
        rule.sequence.rotate_left(offset);
    }

    fn resort_rules(&mut self) {
        // Descending, so the highest index holds the best rule.
        self.sort_rules.sort_by(|lhs, rhs| {
            rhs.objective
                .partial_cmp(&lhs.objective)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

impl FloorplanPacker for RandomLocalSearcher<'_> {
    fn run(
        &mut self,
        iter: usize,
        alpha: f64,
        beta: f64,
        wl_mode: &WireLengthMode,
        metric: &DistanceMetric,
    ) {
        // First visit to this width: score every rule once.
        if !self.initialized {
            self.initialized = true;
            for k in 0..self.sort_rules.len() {
                let (height, dst) = self.construct(&self.sort_rules[k].sequence);
                let (obj, area, wirelength) =
                    self.evaluate(height, &dst, alpha, beta, wl_mode, metric);
                self.sort_rules[k].objective = obj;
                self.best.offer(obj, area, wirelength, &dst);
            }
            self.resort_rules();
        }

        let picked_index = {
            let mut rng = self.rng.borrow_mut();
            if rng.gen_range(0..10) == 0 {
                rng.gen_range(0..self.sort_rules.len())
            } else {
                self.rule_dist.sample(&mut *rng)
            }
        };

        let mut picked = self.sort_rules[picked_index].clone();
        let mut resort_needed = false;
        for _ in 0..iter {
            let mut new_rule = picked.clone();
            let do_swap = self.rng.borrow_mut().gen_range(0..4) < 3;
            if do_swap {
                self.swap_sort_rule(&mut new_rule);
            } else {
                self.rotate_sort_rule(&mut new_rule);
            }

            let (height, dst) = self.construct(&new_rule.sequence);
            let (obj, area, wirelength) = self.evaluate(height, &dst, alpha, beta, wl_mode, metric);
            new_rule.objective = obj;

            if improves(obj, picked.objective) || ties(obj, picked.objective) {
                if improves(obj, picked.objective) {
                    resort_needed = true;
                }
                picked = new_rule;
                self.best.offer(obj, area, wirelength, &dst);
            }
        }
        self.sort_rules[picked_index] = picked;

        if resort_needed {
            self.resort_rules();
        }
    }

    fn objective(&self) -> f64 {
        self.best.objective
    }

    fn area(&self) -> i64 {
        self.best.area
    }

    fn wirelength(&self) -> f64 {
        self.best.wirelength
    }

    fn dst(&self) -> &[Rect] {
        &self.best.dst
    }

    fn bin_width(&self) -> i32 {
        self.bin_width
    }

    fn reset_objective(&mut self) {
        self.best.objective = f64::MAX;
    }
}
