use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;

use crate::config::{DistanceMetric, WireLengthMode};
use crate::model::Rect;
use crate::skyline::{self, Skyline};

pub mod beam;
pub mod rls;

/// One deterministic generator shared by every packer of a run.
pub type SharedRng = Rc<RefCell<StdRng>>;

/// A packer constructs placements for one candidate bin width.
///
/// `run` performs `iter` units of work (neighborhood moves for RLS, beam
/// width for beam search); state persists across calls so the adaptive
/// selecter can revisit a width and continue where it left off.
pub trait FloorplanPacker {
    fn run(
        &mut self,
        iter: usize,
        alpha: f64,
        beta: f64,
        wl_mode: &WireLengthMode,
        metric: &DistanceMetric,
    );
    fn objective(&self) -> f64;
    fn area(&self) -> i64;
    fn wirelength(&self) -> f64;
    fn dst(&self) -> &[Rect];
    fn bin_width(&self) -> i32;
    /// Forgets the recorded objective so an outline-infeasible solution can
    /// no longer win the incumbent.
    fn reset_objective(&mut self);
}

pub fn objective(area: i64, dist: f64, alpha: f64, beta: f64) -> f64 {
    alpha * area as f64 + beta * dist
}

fn tie_epsilon(v: f64) -> f64 {
    (v.abs() * 1e-9).max(1e-12)
}

/// Strict improvement under the floating-point tie tolerance.
pub fn improves(candidate: f64, best: f64) -> bool {
    candidate < best - tie_epsilon(best)
}

/// Tie test under the same tolerance.
pub fn ties(a: f64, b: f64) -> bool {
    (a - b).abs() <= tie_epsilon(a.abs().max(b.abs()))
}

/// Best solution seen by one packer.
#[derive(Debug, Clone)]
pub(crate) struct BestSolution {
    pub objective: f64,
    pub area: i64,
    pub wirelength: f64,
    pub dst: Vec<Rect>,
}

impl BestSolution {
    pub fn new() -> Self {
        Self {
            objective: f64::MAX,
            area: i64::MAX,
            wirelength: f64::MAX,
            dst: Vec::new(),
        }
    }

    /// Records `(objective, area, wirelength, dst)` iff it strictly improves.
    pub fn offer(&mut self, objective: f64, area: i64, wirelength: f64, dst: &[Rect]) -> bool {
        if improves(objective, self.objective) {
            self.objective = objective;
            self.area = area;
            self.wirelength = wirelength;
            self.dst.clear();
            self.dst.extend_from_slice(dst);
            true
        } else {
            false
        }
    }
}

/// A block chosen for the current bottom-left corner, with its rotation and
/// justified x-coordinate resolved.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Chosen {
    pub block: usize,
    pub width: i32,
    pub height: i32,
    pub x: i32,
    pub score: i32,
}

/// Picks the best-scoring (block, rotation) for segment `index`, first seen
/// wins on ties. Scores 0/2/4 leave a sliver next to the placement; when no
/// remaining block could use that sliver, the pick is replaced by the widest
/// block at least as tall as the lower wall, set against the taller side.
pub(crate) fn find_rect_bottom_left<I>(
    src: &[Rect],
    remaining: I,
    skyline_ref: &Skyline,
    index: usize,
    bin_width: i32,
) -> Option<Chosen>
where
    I: Iterator<Item = usize> + Clone,
{
    let mut best: Option<Chosen> = None;
    for r in remaining.clone() {
        for rotate in 0..2 {
            let (width, height) = if rotate == 0 {
                (src[r].width, src[r].height)
            } else {
                (src[r].height, src[r].width)
            };
            if let Some((score, x)) = skyline::score_bottom_left(skyline_ref, index, width, height, bin_width)
            {
                if best.as_ref().map_or(true, |b| score > b.score) {
                    best = Some(Chosen {
                        block: r,
                        width,
                        height,
                        x,
                        score,
                    });
                }
            }
        }
    }
    let chosen = best?;

    if matches!(chosen.score, 0 | 2 | 4) {
        let node = skyline_ref[index];
        let mut others = 0usize;
        let mut min_unpacked_width = i32::MAX;
        for r in remaining.clone() {
            if r == chosen.block {
                continue;
            }
            others += 1;
            min_unpacked_width = min_unpacked_width.min(src[r].width);
        }
        // The leftover sliver is wasted only if nothing else fits into it.
        if others > 0 && min_unpacked_width > node.width - chosen.width {
            let space = skyline::space_at(skyline_ref, index);
            let min_space_height = space.hl.min(space.hr);
            let mut replacement: Option<(usize, i32, i32)> = None;
            for r in remaining {
                for rotate in 0..2 {
                    let (width, height) = if rotate == 0 {
                        (src[r].width, src[r].height)
                    } else {
                        (src[r].height, src[r].width)
                    };
                    if height >= min_space_height
                        && width <= space.width
                        && width > replacement.map_or(0, |(_, w, _)| w)
                    {
                        replacement = Some((r, width, height));
                    }
                }
            }
            if let Some((block, width, height)) = replacement {
                let x = if space.hl >= space.hr {
                    node.x
                } else {
                    node.x + node.width - width
                };
                return Some(Chosen {
                    block,
                    width,
                    height,
                    x,
                    score: chosen.score,
                });
            }
        }
    }
    Some(chosen)
}
