use std::rc::Rc;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::{DistanceMetric, WireLengthMode};
use crate::instance::Instance;
use crate::model::Rect;
use crate::netwire::{self, Adjacency, Netwire};
use crate::skyline::{self, Skyline};

use super::{
    find_rect_bottom_left, improves, objective, ties, BestSolution, FloorplanPacker, SharedRng,
};

/// Partial placement: one node of the current beam.
#[derive(Debug, Clone)]
struct BeamNode {
    dst: Vec<Rect>,
    packed: Vec<bool>,
    left: usize,
    /// Per-net boxes kept in step with `dst`; objective evaluations read
    /// them instead of rebuilding every box.
    netwire: Netwire,
    skyline: Skyline,
    /// Index of the lowest skyline segment after pit filling.
    bl_index: usize,
}

/// Candidate action: place one block (in one rotation) on a parent's
/// bottom-left corner. Parents are addressed by index into the beam so no
/// aliasing is needed; materialization is deferred until selection.
#[derive(Debug, Clone)]
struct BranchNode {
    parent_idx: usize,
    block: usize,
    width: i32,
    height: i32,
    x: i32,
    area_score: i32,
    wire_score: f64,
    local_eval: f64,
    global_eval: f64,
    look_ahead_eval: f64,
}

/// Beam search over partial placements with a three-stage evaluation:
/// rank-blended local filtering, greedy-completion global scoring, and
/// bounded-completion look-ahead scoring.
pub struct BeamSearcher<'a> {
    ins: &'a Instance,
    src: Vec<Rect>,
    bin_width: i32,
    graph: Rc<Adjacency>,
    rng: SharedRng,
    best: BestSolution,
}

impl<'a> BeamSearcher<'a> {
    pub fn new(
        ins: &'a Instance,
        src: Vec<Rect>,
        bin_width: i32,
        graph: Rc<Adjacency>,
        rng: SharedRng,
    ) -> Self {
        Self {
            ins,
            src,
            bin_width,
            graph,
            rng,
            best: BestSolution::new(),
        }
    }

    fn root(&self) -> BeamNode {
        BeamNode {
            dst: self.src.clone(),
            packed: vec![false; self.src.len()],
            left: self.src.len(),
            netwire: Netwire::new(self.ins.net_count()),
            skyline: skyline::new_skyline(self.bin_width),
            bl_index: 0,
        }
    }

    /// Pit-fills the node's skyline until the lowest segment can take some
    /// remaining block, and records that segment as the branching corner.
    fn check_parent(&self, node: &mut BeamNode) {
        if node.left == 0 {
            return;
        }
        let min_width = (0..self.src.len())
            .filter(|&r| !node.packed[r])
            .map(|r| self.src[r].width)
            .min()
            .expect("node has remaining blocks");
        loop {
            let bottom = skyline::bottom_index(&node.skyline);
            if node.skyline[bottom].width < min_width {
                skyline::raise_bottom(&mut node.skyline, bottom);
                continue;
            }
            node.bl_index = bottom;
            break;
        }
    }

    /// Enumerates every (remaining block, rotation) that admits a placement
    /// on the parent's corner.
    fn branch(&self, parent_idx: usize, parent: &BeamNode) -> Vec<BranchNode> {
        let mut children = Vec::with_capacity(parent.left * 2);
        for r in (0..self.src.len()).filter(|&r| !parent.packed[r]) {
            for rotate in 0..2 {
                let (width, height) = if rotate == 0 {
                    (self.src[r].width, self.src[r].height)
                } else {
                    (self.src[r].height, self.src[r].width)
                };
                if let Some((area_score, x)) = skyline::score_bottom_left(
                    &parent.skyline,
                    parent.bl_index,
                    width,
                    height,
                    self.bin_width,
                ) {
                    let wire_score = self.score_wire(parent, r, x, width, height);
                    children.push(BranchNode {
                        parent_idx,
                        block: r,
                        width,
                        height,
                        x,
                        area_score,
                        wire_score,
                        local_eval: 0.0,
                        global_eval: f64::MAX,
                        look_ahead_eval: f64::MAX,
                    });
                }
            }
        }
        children
    }

    /// Mean Manhattan center distance from the candidate to the placed
    /// blocks it shares a net with; isolated candidates score infinity.
    fn score_wire(&self, parent: &BeamNode, block: usize, x: i32, width: i32, height: i32) -> f64 {
        let pin_x = x as f64 + width as f64 * 0.5;
        let pin_y = parent.skyline[parent.bl_index].y as f64 + height as f64 * 0.5;
        let mut wires = 0usize;
        let mut length = 0.0;
        for i in 0..self.src.len() {
            if parent.packed[i] && self.graph.connected(i, block) {
                let other = &parent.dst[i];
                let cx = other.x as f64 + other.width as f64 * 0.5;
                let cy = other.y as f64 + other.height as f64 * 0.5;
                wires += 1;
                length += (pin_x - cx).abs() + (pin_y - cy).abs();
            }
        }
        if wires == 0 {
            f64::INFINITY
        } else {
            length / wires as f64
        }
    }

    /// Blends per-parent ranks: position in the descending `area_score`
    /// order plus position in the ascending `wire_score` order.
    fn local_evaluation(children: &mut [BranchNode], alpha: f64, beta: f64) {
        let m = children.len();
        let mut area_rank: Vec<usize> = (0..m).collect();
        area_rank.sort_by_key(|&i| (-children[i].area_score, children[i].block));
        let mut wire_rank: Vec<usize> = (0..m).collect();
        wire_rank.sort_by(|&a, &b| {
            children[a]
                .wire_score
                .partial_cmp(&children[b].wire_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(children[a].block.cmp(&children[b].block))
        });
        let mut area_pos = vec![0usize; m];
        for (pos, &i) in area_rank.iter().enumerate() {
            area_pos[i] = pos;
        }
        let mut wire_pos = vec![0usize; m];
        for (pos, &i) in wire_rank.iter().enumerate() {
            wire_pos[i] = pos;
        }
        for (i, child) in children.iter_mut().enumerate() {
            child.local_eval = alpha * area_pos[i] as f64 + beta * wire_pos[i] as f64;
        }
    }

    /// Sorts ascending by `key` and shuffles the run of values tied with the
    /// element just inside the cut, so truncation picks ties at random.
    fn sort_with_tie_shuffle<F>(&self, children: &mut [BranchNode], cut: usize, key: F)
    where
        F: Fn(&BranchNode) -> f64,
    {
        children.sort_by(|a, b| {
            key(a)
                .partial_cmp(&key(b))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.block.cmp(&b.block))
        });
        if cut == 0 || cut >= children.len() {
            return;
        }
        let threshold = key(&children[cut - 1]);
        let lo = children
            .iter()
            .position(|c| ties(key(c), threshold))
            .unwrap_or(cut - 1);
        let hi = children
            .iter()
            .rposition(|c| ties(key(c), threshold))
            .map_or(cut, |i| i + 1);
        if hi - lo > 1 {
            let mut rng = self.rng.borrow_mut();
            children[lo..hi].shuffle(&mut *rng);
        }
    }

    /// Applies the action to `node`; returns the top edge of the placement.
    fn apply(&self, node: &mut BeamNode, block: usize, width: i32, height: i32, x: i32) -> i32 {
        let y = node.skyline[node.bl_index].y;
        node.dst[block] = Rect::new(block, x, y, width, height);
        node.packed[block] = true;
        node.left -= 1;
        skyline::insert(&mut node.skyline, node.bl_index, x, width, height);
        node.netwire.place(
            &self.ins.blocks()[block].net_ids,
            x as f64 + width as f64 * 0.5,
            y as f64 + height as f64 * 0.5,
        );
        y + height
    }

    /// Scores one filtered child with a single greedy completion: the
    /// objective is captured the first time the lowest skyline level reaches
    /// the envelope top recorded at entry (look-ahead), then the same
    /// construction runs on to the full layout (global). Every improving
    /// complete layout refreshes the packer's best solution.
    fn evaluate_child(
        &mut self,
        child: &mut BranchNode,
        tree: &[BeamNode],
        alpha: f64,
        beta: f64,
        wl_mode: &WireLengthMode,
        metric: &DistanceMetric,
    ) {
        let mut node = tree[child.parent_idx].clone();
        self.apply(&mut node, child.block, child.width, child.height, child.x);

        let stop_height = skyline::max_height(&node.skyline);
        let mut max_height = stop_height;
        let mut look_ahead: Option<f64> = None;
        while node.left > 0 {
            self.check_parent(&mut node);
            if look_ahead.is_none() && node.skyline[node.bl_index].y >= stop_height {
                let area = max_height as i64 * self.bin_width as i64;
                let eval = netwire::evaluate_tracked(
                    self.ins,
                    &self.graph,
                    &node.netwire,
                    &node.dst,
                    &node.packed,
                    wl_mode,
                    metric,
                );
                look_ahead = Some(objective(area, eval.dist, alpha, beta));
            }
            let remaining = (0..self.src.len()).filter(|&r| !node.packed[r]);
            let chosen =
                find_rect_bottom_left(&self.src, remaining, &node.skyline, node.bl_index, self.bin_width)
                    .expect("every remaining block must admit a placement");
            let top = self.apply(&mut node, chosen.block, chosen.width, chosen.height, chosen.x);
            max_height = max_height.max(top);
        }

        let area = max_height as i64 * self.bin_width as i64;
        let eval = netwire::evaluate_tracked(
            self.ins,
            &self.graph,
            &node.netwire,
            &node.dst,
            &node.packed,
            wl_mode,
            metric,
        );
        child.global_eval = objective(area, eval.dist, alpha, beta);
        self.best
            .offer(child.global_eval, area, eval.wirelength, &node.dst);
        // The look-ahead prefix ran out of blocks before reaching the stop
        // level: its state is the complete layout.
        child.look_ahead_eval = look_ahead.unwrap_or(child.global_eval);
    }

    /// Uniform pick among the children tied for the minimum global
    /// evaluation, by reservoir sampling.
    fn pick_min_global(&self, children: Vec<BranchNode>) -> Option<BranchNode> {
        let mut choice: Option<BranchNode> = None;
        let mut tied = 0usize;
        for child in children {
            match choice.as_ref().map(|c| c.global_eval) {
                None => {
                    choice = Some(child);
                    tied = 1;
                }
                Some(current_eval) => {
                    if improves(child.global_eval, current_eval) {
                        choice = Some(child);
                        tied = 1;
                    } else if ties(child.global_eval, current_eval) {
                        tied += 1;
                        if self.rng.borrow_mut().gen_range(0..tied) == 0 {
                            choice = Some(child);
                        }
                    }
                }
            }
        }
        choice
    }
}

impl FloorplanPacker for BeamSearcher<'_> {
    /// `iter` is the beam width for this pass.
    fn run(
        &mut self,
        iter: usize,
        alpha: f64,
        beta: f64,
        wl_mode: &WireLengthMode,
        metric: &DistanceMetric,
    ) {
        let beam_width = iter.max(1);
        let filter_width = 2 * beam_width;

        let mut tree = vec![self.root()];
        while tree[0].left > 0 {
            for parent in tree.iter_mut() {
                self.check_parent(parent);
            }

            let quota = (filter_width / tree.len()).max(1);
            let mut filter_children: Vec<BranchNode> = Vec::new();
            for parent_idx in 0..tree.len() {
                let mut children = self.branch(parent_idx, &tree[parent_idx]);
                if children.len() > quota {
                    Self::local_evaluation(&mut children, alpha, beta);
                    self.sort_with_tie_shuffle(&mut children, quota, |c| c.local_eval);
                    children.truncate(quota);
                }
                filter_children.extend(children);
            }

            for child in filter_children.iter_mut() {
                self.evaluate_child(child, &tree, alpha, beta, wl_mode, metric);
            }

            let selected: Vec<BranchNode> = if beam_width == 1 {
                self.pick_min_global(filter_children).into_iter().collect()
            } else if filter_children.len() > beam_width {
                let global_take = beam_width / 2;
                let ahead_take = beam_width - global_take;
                self.sort_with_tie_shuffle(&mut filter_children, global_take, |c| c.global_eval);
                let mut selected: Vec<BranchNode> =
                    filter_children.drain(..global_take).collect();
                let ahead_take = ahead_take.min(filter_children.len());
                self.sort_with_tie_shuffle(&mut filter_children, ahead_take, |c| c.look_ahead_eval);
                selected.extend(filter_children.drain(..ahead_take));
                selected
            } else {
                filter_children
            };

            let mut new_tree = Vec::with_capacity(selected.len());
            for child in &selected {
                let mut node = tree[child.parent_idx].clone();
                self.apply(&mut node, child.block, child.width, child.height, child.x);
                new_tree.push(node);
            }
            tree = new_tree;
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
