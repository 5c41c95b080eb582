//! Half-perimeter wire-length bookkeeping: an incremental per-net bounding
//! box tracker plus the batch evaluation used by the objective.

use crate::config::{DistanceMetric, WireLengthMode};
use crate::instance::Instance;
use crate::model::Rect;

/// Bounding box of one net over the centers of its placed members.
#[derive(Debug, Clone, Copy)]
pub struct NetwireNode {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub hpwl: f64,
}

impl NetwireNode {
    /// True once at least one pin has been placed into this net's box.
    pub fn touched(&self) -> bool {
        self.min_x <= self.max_x
    }
}

impl Default for NetwireNode {
    fn default() -> Self {
        Self {
            min_x: f64::MAX,
            min_y: f64::MAX,
            max_x: 0.0,
            max_y: 0.0,
            hpwl: 0.0,
        }
    }
}

/// Incrementally maintained per-net boxes, one per net of the instance.
#[derive(Debug, Clone)]
pub struct Netwire {
    nodes: Vec<NetwireNode>,
}

impl Netwire {
    pub fn new(net_count: usize) -> Self {
        Self {
            nodes: vec![NetwireNode::default(); net_count],
        }
    }

    pub fn reset(&mut self) {
        self.nodes.fill(NetwireNode::default());
    }

    pub fn node(&self, nid: usize) -> &NetwireNode {
        &self.nodes[nid]
    }

    /// Extends every net in `net_ids` by a pin at `(pin_x, pin_y)`.
    pub fn place(&mut self, net_ids: &[usize], pin_x: f64, pin_y: f64) {
        for &nid in net_ids {
            let node = &mut self.nodes[nid];
            node.max_x = node.max_x.max(pin_x);
            node.min_x = node.min_x.min(pin_x);
            node.max_y = node.max_y.max(pin_y);
            node.min_y = node.min_y.min(pin_y);
            node.hpwl = (node.max_x - node.min_x + node.max_y - node.min_y).max(0.0);
        }
    }
}

/// Block-to-block connectivity recovered from the netlist; entry `[a][b]`
/// counts the nets shared by blocks `a` and `b`.
#[derive(Debug, Clone)]
pub struct Adjacency {
    weights: Vec<Vec<u32>>,
}

impl Adjacency {
    pub fn from_instance(ins: &Instance) -> Self {
        let n = ins.block_count();
        let mut weights = vec![vec![0u32; n]; n];
        for net in ins.nets() {
            for i in 0..net.blocks.len() {
                for j in i + 1..net.blocks.len() {
                    let a = net.blocks[i];
                    let b = net.blocks[j];
                    weights[a][b] += 1;
                    weights[b][a] += 1;
                }
            }
        }
        Self { weights }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn connected(&self, a: usize, b: usize) -> bool {
        self.weights[a][b] > 0
    }
}

/// Result of a wirelength evaluation: total HPWL plus the configured
/// distance term of the objective.
#[derive(Debug, Clone, Copy)]
pub struct WirelengthEval {
    pub wirelength: f64,
    pub dist: f64,
}

/// Computes total HPWL and the distance metric over the currently placed
/// blocks by rebuilding every net box from scratch. `dst` and `packed` are
/// indexed by block id. Only nets touched by at least one placed block
/// contribute; pins sit at block centers, terminals at their fixed
/// coordinates.
pub fn evaluate(
    ins: &Instance,
    graph: &Adjacency,
    dst: &[Rect],
    packed: &[bool],
    wl_mode: &WireLengthMode,
    metric: &DistanceMetric,
) -> WirelengthEval {
    let pins = block_centers(dst, packed);
    let mut net_touched = vec![false; ins.net_count()];
    for (i, block) in ins.blocks().iter().enumerate() {
        if packed[i] {
            for &nid in &block.net_ids {
                net_touched[nid] = true;
            }
        }
    }

    let mut wirelength = 0.0;
    let mut sqr_hpwl = 0.0;
    for (nid, net) in ins.nets().iter().enumerate() {
        if !net_touched[nid] {
            continue;
        }
        let mut min_x = f64::MAX;
        let mut max_x = 0.0f64;
        let mut min_y = f64::MAX;
        let mut max_y = 0.0f64;
        for &b in &net.blocks {
            if !packed[b] {
                continue;
            }
            min_x = min_x.min(pins[b].0);
            max_x = max_x.max(pins[b].0);
            min_y = min_y.min(pins[b].1);
            max_y = max_y.max(pins[b].1);
        }
        if matches!(wl_mode, WireLengthMode::BlockAndTerminal) {
            for &t in &net.terminals {
                let term = &ins.terminals()[t];
                min_x = min_x.min(term.x as f64);
                max_x = max_x.max(term.x as f64);
                min_y = min_y.min(term.y as f64);
                max_y = max_y.max(term.y as f64);
            }
        }
        let hpwl = (max_x - min_x) + (max_y - min_y);
        wirelength += hpwl;
        sqr_hpwl += hpwl * hpwl;
    }

    let dist = match metric {
        DistanceMetric::WireLengthDist => wirelength,
        DistanceMetric::SqrHpwlDist => sqr_hpwl,
        DistanceMetric::SqrEuclideanDist => sqr_euclidean(graph, &pins, packed),
        DistanceMetric::SqrManhattanDist => sqr_manhattan(graph, &pins, packed),
    };

    WirelengthEval { wirelength, dist }
}

/// Same result as [`evaluate`], but reads the per-net boxes from an
/// incrementally maintained [`Netwire`] instead of rebuilding them, so the
/// per-net cost is independent of how many blocks are placed. The tracker
/// must have been fed exactly the pins of the `packed` blocks.
pub fn evaluate_tracked(
    ins: &Instance,
    graph: &Adjacency,
    netwire: &Netwire,
    dst: &[Rect],
    packed: &[bool],
    wl_mode: &WireLengthMode,
    metric: &DistanceMetric,
) -> WirelengthEval {
    let mut wirelength = 0.0;
    let mut sqr_hpwl = 0.0;
    for (nid, net) in ins.nets().iter().enumerate() {
        let node = netwire.node(nid);
        if !node.touched() {
            continue;
        }
        let hpwl = match wl_mode {
            WireLengthMode::BlockOnly => node.hpwl,
            WireLengthMode::BlockAndTerminal => {
                let mut min_x = node.min_x;
                let mut max_x = node.max_x;
                let mut min_y = node.min_y;
                let mut max_y = node.max_y;
                for &t in &net.terminals {
                    let term = &ins.terminals()[t];
                    min_x = min_x.min(term.x as f64);
                    max_x = max_x.max(term.x as f64);
                    min_y = min_y.min(term.y as f64);
                    max_y = max_y.max(term.y as f64);
                }
                (max_x - min_x) + (max_y - min_y)
            }
        };
        wirelength += hpwl;
        sqr_hpwl += hpwl * hpwl;
    }

    let dist = match metric {
        DistanceMetric::WireLengthDist => wirelength,
        DistanceMetric::SqrHpwlDist => sqr_hpwl,
        DistanceMetric::SqrEuclideanDist => {
            sqr_euclidean(graph, &block_centers(dst, packed), packed)
        }
        DistanceMetric::SqrManhattanDist => {
            sqr_manhattan(graph, &block_centers(dst, packed), packed)
        }
    };

    WirelengthEval { wirelength, dist }
}

fn block_centers(dst: &[Rect], packed: &[bool]) -> Vec<(f64, f64)> {
    let mut pins = vec![(0.0f64, 0.0f64); dst.len()];
    for (i, r) in dst.iter().enumerate() {
        if packed[i] {
            pins[i] = (
                r.x as f64 + r.width as f64 * 0.5,
                r.y as f64 + r.height as f64 * 0.5,
            );
        }
    }
    pins
}

fn sqr_euclidean(graph: &Adjacency, pins: &[(f64, f64)], packed: &[bool]) -> f64 {
    let mut dist = 0.0;
    for i in 0..graph.len() {
        for j in i + 1..graph.len() {
            if packed[i] && packed[j] && graph.connected(i, j) {
                let dx = pins[i].0 - pins[j].0;
                let dy = pins[i].1 - pins[j].1;
                dist += dx * dx + dy * dy;
            }
        }
    }
    dist
}

fn sqr_manhattan(graph: &Adjacency, pins: &[(f64, f64)], packed: &[bool]) -> f64 {
    let mut dist = 0.0;
    for i in 0..graph.len() {
        for j in i + 1..graph.len() {
            if packed[i] && packed[j] && graph.connected(i, j) {
                let dx = (pins[i].0 - pins[j].0).abs();
                let dy = (pins[i].1 - pins[j].1).abs();
                dist += (dx + dy) * (dx + dy);
            }
        }
    }
    dist
}
