use serde::{Deserialize, Serialize};
use tracing::warn;

/// Hard rectangular module to be placed; rotatable by 90 degrees.
/// `x,y` hold the reference placement from the `.pl` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub area: i64,
    pub x: i32,
    pub y: i32,
    /// Nets this block belongs to.
    pub net_ids: Vec<usize>,
}

/// Fixed pin at a pre-assigned coordinate; not a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Terminal {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub net_ids: Vec<usize>,
}

/// Set of blocks/terminals that must be wired together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Net {
    pub degree: usize,
    pub blocks: Vec<usize>,
    pub terminals: Vec<usize>,
}

/// Placement record for one block. `height == 0` means "no placement".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub id: usize,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(id: usize, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    pub fn placed(&self) -> bool {
        self.height != 0
    }

    /// True if `a` and `b` do not overlap. Degenerate rectangles never overlap.
    pub fn disjoint(a: &Rect, b: &Rect) -> bool {
        if a.width == 0 || a.height == 0 || b.width == 0 || b.height == 0 {
            return true;
        }
        a.x + a.width <= b.x
            || b.x + b.width <= a.x
            || a.y + a.height <= b.y
            || b.y + b.height <= a.y
    }
}

/// Grow-only collection of pairwise-disjoint rectangles.
#[derive(Debug, Default, Clone)]
pub struct DisjointRects {
    rects: Vec<Rect>,
}

impl DisjointRects {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            rects: Vec::with_capacity(cap),
        }
    }

    /// Adds `r` iff it is disjoint from everything already added.
    pub fn add(&mut self, r: Rect) -> bool {
        if r.width == 0 || r.height == 0 {
            return true;
        }
        if !self.disjoint(&r) {
            return false;
        }
        self.rects.push(r);
        true
    }

    pub fn disjoint(&self, r: &Rect) -> bool {
        self.rects.iter().all(|other| Rect::disjoint(other, r))
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }
}

/// Final legality check: every block keeps its input `{min,max}(w,h)` and no
/// two placements overlap. `dst` is indexed by block id.
pub fn verify_placement(blocks: &[Block], dst: &[Rect]) -> bool {
    if dst.len() != blocks.len() {
        warn!(
            placed = dst.len(),
            expected = blocks.len(),
            "placement is incomplete"
        );
        return false;
    }
    let mut disjoint = DisjointRects::with_capacity(dst.len());
    for (i, r) in dst.iter().enumerate() {
        let b = &blocks[i];
        if r.width.min(r.height) != b.width.min(b.height)
            || r.width.max(r.height) != b.width.max(b.height)
        {
            warn!(id = i, name = %b.name, "block has wrong width/height");
            return false;
        }
        if !disjoint.add(*r) {
            warn!(id = i, name = %b.name, "block overlaps a previous placement");
            return false;
        }
    }
    true
}
