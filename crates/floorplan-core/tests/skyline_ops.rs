use floorplan_core::skyline::{
    self, bottom_index, covered_width, is_well_formed, max_height, new_skyline, raise_bottom,
    score_bottom_left, space_at, SkylineNode, INF,
};

fn node(x: i32, y: i32, width: i32) -> SkylineNode {
    SkylineNode { x, y, width }
}

#[test]
fn space_uses_inf_walls_at_the_ends() {
    let sky = vec![node(0, 3, 2), node(2, 0, 3), node(5, 2, 4)];
    let space = space_at(&sky, 1);
    assert_eq!(space.hl, 3);
    assert_eq!(space.hr, 2);

    let left_end = space_at(&sky, 0);
    assert_eq!(left_end.hl, INF - 3);
    assert_eq!(left_end.hr, -3);

    let right_end = space_at(&sky, 2);
    assert_eq!(right_end.hl, -2);
    assert_eq!(right_end.hr, INF - 2);
}

#[test]
fn score_table_when_left_wall_is_taller() {
    // Middle segment: width 3, hl 4, hr 2.
    let sky = vec![node(0, 4, 2), node(2, 0, 3), node(5, 2, 4)];
    let bin = 9;
    assert_eq!(score_bottom_left(&sky, 1, 3, 4, bin), Some((7, 2)));
    assert_eq!(score_bottom_left(&sky, 1, 3, 2, bin), Some((6, 2)));
    assert_eq!(score_bottom_left(&sky, 1, 3, 5, bin), Some((5, 2)));
    assert_eq!(score_bottom_left(&sky, 1, 2, 4, bin), Some((4, 2)));
    assert_eq!(score_bottom_left(&sky, 1, 3, 3, bin), Some((3, 2)));
    // Score 2 goes right-justified.
    assert_eq!(score_bottom_left(&sky, 1, 2, 2, bin), Some((2, 3)));
    assert_eq!(score_bottom_left(&sky, 1, 3, 1, bin), Some((1, 2)));
    assert_eq!(score_bottom_left(&sky, 1, 2, 1, bin), Some((0, 2)));
    // Too wide for the segment.
    assert_eq!(score_bottom_left(&sky, 1, 4, 1, bin), None);
}

#[test]
fn score_table_when_right_wall_is_taller() {
    // Middle segment: width 3, hl 2, hr 4.
    let sky = vec![node(0, 2, 2), node(2, 0, 3), node(5, 4, 4)];
    let bin = 9;
    assert_eq!(score_bottom_left(&sky, 1, 3, 4, bin), Some((7, 2)));
    assert_eq!(score_bottom_left(&sky, 1, 3, 2, bin), Some((6, 2)));
    // Scores 4 and 0 go right-justified in the mirrored branch.
    assert_eq!(score_bottom_left(&sky, 1, 2, 4, bin), Some((4, 3)));
    assert_eq!(score_bottom_left(&sky, 1, 2, 2, bin), Some((2, 2)));
    assert_eq!(score_bottom_left(&sky, 1, 2, 1, bin), Some((0, 3)));
}

#[test]
fn insert_left_splits_the_segment() {
    let mut sky = new_skyline(4);
    skyline::insert(&mut sky, 0, 0, 2, 3);
    assert_eq!(sky, vec![node(0, 3, 2), node(2, 0, 2)]);
    assert!(is_well_formed(&sky));
    assert_eq!(covered_width(&sky), 4);
}

#[test]
fn insert_right_splits_the_segment() {
    let mut sky = vec![node(0, 3, 2), node(2, 0, 2)];
    skyline::insert(&mut sky, 1, 3, 1, 2);
    assert_eq!(sky, vec![node(0, 3, 2), node(2, 0, 1), node(3, 2, 1)]);
    assert!(is_well_formed(&sky));
    assert_eq!(covered_width(&sky), 4);
}

#[test]
fn insert_merges_equal_levels() {
    let mut sky = vec![node(0, 2, 2), node(2, 0, 2)];
    skyline::insert(&mut sky, 1, 2, 2, 2);
    assert_eq!(sky, vec![node(0, 2, 4)]);
}

#[test]
fn single_block_yields_single_segment() {
    // One 2x3 block on a width-2 bin: one segment at y = h spanning the bin.
    let mut sky = new_skyline(2);
    let (score, x) = score_bottom_left(&sky, 0, 2, 3, 2).expect("fits");
    assert_eq!(score, 1);
    assert_eq!(x, 0);
    skyline::insert(&mut sky, 0, x, 2, 3);
    assert_eq!(sky, vec![node(0, 3, 2)]);
    assert_eq!(max_height(&sky), 3);
}

#[test]
fn raise_bottom_fills_the_pit() {
    let mut sky = vec![node(0, 5, 2), node(2, 0, 3), node(5, 2, 4)];
    assert_eq!(bottom_index(&sky), 1);
    raise_bottom(&mut sky, 1);
    assert_eq!(sky, vec![node(0, 5, 2), node(2, 2, 7)]);
    assert!(is_well_formed(&sky));
    assert_eq!(covered_width(&sky), 9);
}

#[test]
fn raise_bottom_is_idempotent_on_flat_neighbors() {
    let mut sky = vec![node(0, 4, 1), node(1, 1, 2), node(3, 4, 3)];
    raise_bottom(&mut sky, 1);
    assert_eq!(sky, vec![node(0, 4, 6)]);
}
