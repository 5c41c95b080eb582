use std::io::Cursor;
use std::path::Path;

use floorplan_core::config::{CandidateWidthGen, FloorplanConfig, PackerKind};
use floorplan_core::error::FloorplanError;
use floorplan_core::selecter::candidate_widths;
use floorplan_core::{AdaptiveSelecter, Instance};

fn make_instance(blocks: &[(i32, i32)], nets: &[&[usize]], outline: (i32, i32)) -> Instance {
    let mut blocks_txt = String::from("\n\n\n\n\n\n");
    blocks_txt.push_str(&format!("NumHardRectilinearBlocks : {}\n", blocks.len()));
    blocks_txt.push_str("NumTerminals : 0\n");
    for (i, (w, h)) in blocks.iter().enumerate() {
        blocks_txt.push_str(&format!(
            "b{i} hardrectilinear 4 (0, 0) (0, {h}) ({w}, {h}) ({w}, 0)\n"
        ));
    }
    let pins: usize = nets.iter().map(|n| n.len()).sum();
    let mut nets_txt = String::from("\n\n\n\n\n");
    nets_txt.push_str(&format!("NumNets : {}\nNumPins : {pins}\n", nets.len()));
    for net in nets {
        nets_txt.push_str(&format!("NetDegree : {}\n", net.len()));
        for &b in *net {
            nets_txt.push_str(&format!("b{b}\n"));
        }
    }
    let mut pl_txt = String::from("\n\n\n\n\n");
    for i in 0..blocks.len() {
        let (x, y) = if i == 0 { outline } else { (0, 0) };
        pl_txt.push_str(&format!("b{i} {x} {y}\n"));
    }
    Instance::from_readers(
        "test",
        Cursor::new(blocks_txt),
        Path::new("test.blocks"),
        Cursor::new(nets_txt),
        Path::new("test.nets"),
        Cursor::new(pl_txt),
        Path::new("test.pl"),
    )
    .expect("synthetic instance")
}

#[test]
fn sqrt_producer_brackets_the_area() {
    // Total area 100, tallest block 6, scales 0.8/1.2: W = {8..12}.
    let ins = make_instance(
        &[(6, 6), (6, 6), (4, 6), (2, 2)],
        &[&[0, 1], &[2, 3]],
        (100, 100),
    );
    assert_eq!(ins.total_area(), 100);
    let cfg = FloorplanConfig {
        lb_scale: 0.8,
        ub_scale: 1.2,
        level_asa_cw: CandidateWidthGen::Sqrt,
        ..Default::default()
    };
    assert_eq!(candidate_widths(&ins, &cfg), vec![8, 9, 10, 11, 12]);
}

#[test]
fn sqrt_lower_bound_is_clamped_by_the_tallest_block() {
    let ins = make_instance(&[(1, 20), (5, 5), (5, 5)], &[&[0, 1, 2]], (100, 100));
    let cfg = FloorplanConfig {
        level_asa_cw: CandidateWidthGen::Sqrt,
        ..Default::default()
    };
    let widths = candidate_widths(&ins, &cfg);
    assert_eq!(widths[0], 20);
}

#[test]
fn interval_producer_spans_heights() {
    // Canonical heights are 3 and 4: W = {4..7}.
    let ins = make_instance(&[(2, 3), (3, 4)], &[&[0, 1]], (100, 100));
    let cfg = FloorplanConfig {
        level_asa_cw: CandidateWidthGen::Interval,
        ..Default::default()
    };
    assert_eq!(candidate_widths(&ins, &cfg), vec![4, 5, 6, 7]);
}

#[test]
fn comb_short_sums_subset_widths_within_bounds() {
    let ins = make_instance(
        &[(3, 4), (3, 4), (3, 4), (2, 4), (4, 4)],
        &[&[0, 1, 2, 3, 4]],
        (60, 60),
    );
    let cfg = FloorplanConfig {
        level_asa_cw: CandidateWidthGen::CombShort,
        ..Default::default()
    };
    let widths = candidate_widths(&ins, &cfg);
    // Bounds: [max height, floor(1.05 * sqrt(60))] = [4, 8].
    assert!(widths.iter().all(|&w| (4..=8).contains(&w)));
    // 3+3+2 = 8 is a reachable subset sum.
    assert!(widths.contains(&8));
}

#[test]
fn search_produces_a_legal_incumbent() {
    let ins = make_instance(
        &[(2, 3), (4, 1), (3, 3), (1, 5), (2, 2), (3, 1)],
        &[&[0, 1, 2], &[2, 3, 4], &[4, 5]],
        (100, 100),
    );
    let cfg = FloorplanConfig {
        random_seed: Some(42),
        alpha: 1.0,
        beta: 0.0,
        ub_time: 0.3,
        ub_iter: 64,
        level_asa_cw: CandidateWidthGen::Sqrt,
        ..Default::default()
    };
    let mut asa = AdaptiveSelecter::new(&ins, &cfg);
    let incumbent = asa.run().expect("search").clone();
    assert!(incumbent.is_set());
    assert!(asa.check_incumbent());
    assert_eq!(asa.seed(), 42);
    // With beta = 0 the objective is exactly the envelope area.
    assert_eq!(incumbent.objective, incumbent.area as f64);
    assert!(incumbent.fill_ratio > 0.0 && incumbent.fill_ratio <= 1.0);
    assert!(incumbent.wh_ratio >= 1.0);
    assert!(incumbent.iteration >= 1);
}

#[test]
fn beam_search_backend_also_converges() {
    let ins = make_instance(
        &[(2, 2), (2, 2), (2, 2), (2, 2)],
        &[&[0, 1, 2, 3]],
        (100, 100),
    );
    let cfg = FloorplanConfig {
        random_seed: Some(7),
        alpha: 1.0,
        beta: 0.0,
        ub_time: 0.2,
        ub_iter: 8,
        level_asa_cw: CandidateWidthGen::Sqrt,
        level_asa_fbp: PackerKind::BeamSearch,
        ..Default::default()
    };
    let mut asa = AdaptiveSelecter::new(&ins, &cfg);
    asa.run().expect("search");
    assert!(asa.check_incumbent());
    // The 4x4 tiling is optimal and reachable at width 4.
    assert_eq!(asa.incumbent().area, 16);
}

#[test]
fn oversubscribed_outline_reports_check_zero() {
    // Four 2x2 blocks cannot fit a 3x3 outline at any width: no incumbent,
    // and the final check fails.
    let ins = make_instance(
        &[(2, 2), (2, 2), (2, 2), (2, 2)],
        &[&[0, 1, 2, 3]],
        (3, 3),
    );
    let cfg = FloorplanConfig {
        random_seed: Some(9),
        alpha: 1.0,
        beta: 0.0,
        ub_time: 0.2,
        ub_iter: 8,
        level_asa_cw: CandidateWidthGen::Sqrt,
        ..Default::default()
    };
    let mut asa = AdaptiveSelecter::new(&ins, &cfg);
    asa.run().expect("search still completes");
    assert!(!asa.incumbent().is_set());
    assert!(!asa.check_incumbent());
}

#[test]
fn empty_instance_is_rejected() {
    let ins = make_instance(&[], &[], (0, 0));
    let cfg = FloorplanConfig {
        ub_time: 0.1,
        ..Default::default()
    };
    let mut asa = AdaptiveSelecter::new(&ins, &cfg);
    assert!(matches!(asa.run(), Err(FloorplanError::Empty)));
}
