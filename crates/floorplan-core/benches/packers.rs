use std::cell::RefCell;
use std::io::Cursor;
use std::path::Path;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion};
use floorplan_core::config::{DistanceMetric, WireLengthMode};
use floorplan_core::netwire::Adjacency;
use floorplan_core::packer::beam::BeamSearcher;
use floorplan_core::packer::rls::RandomLocalSearcher;
use floorplan_core::packer::FloorplanPacker;
use floorplan_core::Instance;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn synthetic_instance(n: usize, seed: u64) -> Instance {
    let mut rng = StdRng::seed_from_u64(seed);
    let dims: Vec<(i32, i32)> = (0..n)
        .map(|_| (rng.gen_range(1..=12), rng.gen_range(1..=12)))
        .collect();

    let mut blocks_txt = String::from("\n\n\n\n\n\n");
    blocks_txt.push_str(&format!("NumHardRectilinearBlocks : {n}\n"));
    blocks_txt.push_str("NumTerminals : 0\n");
    for (i, (w, h)) in dims.iter().enumerate() {
        blocks_txt.push_str(&format!(
            "b{i} hardrectilinear 4 (0, 0) (0, {h}) ({w}, {h}) ({w}, 0)\n"
        ));
    }
    // A chain of 2-pin nets keeps the wirelength term busy.
    let mut nets_txt = String::from("\n\n\n\n\n");
    nets_txt.push_str(&format!("NumNets : {}\nNumPins : {}\n", n - 1, 2 * (n - 1)));
    for i in 0..n - 1 {
        nets_txt.push_str(&format!("NetDegree : 2\nb{}\nb{}\n", i, i + 1));
    }
    let mut pl_txt = String::from("\n\n\n\n\n");
    for i in 0..n {
        pl_txt.push_str(&format!("b{i} 0 0\n"));
    }
    Instance::from_readers(
        "bench",
        Cursor::new(blocks_txt),
        Path::new("bench.blocks"),
        Cursor::new(nets_txt),
        Path::new("bench.nets"),
        Cursor::new(pl_txt),
        Path::new("bench.pl"),
    )
    .expect("synthetic instance")
}

fn bench_packers(c: &mut Criterion) {
    let ins = synthetic_instance(40, 0xf10);
    let bin_width = (ins.total_area() as f64).sqrt().ceil() as i32;

    c.bench_function("rls_pass_40", |b| {
        b.iter(|| {
            let graph = Rc::new(Adjacency::from_instance(&ins));
            let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(1)));
            let mut packer = RandomLocalSearcher::new(&ins, ins.rects(), bin_width, graph, rng);
            packer.run(
                8,
                1.0,
                1.0,
                &WireLengthMode::BlockOnly,
                &DistanceMetric::WireLengthDist,
            );
            packer.objective()
        })
    });

    c.bench_function("beam_pass_40", |b| {
        b.iter(|| {
            let graph = Rc::new(Adjacency::from_instance(&ins));
            let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(1)));
            let mut packer = BeamSearcher::new(&ins, ins.rects(), bin_width, graph, rng);
            packer.run(
                2,
                1.0,
                1.0,
                &WireLengthMode::BlockOnly,
                &DistanceMetric::WireLengthDist,
            );
            packer.objective()
        })
    });
}

criterion_group!(benches, bench_packers);
criterion_main!(benches);
