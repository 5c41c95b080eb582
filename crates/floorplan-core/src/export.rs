//! Solution artefacts: `.fp` placement files, the append-mode CSV result
//! log, and an HTML/SVG rendering of a placement.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use crate::config::FloorplanConfig;
use crate::error::Result;
use crate::instance::Instance;
use crate::model::Rect;
use crate::selecter::Incumbent;

/// Writes the placement: one `<name> x y` line per block, a blank line,
/// then every terminal.
pub fn write_fp(path: &Path, ins: &Instance, dst: &[Rect]) -> Result<()> {
    let mut out = File::create(path)?;
    for r in dst {
        writeln!(out, "{} {} {}", ins.blocks()[r.id].name, r.x, r.y)?;
    }
    writeln!(out)?;
    for t in ins.terminals() {
        writeln!(out, "{} {} {}", t.name, t.x, t.y)?;
    }
    Ok(())
}

const CSV_HEADER: &str = "Instance,Alpha,Area,FillRatio,WHRatio,\
Beta,WireLength,Objective,CheckObj,\
Duration,Iteration,RandomSeed,\
LevelFloorplanPacker,LevelWireLength,LevelObjDist";

/// Appends one result row to the benchmark CSV, writing the header first
/// when the file is new or empty.
pub fn append_csv_log(
    path: &Path,
    ins: &Instance,
    cfg: &FloorplanConfig,
    incumbent: &Incumbent,
    check_ok: bool,
    seed: u64,
) -> Result<()> {
    let mut out = OpenOptions::new().create(true).append(true).open(path)?;
    if out.metadata()?.len() == 0 {
        writeln!(out, "{}", CSV_HEADER)?;
    }
    writeln!(
        out,
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        ins.name(),
        cfg.alpha,
        incumbent.area,
        incumbent.fill_ratio,
        incumbent.wh_ratio,
        cfg.beta,
        incumbent.wirelength,
        incumbent.objective,
        u8::from(check_ok),
        incumbent.duration,
        incumbent.iteration,
        seed,
        cfg.level_asa_fbp,
        cfg.level_fbp_wl,
        cfg.level_fbp_dist,
    )?;
    Ok(())
}

/// Serializes a run as a JSON object `{ instance, config, solution }`.
/// Suitable for generic tooling and simple consumption.
pub fn solution_report(
    ins: &Instance,
    cfg: &FloorplanConfig,
    incumbent: &Incumbent,
    check_ok: bool,
    seed: u64,
) -> Value {
    let placements: Vec<Value> = incumbent
        .dst
        .iter()
        .map(|r| {
            json!({
                "name": ins.blocks()[r.id].name,
                "x": r.x,
                "y": r.y,
                "w": r.width,
                "h": r.height,
            })
        })
        .collect();
    json!({
        "instance": {
            "name": ins.name(),
            "blocks": ins.block_count(),
            "terminals": ins.terminals().len(),
            "nets": ins.net_count(),
            "total_area": ins.total_area(),
            "outline": [ins.fixed_width(), ins.fixed_height()],
        },
        "config": serde_json::to_value(cfg).unwrap_or(Value::Null),
        "random_seed": seed,
        "solution": {
            "objective": incumbent.objective,
            "area": incumbent.area,
            "wirelength": incumbent.wirelength,
            "fill_ratio": incumbent.fill_ratio,
            "wh_ratio": incumbent.wh_ratio,
            "duration": incumbent.duration,
            "iteration": incumbent.iteration,
            "check": check_ok,
            "placements": placements,
        },
    })
}

const CANVAS: f64 = 800.0;

/// Minimal SVG-in-HTML renderer for placements.
pub struct HtmlDrawer {
    body: String,
    wx: f64,
    hx: f64,
    rng: StdRng,
}

impl HtmlDrawer {
    /// `width`/`height` define the drawn coordinate space; the canvas is
    /// scaled to 800x800.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            body: String::new(),
            wx: CANVAS / width.max(1.0),
            hx: CANVAS / height.max(1.0),
            rng: StdRng::from_entropy(),
        }
    }

    fn next_color(&mut self) -> String {
        format!("{:06X}", self.rng.gen_range(0u32..0x1000000))
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, label: &str) {
        let color = self.next_color();
        let (x, y, w, h) = (x * self.wx, y * self.hx, w * self.wx, h * self.hx);
        let _ = writeln!(
            self.body,
            "      <rect x='{x}' y='{y}' width='{w}' height='{h}' style='fill:#{color}; stroke:black; stroke-width:1' fill-opacity='0.6'/>"
        );
        let _ = writeln!(
            self.body,
            "      <text x='{}' y='{}' text-anchor='middle' alignment-baseline='middle'>{}</text>",
            x + w / 2.0,
            y + h / 2.0,
            label
        );
    }

    pub fn circle(&mut self, x: f64, y: f64) {
        let _ = writeln!(
            self.body,
            "      <circle cx='{}' cy='{}' r='3' style='fill:black'/>",
            x * self.wx,
            y * self.hx
        );
    }

    pub fn wire(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: &str) {
        let _ = writeln!(
            self.body,
            "      <line x1='{}' y1='{}' x2='{}' y2='{}' style='stroke:#{}; stroke-width:1'/>",
            x1 * self.wx,
            y1 * self.hx,
            x2 * self.wx,
            y2 * self.hx,
            color
        );
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = File::create(path)?;
        writeln!(out, "<!DOCTYPE html>")?;
        writeln!(out, "<html>")?;
        writeln!(out, "  <head>")?;
        writeln!(out, "    <meta charset='utf-8'>")?;
        writeln!(out, "    <title>Floorplan</title>")?;
        writeln!(out, "  </head>")?;
        writeln!(out, "  <body>")?;
        writeln!(
            out,
            "    <svg width='{CANVAS}' height='{CANVAS}' viewBox='-50 -50 {} {}'>",
            CANVAS + 100.0,
            CANVAS + 100.0
        )?;
        out.write_all(self.body.as_bytes())?;
        writeln!(out, "    </svg>")?;
        writeln!(out, "  </body>")?;
        writeln!(out, "</html>")?;
        Ok(())
    }
}

/// Renders a placement with its terminals and, optionally, all pairwise
/// wires of every net.
pub fn draw_placement(path: &Path, ins: &Instance, dst: &[Rect], draw_wires: bool) -> Result<()> {
    let mut extent_w = ins.fixed_width().max(1) as f64;
    let mut extent_h = ins.fixed_height().max(1) as f64;
    for r in dst {
        extent_w = extent_w.max((r.x + r.width) as f64);
        extent_h = extent_h.max((r.y + r.height) as f64);
    }
    let mut drawer = HtmlDrawer::new(extent_w, extent_h);
    for r in dst {
        drawer.rect(
            r.x as f64,
            r.y as f64,
            r.width as f64,
            r.height as f64,
            &ins.blocks()[r.id].name,
        );
    }
    for t in ins.terminals() {
        drawer.circle(t.x as f64, t.y as f64);
    }
    if draw_wires {
        let centers: Vec<(f64, f64)> = {
            let mut centers = vec![(0.0, 0.0); dst.len()];
            for r in dst {
                centers[r.id] = (
                    r.x as f64 + r.width as f64 * 0.5,
                    r.y as f64 + r.height as f64 * 0.5,
                );
            }
            centers
        };
        for net in ins.nets() {
            let color = drawer.next_color();
            for i in 0..net.blocks.len() {
                for j in i + 1..net.blocks.len() {
                    let a = centers[net.blocks[i]];
                    let b = centers[net.blocks[j]];
                    drawer.wire(a.0, a.1, b.0, b.1, &color);
                }
            }
        }
    }
    drawer.save(path)
}
