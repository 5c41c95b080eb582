//! Core library for fixed-outline floorplanning of hard rectangular blocks.
//!
//! - Packers: skyline-based greedy construction driven by random local search
//!   over block orderings, or by beam search with local/global/look-ahead
//!   evaluation
//! - Outer loop: an adaptive selecter maintaining a bandit population of
//!   candidate bin widths under a wall-clock budget
//! - Instance model with MCNC/GSRC `.blocks`/`.nets`/`.pl` parsers; `.fp`,
//!   CSV and HTML/SVG exporters
//!
//! Quick example:
//! ```ignore
//! use std::path::Path;
//! use floorplan_core::{AdaptiveSelecter, FloorplanConfig, Instance};
//! # fn main() -> anyhow::Result<()> {
//! let ins = Instance::load(Path::new("benchmarks/GSRC/n10.blocks"))?;
//! let cfg = FloorplanConfig {
//!     ub_time: 10.0,
//!     ..Default::default()
//! };
//! let mut asa = AdaptiveSelecter::new(&ins, &cfg);
//! let incumbent = asa.run()?;
//! println!("area: {}, hpwl: {}", incumbent.area, incumbent.wirelength);
//! # Ok(()) }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod instance;
pub mod model;
pub mod netwire;
pub mod packer;
pub mod selecter;
pub mod skyline;

pub use config::*;
pub use error::*;
pub use instance::*;
pub use model::*;
pub use selecter::*;

/// Convenience prelude for common types and functions.
/// Importing `floorplan_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{
        CandidateWidthGen, DistanceMetric, FloorplanConfig, FloorplanConfigBuilder, PackerKind,
        WireLengthMode,
    };
    pub use crate::error::{FloorplanError, Result};
    pub use crate::export::{append_csv_log, draw_placement, solution_report, write_fp};
    pub use crate::instance::Instance;
    pub use crate::model::{verify_placement, Block, Net, Rect, Terminal};
    pub use crate::packer::FloorplanPacker;
    pub use crate::selecter::{AdaptiveSelecter, Incumbent};
}
