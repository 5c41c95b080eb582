use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand};
use floorplan_core::config::{
    CandidateWidthGen, DistanceMetric, FloorplanConfig, PackerKind, WireLengthMode,
};
use floorplan_core::export::{append_csv_log, draw_placement, solution_report, write_fp};
use floorplan_core::{AdaptiveSelecter, Instance};
use tracing::{error, info};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "floorplan",
    about = "Fixed-outline floorplanning of hard rectangular blocks",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Solve a single instance
    Run(RunArgs),
    /// Solve every `*.blocks` instance found under a directory
    Batch(RunArgs),
}

#[derive(Parser, Debug, Clone)]
struct RunArgs {
    // Input/Output
    /// Path to the `.blocks` file (`.nets` and `.pl` are derived); for
    /// `batch`, a directory to walk
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// YAML config file path (flags override its values)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Benchmark name for the CSV log (defaults to the instance's parent
    /// directory name)
    #[arg(long, help_heading = "Input/Output")]
    bench: Option<String>,

    // Search
    /// RNG seed (omit for a nondeterministic run)
    #[arg(long, help_heading = "Search")]
    random_seed: Option<u64>,
    /// Area weight of the objective
    #[arg(long, help_heading = "Search")]
    alpha: Option<f64>,
    /// Distance weight of the objective
    #[arg(long, help_heading = "Search")]
    beta: Option<f64>,
    /// Lower sqrt-bracket scale
    #[arg(long, help_heading = "Search")]
    lb_scale: Option<f64>,
    /// Upper sqrt-bracket scale
    #[arg(long, help_heading = "Search")]
    ub_scale: Option<f64>,
    /// Wall-clock budget in seconds
    #[arg(long, help_heading = "Search")]
    ub_time: Option<f64>,
    /// Per-width iteration cap
    #[arg(long, help_heading = "Search")]
    ub_iter: Option<usize>,
    /// Width producer: interval | sqrt | combrotate | combshort
    #[arg(long, help_heading = "Search")]
    candidate_widths: Option<String>,
    /// Packer: rls | bs
    #[arg(long, help_heading = "Search")]
    packer: Option<String>,
    /// Wirelength pins: block | terminal
    #[arg(long, help_heading = "Search")]
    wirelength: Option<String>,
    /// Distance metric: wl | sqreuclidean | sqrmanhattan | sqrhpwl
    #[arg(long, help_heading = "Search")]
    distance: Option<String>,

    // Export
    /// Also write timestamped `.fp`/`.html` siblings
    #[arg(long, default_value_t = false, help_heading = "Export")]
    stamp: bool,
    /// Render the placement as HTML/SVG (wires included when beta > 0)
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Export")]
    html: bool,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Run(args) => run_single(args),
        Commands::Batch(args) => run_batch(args),
    }
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn merge_config(args: &RunArgs) -> anyhow::Result<FloorplanConfig> {
    let mut cfg = if let Some(path) = &args.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_yaml::from_str(&file).with_context(|| format!("parse config {}", path.display()))?
    } else {
        FloorplanConfig::default()
    };

    if args.random_seed.is_some() {
        cfg.random_seed = args.random_seed;
    }
    if let Some(v) = args.alpha {
        cfg.alpha = v;
    }
    if let Some(v) = args.beta {
        cfg.beta = v;
    }
    if let Some(v) = args.lb_scale {
        cfg.lb_scale = v;
    }
    if let Some(v) = args.ub_scale {
        cfg.ub_scale = v;
    }
    if let Some(v) = args.ub_time {
        cfg.ub_time = v;
    }
    if let Some(v) = args.ub_iter {
        cfg.ub_iter = v;
    }
    if let Some(v) = &args.candidate_widths {
        cfg.level_asa_cw = v
            .parse::<CandidateWidthGen>()
            .map_err(|_| anyhow::anyhow!("unknown width producer '{v}'"))?;
    }
    if let Some(v) = &args.packer {
        cfg.level_asa_fbp = v
            .parse::<PackerKind>()
            .map_err(|_| anyhow::anyhow!("unknown packer '{v}'"))?;
    }
    if let Some(v) = &args.wirelength {
        cfg.level_fbp_wl = v
            .parse::<WireLengthMode>()
            .map_err(|_| anyhow::anyhow!("unknown wirelength mode '{v}'"))?;
    }
    if let Some(v) = &args.distance {
        cfg.level_fbp_dist = v
            .parse::<DistanceMetric>()
            .map_err(|_| anyhow::anyhow!("unknown distance metric '{v}'"))?;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn run_single(args: &RunArgs) -> anyhow::Result<()> {
    let cfg = merge_config(args)?;
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }
    solve_instance(&args.input, args, &cfg)
}

fn run_batch(args: &RunArgs) -> anyhow::Result<()> {
    let cfg = merge_config(args)?;
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    let mut instances: Vec<PathBuf> = WalkDir::new(&args.input)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "blocks"))
        .collect();
    instances.sort();
    if instances.is_empty() {
        bail!("no .blocks instances under {}", args.input.display());
    }
    info!(count = instances.len(), "batch run");

    let mut failures = 0usize;
    for path in &instances {
        if let Err(err) = solve_instance(path, args, &cfg) {
            error!(instance = %path.display(), "{err:#}");
            failures += 1;
        }
    }
    if failures > 0 {
        bail!("{failures}/{} instances failed", instances.len());
    }
    Ok(())
}

fn solve_instance(blocks_path: &Path, args: &RunArgs, cfg: &FloorplanConfig) -> anyhow::Result<()> {
    let ins = Instance::load(blocks_path)
        .with_context(|| format!("load instance {}", blocks_path.display()))?;

    let mut asa = AdaptiveSelecter::new(&ins, cfg);
    asa.run().context("search failed")?;
    let check_ok = asa.check_incumbent();
    let incumbent = asa.incumbent();

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create out_dir {}", args.out_dir.display()))?;

    let fp_path = args.out_dir.join(format!("{}.fp", ins.name()));
    write_fp(&fp_path, &ins, &incumbent.dst)?;
    let report = solution_report(&ins, cfg, incumbent, check_ok, asa.seed());
    fs::write(
        args.out_dir.join(format!("{}.json", ins.name())),
        serde_json::to_string_pretty(&report)?,
    )?;
    if args.html {
        let html_path = args.out_dir.join(format!("{}.html", ins.name()));
        draw_placement(&html_path, &ins, &incumbent.dst, cfg.beta > 0.0)?;
    }
    if args.stamp {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let fp_stamped = args.out_dir.join(format!("{}.{}.fp", ins.name(), stamp));
        write_fp(&fp_stamped, &ins, &incumbent.dst)?;
        if args.html {
            let html_stamped = args.out_dir.join(format!("{}.{}.html", ins.name(), stamp));
            draw_placement(&html_stamped, &ins, &incumbent.dst, cfg.beta > 0.0)?;
        }
    }

    let bench = args.bench.clone().unwrap_or_else(|| {
        blocks_path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "results".into())
    });
    let csv_path = args.out_dir.join(format!("{bench}.csv"));
    append_csv_log(&csv_path, &ins, cfg, incumbent, check_ok, asa.seed())?;

    info!(
        instance = %ins.name(),
        objective = incumbent.objective,
        area = incumbent.area,
        fill_ratio = incumbent.fill_ratio,
        wirelength = incumbent.wirelength,
        check = check_ok,
        fp = %fp_path.display(),
        "instance solved"
    );

    if !check_ok {
        bail!(
            "{}: solution failed the legality check (CheckObj=0)",
            ins.name()
        );
    }
    Ok(())
}
