//! Zone classification tool: reads a PM2.5 forecast snapshot (JSON) and a
//! municipal boundary file (GeoJSON), classifies every boundary for one or
//! all forecast steps, prints the category table and writes classified
//! GeoJSON.

use std::fs;
use std::path::{Path, PathBuf};

use airzone_core::coords::Crs;
use airzone_core::sampler::{forecast_steps, ForecastSnapshot, GridSnapshot};
use airzone_core::zones::{ReferenceContext, DEFAULT_NAME_PROPERTY};
use airzone_core::{PipelineConfig, PipelineOutput, ZonePipeline};
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "airzone",
    version,
    about = "Classify municipalities by forecast PM2.5 concentration"
)]
struct Args {
    /// Forecast snapshot JSON (base_date, crs, steps[])
    #[arg(long)]
    snapshot: PathBuf,

    /// Boundary GeoJSON feature collection
    #[arg(long)]
    boundaries: PathBuf,

    /// Forecast step index (0-based)
    #[arg(long, default_value = "0", conflicts_with = "all_steps")]
    step: usize,

    /// Classify every step of the snapshot
    #[arg(long)]
    all_steps: bool,

    /// Print the available steps and exit
    #[arg(long)]
    list_steps: bool,

    /// Pipeline configuration JSON (missing fields take defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lattice resolution, applied to both axes
    #[arg(long)]
    resolution: Option<usize>,

    /// Number of contour levels
    #[arg(long)]
    levels: Option<usize>,

    /// Feature property holding the boundary name
    #[arg(long, default_value = DEFAULT_NAME_PROPERTY)]
    name_property: String,

    /// Override the boundary CRS (e.g. EPSG:4326)
    #[arg(long)]
    boundary_crs: Option<String>,

    /// Output GeoJSON path; with --all-steps one file per step (<stem>_stepNN.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Cannot read {}", path.display()))?;
            PipelineConfig::from_json(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    apply_overrides(&mut cfg, args.resolution, args.levels);
    cfg.validate().context("Invalid pipeline configuration")?;
    Ok(cfg)
}

fn apply_overrides(cfg: &mut PipelineConfig, resolution: Option<usize>, levels: Option<usize>) {
    if let Some(n) = resolution {
        cfg.lattice_rows = n;
        cfg.lattice_cols = n;
    }
    if let Some(n) = levels {
        cfg.contour_levels = n;
    }
}

fn step_output_path(path: &Path, step: usize) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("zones");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("geojson");
    path.with_file_name(format!("{stem}_step{step:02}.{ext}"))
}

fn print_table(out: &PipelineOutput) {
    println!(
        "Forecast for {} (step {}, +{}h)",
        out.forecast.label(),
        out.step,
        out.forecast.lead_time_hours
    );
    println!("{:<40} {:<10} {:>8}", "MUNICIPALITY", "CATEGORY", "PM2.5");
    for zone in &out.zones {
        println!("{:<40} {:<10} {:>8.1}", zone.name, zone.category.label(), zone.value);
    }
    let counts: Vec<String> = out
        .zones
        .category_counts()
        .iter()
        .map(|(c, n)| format!("{}: {}", c.label(), n))
        .collect();
    println!("{}", counts.join("  "));
}

fn write_geojson(path: &Path, out: &PipelineOutput) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
    }
    fs::write(path, out.to_feature_collection().to_string())
        .with_context(|| format!("Write failed: {}", path.display()))?;
    eprintln!("  → {} zones written to {}", out.zones.len(), path.display());
    Ok(())
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let snapshot_text = fs::read_to_string(&args.snapshot)
        .with_context(|| format!("Cannot read {}", args.snapshot.display()))?;
    let snapshot = GridSnapshot::from_json(&snapshot_text)
        .with_context(|| format!("Failed to parse snapshot {}", args.snapshot.display()))?;

    if args.list_steps {
        println!("{:>4} {:>6} {:>12}", "STEP", "LEAD", "DATE");
        for (index, date) in forecast_steps(&snapshot) {
            println!("{:>4} {:>5}h {:>12}", index, date.lead_time_hours, date.label());
        }
        return Ok(());
    }

    let cfg = load_config(&args)?;
    let boundary_crs = args
        .boundary_crs
        .as_deref()
        .map(str::parse::<Crs>)
        .transpose()
        .context("Invalid --boundary-crs")?;
    let boundary_text = fs::read_to_string(&args.boundaries)
        .with_context(|| format!("Cannot read {}", args.boundaries.display()))?;
    let ctx = ReferenceContext::from_geojson(&boundary_text, &args.name_property, boundary_crs)
        .with_context(|| format!("Failed to load boundaries {}", args.boundaries.display()))?;
    eprintln!(
        "[airzone] {} boundaries ({}), {} forecast steps from {}",
        ctx.len(),
        ctx.crs(),
        snapshot.step_count(),
        snapshot.base_date
    );

    let pipeline = ZonePipeline::new(cfg)?;
    let steps: Vec<usize> = if args.all_steps {
        (0..snapshot.step_count()).collect()
    } else {
        vec![args.step]
    };
    if steps.is_empty() {
        bail!("Snapshot {} has no forecast steps", args.snapshot.display());
    }

    let mut failures = 0usize;
    for result in pipeline.run_steps(&snapshot, &steps, &ctx) {
        let out = match result {
            Ok(out) => out,
            // A single requested step fails the whole run.
            Err(e) if !args.all_steps => return Err(e).context("Classification failed"),
            Err(e) => {
                eprintln!("  [warn] Step skipped: {e}");
                failures += 1;
                continue;
            }
        };
        if out.zones.is_empty() {
            eprintln!("  [warn] Step {}: no boundary intersects the forecast field", out.step);
        }
        print_table(&out);
        if let Some(path) = &args.output {
            let path = if args.all_steps { step_output_path(path, out.step) } else { path.clone() };
            write_geojson(&path, &out)?;
        }
    }

    if failures == steps.len() {
        bail!("All {} forecast steps failed", failures);
    }
    Ok(())
}
