//! trailrec — trail processing and route recommendation CLI.
//!
//! ```text
//! trailrec <process | generate-routes | export> [flags]
//!
//!   --input <file.geojson>      trail source (FeatureCollection)
//!   --output <dir>              artifact directory (created if missing)
//!   --config <file.json>        engine configuration (all fields optional)
//!   --patterns <file.json>      route patterns (default: built-in set)
//!   --region <tag>              region filter + route label
//!   --bbox <minLng,minLat,maxLng,maxLat>
//!   --format <geojson|csv|sqlite>   (default: geojson)
//!   --set <dotted.path=value>   config override, repeatable
//! ```
//!
//! `process` runs layers 1–2 only (clean, split, graph); `generate-routes`
//! and `export` run the full pipeline.  Exit codes: 0 success, 1 fatal
//! (configuration or I/O), 2 empty input or empty output.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tr_core::{BBox, CancelToken, EngineConfig};
use tr_output::{ArtifactWriter, CsvArtifactWriter, GeoJsonWriter, read_trails};
use tr_pipeline::{Pipeline, PipelineArtifacts};
use tr_route::RoutePattern;

// ── Exit codes ────────────────────────────────────────────────────────────────

const EXIT_OK:    u8 = 0;
const EXIT_FATAL: u8 = 1;
const EXIT_EMPTY: u8 = 2;

const USAGE: &str = "usage: trailrec <process | generate-routes | export> \
                     --input <file.geojson> --output <dir> \
                     [--config <file.json>] [--patterns <file.json>] \
                     [--region <tag>] [--bbox <minLng,minLat,maxLng,maxLat>] \
                     [--format <geojson|csv|sqlite>] [--set <path=value>]...";

// ── Argument model ────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq)]
enum Command {
    Process,
    GenerateRoutes,
    Export,
}

#[derive(Clone, Copy, PartialEq)]
enum Format {
    GeoJson,
    Csv,
    Sqlite,
}

struct Args {
    command:  Command,
    input:    PathBuf,
    output:   PathBuf,
    config:   Option<PathBuf>,
    patterns: Option<PathBuf>,
    region:   Option<String>,
    bbox:     Option<BBox>,
    format:   Format,
    sets:     Vec<(String, String)>,
}

fn parse_args(argv: &[String]) -> Result<Args> {
    let Some(command) = argv.first() else {
        bail!("{USAGE}");
    };
    let command = match command.as_str() {
        "process"         => Command::Process,
        "generate-routes" => Command::GenerateRoutes,
        "export"          => Command::Export,
        other => bail!("unknown command {other:?}\n{USAGE}"),
    };

    let mut input = None;
    let mut output = None;
    let mut config = None;
    let mut patterns = None;
    let mut region = None;
    let mut bbox = None;
    let mut format = Format::GeoJson;
    let mut sets = Vec::new();

    let mut it = argv[1..].iter();
    while let Some(flag) = it.next() {
        let mut value = || {
            it.next()
                .with_context(|| format!("flag {flag} needs a value\n{USAGE}"))
        };
        match flag.as_str() {
            "--input"    => input = Some(PathBuf::from(value()?)),
            "--output"   => output = Some(PathBuf::from(value()?)),
            "--config"   => config = Some(PathBuf::from(value()?)),
            "--patterns" => patterns = Some(PathBuf::from(value()?)),
            "--region"   => region = Some(value()?.clone()),
            "--bbox"     => bbox = Some(parse_bbox(value()?)?),
            "--format" => {
                format = match value()?.as_str() {
                    "geojson" => Format::GeoJson,
                    "csv"     => Format::Csv,
                    "sqlite"  => Format::Sqlite,
                    other => bail!("unknown format {other:?} (geojson, csv, or sqlite)"),
                }
            }
            "--set" => {
                let pair = value()?;
                let (path, val) = pair
                    .split_once('=')
                    .with_context(|| format!("--set expects path=value, got {pair:?}"))?;
                sets.push((path.to_owned(), val.to_owned()));
            }
            other => bail!("unknown flag {other:?}\n{USAGE}"),
        }
    }

    Ok(Args {
        command,
        input:  input.context("--input is required")?,
        output: output.context("--output is required")?,
        config,
        patterns,
        region,
        bbox,
        format,
        sets,
    })
}

fn parse_bbox(text: &str) -> Result<BBox> {
    let parts: Vec<f64> = text
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("invalid bbox {text:?}"))?;
    if parts.len() != 4 {
        bail!("bbox needs four numbers: minLng,minLat,maxLng,maxLat");
    }
    Ok(BBox {
        min_lng: parts[0],
        min_lat: parts[1],
        max_lng: parts[2],
        max_lat: parts[3],
    })
}

// ── Configuration & patterns ──────────────────────────────────────────────────

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open config {}", path.display()))?;
            serde_json::from_reader(file)
                .with_context(|| format!("cannot parse config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    for (path, value) in &args.sets {
        config
            .set_by_path(path, value)
            .with_context(|| format!("--set {path}={value}"))?;
    }
    Ok(config)
}

fn load_patterns(args: &Args) -> Result<Vec<RoutePattern>> {
    match &args.patterns {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open patterns {}", path.display()))?;
            serde_json::from_reader(file)
                .with_context(|| format!("cannot parse patterns {}", path.display()))
        }
        None => Ok(RoutePattern::default_set()),
    }
}

// ── Writing ───────────────────────────────────────────────────────────────────

fn write_artifacts(args: &Args, artifacts: &PipelineArtifacts) -> Result<()> {
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("cannot create {}", args.output.display()))?;

    let mut writer: Box<dyn ArtifactWriter> = match args.format {
        Format::GeoJson => Box::new(GeoJsonWriter::new(&args.output)),
        Format::Csv     => Box::new(CsvArtifactWriter::new(&args.output)?),
        #[cfg(feature = "sqlite")]
        Format::Sqlite  => Box::new(tr_output::SqliteWriter::new(&args.output)?),
        #[cfg(not(feature = "sqlite"))]
        Format::Sqlite  => bail!("this build has no sqlite support"),
    };

    writer.write_trails(&artifacts.trails)?;
    writer.write_segments(&artifacts.segments)?;
    writer.write_graph(&artifacts.graph)?;
    if args.command != Command::Process {
        writer.write_routes(&artifacts.routes)?;
    }
    writer.write_summary(&artifacts.summary)?;
    writer.finish()?;
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn run(argv: &[String]) -> Result<u8> {
    let args = parse_args(argv)?;
    let config = load_config(&args)?;

    let file = File::open(&args.input)
        .with_context(|| format!("cannot open input {}", args.input.display()))?;
    let raw_trails = read_trails(file)
        .with_context(|| format!("cannot read trails from {}", args.input.display()))?;
    if raw_trails.is_empty() {
        eprintln!("no trails in {}", args.input.display());
        return Ok(EXIT_EMPTY);
    }
    info!(trails = raw_trails.len(), "input loaded");

    let patterns = match args.command {
        Command::Process => Vec::new(),
        _ => load_patterns(&args)?,
    };

    let mut pipeline = Pipeline::new(&config);
    if let Some(region) = &args.region {
        pipeline = pipeline.with_region(region.clone());
    }
    if let Some(bbox) = args.bbox {
        pipeline = pipeline.with_bbox(bbox);
    }

    let artifacts = pipeline.run(raw_trails, &patterns, &CancelToken::new())?;
    if artifacts.summary.cancelled {
        eprintln!("run cancelled; nothing written");
        return Ok(EXIT_FATAL);
    }
    if artifacts.trails.is_empty() {
        eprintln!("nothing left after processing; nothing written");
        return Ok(EXIT_EMPTY);
    }

    write_artifacts(&args, &artifacts)?;

    let dropped = artifacts.summary.total_dropped();
    if dropped > 0 {
        eprintln!("completed with {dropped} records dropped (see summary.json)");
    }
    println!(
        "{} trails, {} segments, {} vertices, {} edges, {} routes → {}",
        artifacts.trails.len(),
        artifacts.segments.len(),
        artifacts.graph.vertex_count(),
        artifacts.graph.edge_count(),
        artifacts.routes.len(),
        args.output.display(),
    );
    Ok(EXIT_OK)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    match run(&argv) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
