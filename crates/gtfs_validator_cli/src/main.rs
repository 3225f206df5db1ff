use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use tracing::info;

use gtfs_guru_core::progress::ProgressHandler;
use gtfs_guru_core::{
    default_scheduler, validate_source_with_progress, ValidationContext, ValidationMode,
    ZipFeedSource,
};
use gtfs_guru_report::build_report;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Performance,
    Default,
    Comprehensive,
}

impl From<ModeArg> for ValidationMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Performance => ValidationMode::Performance,
            ModeArg::Default => ValidationMode::Default,
            ModeArg::Comprehensive => ValidationMode::Comprehensive,
        }
    }
}

/// Validates a GTFS feed (directory or zip, local or downloaded) against the
/// full rule catalog and writes a JSON `ValidationReport` alongside a
/// pass/fail exit code.
#[derive(Debug, Parser)]
#[command(name = "gtfs-guru")]
#[command(about = "GTFS feed validator")]
struct Args {
    /// Path to a feed directory or a GTFS zip file.
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// URL to download a GTFS zip from instead of reading a local path.
    #[arg(short = 'u', long = "url")]
    url: Option<String>,

    /// Directory to write `report.json` into. Created if missing.
    #[arg(short = 'o', long = "output", default_value = "gtfs_guru_report")]
    output: PathBuf,

    /// ISO-3166 alpha-2 country code, enables locale-specific checks (phone,
    /// currency).
    #[arg(short = 'c', long = "country-code")]
    country_code: Option<String>,

    /// Reference "today" for calendar checks, as YYYY-MM-DD. Defaults to the
    /// wall-clock date.
    #[arg(short = 'd', long = "current-date")]
    current_date: Option<String>,

    #[arg(short = 'm', long = "mode", value_enum, default_value = "default")]
    mode: ModeArg,

    /// Per-notice-code sample cap in the report.
    #[arg(long = "max-notices-per-type", default_value_t = 100)]
    max_notices_per_type: usize,

    /// Worker thread count for the validator pool.
    #[arg(long = "threads")]
    threads: Option<usize>,

    /// Pretty-print the JSON report.
    #[arg(short = 'p', long = "pretty")]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();

    let mut ctx = ValidationContext::new(args.mode.into())
        .with_max_notices_per_type(args.max_notices_per_type.max(1));
    if let Some(code) = args.country_code.as_deref() {
        if !code.trim().is_empty() {
            ctx = ctx.with_country_code(code.trim());
        }
    }
    if let Some(date) = args.current_date.as_deref() {
        ctx = ctx.with_current_date(parse_current_date(date)?);
    }
    if let Some(threads) = args.threads {
        ctx = ctx.with_parallel_workers(threads);
    }

    let resolved = resolve_input(&args)?;
    info!("validating {}", resolved.label);

    let scheduler = default_scheduler();
    let progress = Arc::new(IndicatifHandler::new());

    let started_at = Instant::now();
    let outcome = match resolved.source {
        InputSource::Path(path) => {
            let source = gtfs_guru_core::open_feed_source(&path)?;
            validate_source_with_progress(
                source.as_ref(),
                &scheduler,
                &ctx,
                progress.as_ref(),
                None,
                None,
            )
        }
        InputSource::ZipBytes(bytes) => {
            let source = ZipFeedSource::open_bytes(bytes, resolved.label.clone())?;
            validate_source_with_progress(&source, &scheduler, &ctx, progress.as_ref(), None, None)
        }
    };
    progress.finish();
    let elapsed = started_at.elapsed();
    info!("validation finished in {:?}", elapsed);

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("create output dir {}", args.output.display()))?;

    let report = build_report(&outcome, &ctx);
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("serialize validation report")?;
    let report_path = args.output.join("report.json");
    std::fs::write(&report_path, format!("{json}\n"))
        .with_context(|| format!("write {}", report_path.display()))?;
    info!("report written to {}", report_path.display());

    if !report.is_passing() {
        std::process::exit(1);
    }
    Ok(())
}

enum InputSource {
    Path(PathBuf),
    ZipBytes(Vec<u8>),
}

struct ResolvedInput {
    source: InputSource,
    label: String,
}

fn resolve_input(args: &Args) -> anyhow::Result<ResolvedInput> {
    match (&args.input, &args.url) {
        (Some(_), Some(_)) => bail!("--input and --url cannot both be provided"),
        (None, None) => bail!("one of --input or --url must be provided"),
        (Some(path), None) => Ok(ResolvedInput {
            source: InputSource::Path(path.clone()),
            label: path.display().to_string(),
        }),
        (None, Some(url)) => {
            if url.trim().is_empty() {
                bail!("--url must not be empty");
            }
            let bytes = download_url(url)?;
            Ok(ResolvedInput {
                source: InputSource::ZipBytes(bytes),
                label: url.clone(),
            })
        }
    }
}

fn download_url(url: &str) -> anyhow::Result<Vec<u8>> {
    let client = Client::builder()
        .user_agent(format!("gtfs-guru-cli/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build http client")?;
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("download gtfs from {url}"))?
        .error_for_status()
        .with_context(|| format!("download gtfs from {url}"))?;
    let bytes = response
        .bytes()
        .with_context(|| format!("read response body from {url}"))?;
    Ok(bytes.to_vec())
}

fn parse_current_date(value: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value.trim(), "%Y%m%d"))
        .with_context(|| format!("invalid --current-date {value}"))
}

struct IndicatifHandler {
    _multi: MultiProgress,
    loading_pb: ProgressBar,
    validation_pb: ProgressBar,
}

impl IndicatifHandler {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let loading_pb = multi.add(ProgressBar::new(0));
        loading_pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] loading {msg}",
            )
            .unwrap(),
        );
        loading_pb.set_message("waiting to load files...");

        let validation_pb = multi.add(ProgressBar::new(0));
        validation_pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.magenta/magenta} {percent}% {msg}",
            )
            .unwrap()
            .progress_chars("#>-"),
        );
        validation_pb.set_message("waiting to validate...");

        Self {
            _multi: multi,
            loading_pb,
            validation_pb,
        }
    }

    fn finish(&self) {
        self.loading_pb.finish_with_message("loaded");
        self.validation_pb.finish_with_message("validation complete");
    }
}

impl ProgressHandler for IndicatifHandler {
    fn on_start_file_load(&self, file: &str) {
        self.loading_pb.set_message(format!("loading {file}"));
    }

    fn on_finish_file_load(&self, _file: &str) {
        self.loading_pb.inc(1);
    }

    fn on_start_validation(&self, validator_name: &str) {
        self.validation_pb
            .set_message(format!("running {validator_name}"));
    }

    fn on_finish_validation(&self, _validator_name: &str) {}

    fn set_total_validators(&self, count: usize) {
        self.validation_pb.set_length(count as u64);
        self.validation_pb.set_message("starting validation...");
    }

    fn increment_validator_progress(&self) {
        self.validation_pb.inc(1);
    }
}
