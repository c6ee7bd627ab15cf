use anyhow::Context;
use clap::{ArgAction, Parser};
use pgm_histo_common::{Config, IoPolicy};
use pgm_histo_core::{
    compute_for_header, count_mapped, export_csv, export_json, parse_header, print_summary,
    EngineOptions,
};
use std::path::PathBuf;

/// Parse a worker count the lenient way: anything unparsable or below one becomes one.
fn parse_thread_count(s: &str) -> usize {
    s.trim()
        .parse::<i64>()
        .ok()
        .and_then(|n| usize::try_from(n).ok())
        .map_or(1, |n| n.max(1))
}

fn parse_chunk_size(s: &str) -> Result<usize, String> {
    let v: usize = s.parse().map_err(|_| format!("not a byte count: {s}"))?;
    if v > 0 {
        Ok(v)
    } else {
        Err("chunk size must be at least 1".into())
    }
}

#[derive(Parser)]
#[command(name = "pgm-histo", version, about = "Byte-value histogram of 8-bit PGM images")]
struct Cli {
    image_path: PathBuf,
    output_path: PathBuf,
    #[arg(allow_negative_numbers = true)]
    thread_count: String,
    /// csv or json (defaults to the config file, then csv)
    #[arg(long)]
    format: Option<String>,
    /// Fail instead of undercounting when a worker cannot read its span
    #[arg(long)]
    strict: bool,
    /// Bytes per read in each worker (defaults to the config file, then 1024)
    #[arg(long, value_parser = parse_chunk_size)]
    chunk_size: Option<usize>,
    /// Recount from a memory map and fail if the results differ
    #[arg(long)]
    verify: bool,
    /// Print a short summary to stdout after writing the output
    #[arg(long)]
    summary: bool,
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            log::warn!("ignoring config file {}: {e}", Config::config_path().display());
            Config::default()
        }
    };
    run_histogram(cli, config)
}

fn run_histogram(cli: Cli, config: Config) -> anyhow::Result<()> {
    let format = cli.format.unwrap_or_else(|| config.output.format.clone());
    if format != "csv" && format != "json" {
        anyhow::bail!("Unknown format: {format} (use csv or json)");
    }
    let workers = parse_thread_count(&cli.thread_count);

    let header = parse_header(&cli.image_path).context("Invalid PGM header.")?;
    if header.ensure_8bit().is_err() {
        anyhow::bail!("Only 8-bit images (maxval <= 255) are supported.");
    }
    log::info!(
        "{}: {}x{} maxval {} pixel data at byte {}",
        cli.image_path.display(),
        header.width,
        header.height,
        header.maxval,
        header.data_offset
    );

    let mut options = EngineOptions::from_config(&config.engine, workers);
    if let Some(chunk_size) = cli.chunk_size {
        options.chunk_size = chunk_size;
    }
    if cli.strict {
        options.policy = IoPolicy::Strict;
    }
    let run = compute_for_header(&cli.image_path, &header, &options)?;

    if !run.is_complete() {
        log::warn!(
            "{} of {} workers stopped early; histogram undercounts by {} bytes",
            run.incomplete_workers().count(),
            run.reports.len(),
            run.bytes_expected() - run.bytes_read()
        );
    }
    if run.histogram.out_of_range() > 0 {
        log::warn!(
            "{} samples exceed maxval {} and are not in the histogram",
            run.histogram.out_of_range(),
            header.maxval
        );
    }

    if cli.verify {
        let reference = count_mapped(&cli.image_path, &header)?;
        if reference != run.histogram {
            anyhow::bail!(
                "verification failed: worker histogram differs from a memory-mapped recount"
            );
        }
        log::info!("verified against memory-mapped recount");
    }

    match format.as_str() {
        "json" => export_json(&cli.output_path, &header, &run)?,
        _ => export_csv(&cli.output_path, &run.histogram)?,
    }
    log::info!("wrote {}", cli.output_path.display());
    if cli.summary {
        print_summary(&cli.image_path, &header, &run);
    }
    Ok(())
}
