use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use beacon_core::{CorrelatorConfig, NavigationTiming};
use beacon_replay::logging::{self, LogDestination};
use beacon_replay::{load_trace, replay, ReplayOptions};
use beacon_runtime::load_config;
use clap::Parser;
use log::LevelFilter;
use url::Url;

/// Replay a recorded signal trace and print each beacon as a JSON line
#[derive(Parser, Debug)]
#[command(name = "beacon_replay")]
#[command(version)]
struct Args {
    /// RON trace: a list of `(at: <ms>, signal: <Signal>)` entries
    trace: PathBuf,

    /// RON correlator config (defaults apply when omitted or missing)
    config: Option<PathBuf>,

    /// Page URL that relative request and node URLs resolve against
    #[arg(long)]
    page_url: Option<Url>,

    /// Browser navigation timeline for hard navigations, as `fetch_start,response_start`
    #[arg(long, value_parser = parse_navigation)]
    navigation: Option<NavigationTiming>,

    /// Timers fired at most after the last trace entry
    #[arg(long, default_value_t = 10_000)]
    drain_limit: usize,

    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    log: LogDestination,

    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let log_path = args.log_file.clone().unwrap_or_else(logging::default_log_path);
    logging::initialize(args.log, level, &log_path);

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => CorrelatorConfig::default(),
    };
    let entries = load_trace(&args.trace)?;
    let options = ReplayOptions {
        page_url: args.page_url,
        navigation: args.navigation,
        drain_limit: args.drain_limit,
    };

    let records = replay(entries, config, &options);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for record in &records {
        let line = serde_json::to_string(record).context("serializing beacon record")?;
        writeln!(out, "{line}").context("writing to stdout")?;
    }
    Ok(())
}

fn parse_navigation(raw: &str) -> Result<NavigationTiming, String> {
    let (fetch_start, response_start) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected `fetch_start,response_start`, got {raw:?}"))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<u64>()
            .map_err(|err| format!("invalid timestamp {value:?}: {err}"))
    };
    Ok(NavigationTiming {
        fetch_start: parse(fetch_start)?,
        response_start: parse(response_start)?,
    })
}
