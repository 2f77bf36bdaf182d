//! Command line of `keyclicker`.

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use crate::commands::{self, Action, Rgb};
use crate::runner::{EngineOptions, RunMode};

pub static CFG: LazyLock<Config> = LazyLock::new(parse);

#[derive(Parser)]
#[command(
    version,
    about = "Replays a saved key and mouse sequence",
    long_about = "Replays a saved key and mouse sequence on the dry-run backend.\n\
                  While running, type `ack` to acknowledge an error, `stop` to stop after the \
                  current step, or `esc` for an emergency stop."
)]
struct Cli {
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to the saved sequence."
    )]
    config: Option<PathBuf>,

    #[arg(
        short = 'r',
        long = "repetitions",
        value_name = "N",
        conflicts_with = "infinite",
        help = "Run the sequence N times, whatever the file says."
    )]
    repetitions: Option<u64>,

    #[arg(long = "infinite", help = "Repeat until stopped, whatever the file says.")]
    infinite: bool,

    #[arg(long = "unsafe", help = "Turn safe mode off.")]
    unsafe_mode: bool,

    #[arg(
        long = "tolerance",
        value_name = "N",
        help = "Largest per-channel difference a colour wait accepts."
    )]
    tolerance: Option<u8>,

    #[arg(
        long = "poll-interval",
        value_name = "DURATION",
        value_parser = parse_duration,
        help = "Time between pixel samples and stop checks, e.g. 100ms."
    )]
    poll_interval: Option<Duration>,

    #[arg(
        long = "color-timeout",
        value_name = "DURATION",
        value_parser = parse_duration,
        help = "How long waitcolor waits, e.g. 30s."
    )]
    color_timeout: Option<Duration>,

    #[arg(
        long = "pixel",
        value_name = "X,Y,R,G,B",
        value_parser = parse_pixel,
        help = "Pretend the screen shows this colour at this position. Repeatable."
    )]
    pixels: Vec<(i32, i32, Rgb)>,

    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        help = "Log each step, twice to log every input as well."
    )]
    verbose: u8,
}

pub struct Config {
    pub config: PathBuf,
    /// Overrides the run mode of the file.
    pub mode: Option<RunMode>,
    /// Overrides the safe mode of the file.
    pub safe_mode: Option<bool>,
    pub options: EngineOptions,
    pub pixels: Vec<(i32, i32, Rgb)>,
    pub level: log::LevelFilter,
}

fn parse() -> Config {
    let parsed = Cli::parse();
    let config = if let Some(value) = parsed.config {
        value
    } else {
        PathBuf::from("keyclicker.json")
    };
    let mode = if parsed.infinite {
        Some(RunMode::Infinite)
    } else {
        parsed.repetitions.map(RunMode::Limited)
    };
    let defaults = EngineOptions::default();
    let options = EngineOptions {
        tolerance: parsed.tolerance.unwrap_or(defaults.tolerance),
        poll_interval: parsed.poll_interval.unwrap_or(defaults.poll_interval),
        color_timeout: parsed.color_timeout.unwrap_or(defaults.color_timeout),
        click_settle: defaults.click_settle,
    };
    let level = match parsed.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    Config {
        config,
        mode,
        safe_mode: parsed.unsafe_mode.then_some(false),
        options,
        pixels: parsed.pixels,
        level,
    }
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    let duration = duration_str::parse(value).map_err(|err| err.to_string())?;
    if duration.is_zero() {
        return Err("must be longer than zero".to_string());
    }
    Ok(duration)
}

/// Same five numbers as `waitcolor`, but position first.
fn parse_pixel(value: &str) -> Result<(i32, i32, Rgb), String> {
    let fields: Vec<&str> = value.split(',').collect();
    let [x, y, r, g, b] = fields.as_slice() else {
        return Err("expected X,Y,R,G,B".to_string());
    };
    match commands::parse(&format!("waitcolor({r},{g},{b},{x},{y})")) {
        Ok(Action::WaitColor { color, x, y, .. }) => Ok((x, y, color)),
        Ok(_) => Err("expected X,Y,R,G,B".to_string()),
        Err(err) => Err(err.to_string()),
    }
}
