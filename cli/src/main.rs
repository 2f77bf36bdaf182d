//! `keyclickctl` entry
//!
//! Works on saved sequences without touching the screen: checks them, writes new ones and
//! prints command snippets.

mod cli;
mod reference;

use clap::Parser;
use std::error::Error;
use std::path::Path;

use cli::{Cli, Commands, Position, Snippet};
use keyclicker::runner;
use keyclicker::{Capture, MouseButton, Rgb, Row, RunConfig, Sequence, config, is_blocked};

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Check { path, unsafe_mode } => check(&path, unsafe_mode),
        Commands::Snippet { snippet } => {
            println!("{}", snippet_text(&snippet));
            Ok(())
        }
        Commands::Keys => {
            print!("{}", reference::text());
            Ok(())
        }
        Commands::New { path, force } => new(&path, force),
    };
    result.inspect_err(|err| eprintln!("{err}"))
}

fn snippet_text(snippet: &Snippet) -> String {
    let capture = |at: &Position, color: Rgb| Capture {
        x: at.x,
        y: at.y,
        color,
    };
    match snippet {
        Snippet::Click(at) => capture(at, Rgb::default()).click_at(MouseButton::Left),
        Snippet::Rclick(at) => capture(at, Rgb::default()).click_at(MouseButton::Right),
        Snippet::Mclick(at) => capture(at, Rgb::default()).click_at(MouseButton::Middle),
        Snippet::Moveto(at) => capture(at, Rgb::default()).move_to(),
        Snippet::Waitcolor { r, g, b, at } => capture(at, Rgb::new(*r, *g, *b)).wait_color(),
    }
}

/// What is wrong with a row, if anything.
fn check_row(row: &Row, safe_mode: bool) -> Result<String, String> {
    if row.key.trim().is_empty() {
        return Err("please specify a key/button".to_string());
    }
    let (_, hold) = runner::check_timing(row)
        .map_err(|(field, value)| format!("invalid {field} value `{value}`"))?;
    let action = keyclicker::parse(&row.key)
        .map_err(|err| err.to_string())?
        .with_hold(hold);
    if is_blocked(&action, &row.key, safe_mode) {
        return Err(format!("`{}` is blocked in safe mode", row.key.trim()));
    }
    Ok(action.to_string())
}

fn check(path: &Path, unsafe_mode: bool) -> Result<(), Box<dyn Error>> {
    let (rows, saved) = config::load(path)?;
    let safe_mode = saved.safe_mode && !unsafe_mode;
    println!(
        "{}: {} rows, {} run, safe mode {}",
        path.display(),
        rows.len(),
        saved.mode,
        if safe_mode { "on" } else { "off" }
    );

    let mut problems = 0;
    for (index, row) in rows.iter().enumerate() {
        match check_row(row, safe_mode) {
            Ok(action) => println!("Row {}: {action}, then wait {}s", index + 1, row.delay.trim()),
            Err(err) => {
                problems += 1;
                println!("Row {}: {err}", index + 1);
            }
        }
    }
    if problems > 0 {
        return Err(format!("{problems} of {} rows cannot run", rows.len()).into());
    }
    Ok(())
}

fn new(path: &Path, force: bool) -> Result<(), Box<dyn Error>> {
    if path.exists() && !force {
        return Err(format!("{} already exists, pass --force to overwrite", path.display()).into());
    }
    let sequence = Sequence::new();
    config::save(path, sequence.rows(), &RunConfig::default())?;
    println!("Wrote {}", path.display());
    Ok(())
}
