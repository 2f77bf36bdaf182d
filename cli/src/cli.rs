//! cli parameters

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    version,
    about = "Companion tool for keyclicker sequences.",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Check every row of a saved sequence")]
    Check {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        #[arg(long = "unsafe", help = "Check as if safe mode was off.")]
        unsafe_mode: bool,
    },
    #[command(about = "Print the command text for a position or colour")]
    Snippet {
        #[command(subcommand)]
        snippet: Snippet,
    },
    #[command(about = "List the keys and commands a row accepts")]
    Keys,
    #[command(about = "Write a sequence holding one empty row")]
    New {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        #[arg(short = 'f', long = "force", help = "Overwrite an existing file.")]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum Snippet {
    #[command(about = "Left click at a position")]
    Click(Position),
    #[command(about = "Right click at a position")]
    Rclick(Position),
    #[command(about = "Middle click at a position")]
    Mclick(Position),
    #[command(about = "Move the cursor to a position")]
    Moveto(Position),
    #[command(about = "Wait for a colour at a position")]
    Waitcolor {
        r: u8,
        g: u8,
        b: u8,
        #[command(flatten)]
        at: Position,
    },
}

#[derive(clap::Args)]
pub struct Position {
    #[arg(allow_negative_numbers = true)]
    pub x: i32,
    #[arg(allow_negative_numbers = true)]
    pub y: i32,
}
