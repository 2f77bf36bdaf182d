//! Reads and writes saved sequences.
//!
//! A saved file is a JSON object:
//! ```json
//! {
//!     "run_mode": "limited",
//!     "repetitions": 3,
//!     "safe_mode": true,
//!     "rows": [
//!         { "key": "click(100,200)", "sleep": "0.5", "hold": "0.0" }
//!     ]
//! }
//! ```
//! Reading is lenient: numbers may be written as strings or JSON numbers, row fields may use
//! `delay`/`delaySeconds`/`holdSeconds`, and everything but `rows` has a default.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::path::Path;
use thiserror::Error;

use crate::runner::{RunConfig, RunMode};
use crate::sequence::{DEFAULT_DELAY, DEFAULT_HOLD, Row};

/// Written for infinite runs, and used when a file holds no usable count.
pub const DEFAULT_REPETITIONS: u64 = 10;

#[derive(Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid configuration file format: {0}")]
    InvalidConfigFormat(String),
    #[error("cannot access configuration file: {0}")]
    Io(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        ConfigError::InvalidConfigFormat(value.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value.to_string())
    }
}

#[derive(Serialize)]
struct DocumentOut<'a> {
    run_mode: &'static str,
    repetitions: u64,
    safe_mode: bool,
    rows: Vec<RowOut<'a>>,
}

#[derive(Serialize)]
struct RowOut<'a> {
    key: &'a str,
    sleep: &'a str,
    hold: &'a str,
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    run_mode: Option<Value>,
    #[serde(default)]
    repetitions: Option<Value>,
    #[serde(default)]
    safe_mode: Option<Value>,
    #[serde(default)]
    rows: Option<Value>,
}

#[derive(Deserialize)]
struct RowDocument {
    #[serde(default)]
    key: Option<Text>,
    #[serde(default, alias = "delay", alias = "delaySeconds")]
    sleep: Option<Text>,
    #[serde(default, alias = "holdSeconds")]
    hold: Option<Text>,
}

/// A field stored either as a string or as a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Text {
    String(String),
    Number(serde_json::Number),
}

impl Text {
    fn into_string(self) -> String {
        match self {
            Text::String(value) => value,
            Text::Number(value) => value.to_string(),
        }
    }
}

impl From<RowDocument> for Row {
    fn from(value: RowDocument) -> Self {
        Row {
            key: value.key.map(Text::into_string).unwrap_or_default(),
            delay: value
                .sleep
                .map_or_else(|| DEFAULT_DELAY.to_string(), Text::into_string),
            hold: value
                .hold
                .map_or_else(|| DEFAULT_HOLD.to_string(), Text::into_string),
        }
    }
}

/// A positive whole number, as a JSON number or a string.
fn repetitions(value: Option<&Value>) -> Option<u64> {
    let count = match value? {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    count.filter(|&count| count > 0)
}

/// Encodes rows and run settings with 4-space indentation.
///
/// # Errors
/// Only if serde cannot produce the text.
pub fn serialize(rows: &[Row], config: &RunConfig) -> Result<String, ConfigError> {
    let (run_mode, repetitions) = match config.mode {
        RunMode::Infinite => ("infinite", DEFAULT_REPETITIONS),
        RunMode::Limited(count) => ("limited", count),
    };
    let document = DocumentOut {
        run_mode,
        repetitions,
        safe_mode: config.safe_mode,
        rows: rows
            .iter()
            .map(|row| RowOut {
                key: &row.key,
                sleep: &row.delay,
                hold: &row.hold,
            })
            .collect(),
    };

    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    document.serialize(&mut serializer)?;
    String::from_utf8(buffer).map_err(|err| ConfigError::InvalidConfigFormat(err.to_string()))
}

/// Decodes a saved document.
///
/// `rows: []` gives a single empty row.
///
/// # Errors
/// [`ConfigError::InvalidConfigFormat`] for invalid JSON, a missing or non-list `rows`, or a
/// row that is not an object of strings and numbers.
pub fn deserialize(text: &str) -> Result<(Vec<Row>, RunConfig), ConfigError> {
    let document: Document = serde_json::from_str(text)?;
    let Some(rows @ Value::Array(_)) = document.rows else {
        return Err(ConfigError::InvalidConfigFormat(
            "`rows` must be a list".to_string(),
        ));
    };
    let mut rows: Vec<Row> = serde_json::from_value::<Vec<RowDocument>>(rows)?
        .into_iter()
        .map(Row::from)
        .collect();
    if rows.is_empty() {
        rows.push(Row::default());
    }

    let limited = matches!(&document.run_mode, Some(Value::String(mode)) if mode == "limited");
    let mode = if limited {
        RunMode::Limited(repetitions(document.repetitions.as_ref()).unwrap_or(DEFAULT_REPETITIONS))
    } else {
        RunMode::Infinite
    };
    let safe_mode = document
        .safe_mode
        .as_ref()
        .and_then(Value::as_bool)
        .unwrap_or(true);

    Ok((rows, RunConfig { mode, safe_mode }))
}

/// # Errors
/// See [`deserialize`]. Unreadable files give [`ConfigError::Io`].
pub fn load(path: &Path) -> Result<(Vec<Row>, RunConfig), ConfigError> {
    let text = std::fs::read_to_string(path)?;
    deserialize(&text)
}

/// # Errors
/// Unwritable files give [`ConfigError::Io`].
pub fn save(path: &Path, rows: &[Row], config: &RunConfig) -> Result<(), ConfigError> {
    let text = serialize(rows, config)?;
    std::fs::write(path, text)?;
    log::info!("Saved {} rows to {}", rows.len(), path.display());
    Ok(())
}
