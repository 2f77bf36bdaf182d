//! The ordered list of rows a user edits.
//!
//! Rows keep their numbers as text until a run validates them, so a half-typed value never gets
//! lost. One row is the anchor: the row a sequence was created with. It can be edited and moved
//! but never removed, so a sequence is never empty.

use std::path::Path;
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::config::{self, ConfigError};
use crate::runner::RunConfig;

pub const DEFAULT_DELAY: &str = "0.5";
pub const DEFAULT_HOLD: &str = "0.0";

/// The handle the foreground edits and the engine reads at every step.
pub type SharedSequence = Arc<RwLock<Sequence>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Key, button, command or text.
    pub key: String,
    /// Seconds to wait after the action.
    pub delay: String,
    /// Seconds to hold a key or button down.
    pub hold: String,
}

impl Default for Row {
    fn default() -> Self {
        Self {
            key: String::new(),
            delay: DEFAULT_DELAY.to_string(),
            hold: DEFAULT_HOLD.to_string(),
        }
    }
}

impl Row {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn delay(mut self, delay: impl Into<String>) -> Self {
        self.delay = delay.into();
        self
    }

    #[must_use]
    pub fn hold(mut self, hold: impl Into<String>) -> Self {
        self.hold = hold.into();
        self
    }
}

#[derive(Debug, PartialEq, Error)]
pub enum SequenceError {
    #[error("cannot remove the initial row")]
    AnchorRow,
    #[error("row {0} does not exist")]
    OutOfRange(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    rows: Vec<Row>,
    anchor: usize,
}

impl Default for Sequence {
    fn default() -> Self {
        Self {
            rows: vec![Row::default()],
            anchor: 0,
        }
    }
}

impl Sequence {
    /// A sequence holding one empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The first row becomes the anchor. An empty list yields one empty row.
    #[must_use]
    pub fn from_rows(rows: Vec<Row>) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        Self { rows, anchor: 0 }
    }

    #[must_use]
    pub fn shared(self) -> SharedSequence {
        Arc::new(RwLock::new(self))
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false, kept for symmetry with [`Sequence::len`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the anchor row.
    #[must_use]
    pub fn anchor(&self) -> usize {
        self.anchor
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Row> {
        self.rows.get_mut(index)
    }

    /// Appends a row and returns its index.
    pub fn push(&mut self, row: Row) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// # Errors
    /// The anchor cannot be removed, and `index` must exist.
    pub fn remove(&mut self, index: usize) -> Result<Row, SequenceError> {
        if index >= self.rows.len() {
            return Err(SequenceError::OutOfRange(index));
        }
        if index == self.anchor {
            return Err(SequenceError::AnchorRow);
        }
        if index < self.anchor {
            self.anchor -= 1;
        }
        Ok(self.rows.remove(index))
    }

    /// Swaps a row with the one above it. Returns false when nothing moved.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.rows.len() {
            return false;
        }
        self.swap(index - 1, index);
        true
    }

    /// Swaps a row with the one below it. Returns false when nothing moved.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.rows.len() {
            return false;
        }
        self.swap(index, index + 1);
        true
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.rows.swap(a, b);
        if self.anchor == a {
            self.anchor = b;
        } else if self.anchor == b {
            self.anchor = a;
        }
    }

    /// Inserts a copy right after `index` and returns the index of the copy. The copy is never
    /// the anchor.
    ///
    /// # Errors
    /// `index` must exist.
    pub fn duplicate(&mut self, index: usize) -> Result<usize, SequenceError> {
        let row = self
            .rows
            .get(index)
            .cloned()
            .ok_or(SequenceError::OutOfRange(index))?;
        self.rows.insert(index + 1, row);
        if self.anchor > index {
            self.anchor += 1;
        }
        Ok(index + 1)
    }

    /// Replaces every row with the ones from a saved document and returns its run settings.
    ///
    /// # Errors
    /// On any [`ConfigError`] the sequence is reset to a single empty row.
    pub fn load_document(&mut self, text: &str) -> Result<RunConfig, ConfigError> {
        match config::deserialize(text) {
            Ok((rows, run_config)) => {
                *self = Self::from_rows(rows);
                Ok(run_config)
            }
            Err(err) => {
                *self = Self::default();
                Err(err)
            }
        }
    }

    /// See [`Sequence::load_document`].
    ///
    /// # Errors
    /// Unreadable files are reported as [`ConfigError::Io`].
    pub fn load_file(&mut self, path: &Path) -> Result<RunConfig, ConfigError> {
        let text = std::fs::read_to_string(path);
        match text {
            Ok(text) => self.load_document(&text),
            Err(err) => {
                *self = Self::default();
                Err(err.into())
            }
        }
    }
}
