//! The engine replays a [`Sequence`](crate::sequence::Sequence) on its own thread.
//!
//! Working cycle of a run:
//! 1. Validate every row, refuse to start on the first bad one.
//! 2. For each repetition, walk the rows, re-reading each one right before it executes.
//! 3. Parse the row, check it against safe mode and hand it to the backend.
//! 4. Sleep the row's delay, waking up early if a stop is requested.
//!
//! A fatal error is reported through the [`Notifier`] and holds the engine until the foreground
//! acknowledges it. Then the run ends.

mod exec;

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

use crate::backends::{Backend, BackendError};
use crate::commands::{DEFAULT_COLOR_TIMEOUT, ParseError, Rgb};
use crate::hotkeys::Hotkey;
use crate::notice::{self, Inbox, Notice, Notifier, Progress};
use crate::sampler::{DEFAULT_POLL_INTERVAL, DEFAULT_TOLERANCE};
use crate::sequence::{Row, SharedSequence};
use exec::Run;

/// Time given to the cursor to arrive before a positioned click.
pub const DEFAULT_CLICK_SETTLE: Duration = Duration::from_millis(50);

const NO_STEP: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunStatus {
    Idle = 0,
    Running,
    /// A stop was requested, the engine has not noticed yet.
    Stopping,
    Stopped,
    EmergencyStopped,
    Completed,
}

impl RunStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunStatus::Running,
            2 => RunStatus::Stopping,
            3 => RunStatus::Stopped,
            4 => RunStatus::EmergencyStopped,
            5 => RunStatus::Completed,
            _ => RunStatus::Idle,
        }
    }

    /// Whether an engine thread is live for this status.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, RunStatus::Running | RunStatus::Stopping)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Idle => write!(f, "Idle"),
            RunStatus::Running => write!(f, "Running"),
            RunStatus::Stopping => write!(f, "Stopping"),
            RunStatus::Stopped => write!(f, "Stopped"),
            RunStatus::EmergencyStopped => write!(f, "Emergency Stop"),
            RunStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Infinite,
    Limited(u64),
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Infinite => write!(f, "infinite"),
            RunMode::Limited(count) => write!(f, "{count} repetitions"),
        }
    }
}

/// Settings captured when a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub mode: RunMode,
    pub safe_mode: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Infinite,
            safe_mode: true,
        }
    }
}

/// What the foreground sees of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunState {
    pub status: RunStatus,
    /// 1-based, 0 before the first repetition.
    pub repetition: u64,
    /// 0-based index of the row being executed.
    pub step: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Per-channel tolerance of colour waits.
    pub tolerance: u8,
    /// Granularity of colour polling and stop checks during delays.
    pub poll_interval: Duration,
    /// How long `waitcolor` waits.
    pub color_timeout: Duration,
    /// Pause between moving the cursor and a positioned click.
    pub click_settle: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            color_timeout: DEFAULT_COLOR_TIMEOUT,
            click_settle: DEFAULT_CLICK_SETTLE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Key,
    Delay,
    Hold,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Key => write!(f, "key"),
            Field::Delay => write!(f, "delay"),
            Field::Hold => write!(f, "hold"),
        }
    }
}

/// Reasons a run refuses to start. Rows are 1-based.
#[derive(Debug, PartialEq, Error)]
pub enum ValidationError {
    #[error("add at least one action row")]
    NoRows,
    #[error("row {row}: please specify a key/button")]
    EmptyKey { row: usize },
    #[error("row {row}: invalid {field} value `{value}`")]
    InvalidNumber {
        row: usize,
        field: Field,
        value: String,
    },
    #[error("invalid repetition count: must be a positive whole number")]
    InvalidRepetitions,
}

/// Errors that end a run. Rows are 1-based.
#[derive(Debug, PartialEq, Error)]
pub enum StepError {
    #[error(transparent)]
    InvalidCommand(#[from] ParseError),
    #[error("row {row}: invalid {field} value `{value}`")]
    InvalidNumber {
        row: usize,
        field: Field,
        value: String,
    },
    #[error("`{key}` is blocked in safe mode")]
    SafeModeBlocked { key: String },
    #[error("colour {color} not found at ({x}, {y}) within {timeout:?}")]
    ColorWaitTimeout {
        color: Rgb,
        x: i32,
        y: i32,
        timeout: Duration,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StepError {
    /// The notice shown for this error while executing `row`.
    #[must_use]
    pub fn notice(&self, row: &Row) -> Notice {
        match self {
            StepError::InvalidCommand(err) => Notice::invalid_action(&row.key, err),
            StepError::InvalidNumber { row: index, .. } => {
                Notice::invalid_number(*index, &row.delay, &row.hold)
            }
            StepError::SafeModeBlocked { key } => Notice::safe_mode_blocked(key),
            StepError::ColorWaitTimeout {
                color,
                x,
                y,
                timeout,
            } => Notice::color_not_found(*color, *x, *y, *timeout),
            StepError::Backend(err) => Notice::action_error(&row.key, err),
        }
    }
}

/// Parses a number of seconds. Must be finite and not negative.
#[must_use]
pub fn parse_seconds(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

/// Reads a row's delay and hold.
///
/// # Errors
/// The first field that is not a valid number of seconds, with its text.
pub fn check_timing(data: &Row) -> Result<(Duration, Duration), (Field, String)> {
    let delay = parse_seconds(&data.delay).ok_or((Field::Delay, data.delay.clone()))?;
    let hold = parse_seconds(&data.hold).ok_or((Field::Hold, data.hold.clone()))?;
    Ok((delay, hold))
}

/// Checks everything a run needs before it may start.
///
/// # Errors
/// The first problem found, naming the 1-based row.
pub fn validate(rows: &[Row], config: &RunConfig) -> Result<(), ValidationError> {
    if rows.is_empty() {
        return Err(ValidationError::NoRows);
    }
    for (index, data) in rows.iter().enumerate() {
        let row = index + 1;
        if data.key.trim().is_empty() {
            return Err(ValidationError::EmptyKey { row });
        }
        check_timing(data)
            .map_err(|(field, value)| ValidationError::InvalidNumber { row, field, value })?;
    }
    if config.mode == RunMode::Limited(0) {
        return Err(ValidationError::InvalidRepetitions);
    }
    Ok(())
}

/// State shared between the engine thread and the foreground.
struct Shared {
    status: AtomicU8,
    repetition: AtomicU64,
    step: AtomicUsize,
}

impl Shared {
    fn status(&self) -> RunStatus {
        RunStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    fn set_status(&self, status: RunStatus) {
        self.status.store(status as u8, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.status() == RunStatus::Running
    }

    /// Running to Stopping. False if the run was not running.
    fn request_stop(&self) -> bool {
        self.status
            .compare_exchange(
                RunStatus::Running as u8,
                RunStatus::Stopping as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    fn set_step(&self, step: Option<usize>) {
        self.step.store(step.unwrap_or(NO_STEP), Ordering::SeqCst);
    }
}

/// Drives a backend through the rows of a shared sequence.
pub struct Engine<B: Backend> {
    backend: Arc<Mutex<B>>,
    sequence: SharedSequence,
    options: EngineOptions,
    shared: Arc<Shared>,
    notifier: Notifier,
    handle: Option<JoinHandle<()>>,
}

impl<B: Backend> Engine<B> {
    /// Creates an idle engine and the inbox its reports go to.
    #[must_use]
    pub fn new(backend: B, sequence: SharedSequence, options: EngineOptions) -> (Self, Inbox) {
        let (notifier, inbox) = notice::channel();
        let engine = Self {
            backend: Arc::new(Mutex::new(backend)),
            sequence,
            options,
            shared: Arc::new(Shared {
                status: AtomicU8::new(RunStatus::Idle as u8),
                repetition: AtomicU64::new(0),
                step: AtomicUsize::new(NO_STEP),
            }),
            notifier,
            handle: None,
        };
        (engine, inbox)
    }

    #[must_use]
    pub fn sequence(&self) -> &SharedSequence {
        &self.sequence
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<Mutex<B>> {
        &self.backend
    }

    #[must_use]
    pub fn snapshot(&self) -> RunState {
        let step = self.shared.step.load(Ordering::SeqCst);
        RunState {
            status: self.shared.status(),
            repetition: self.shared.repetition.load(Ordering::SeqCst),
            step: (step != NO_STEP).then_some(step),
        }
    }

    /// Starts a run on a new thread.
    ///
    /// Returns `Ok(false)` without doing anything if a run is active.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for the first invalid row. The engine stays as it was.
    pub fn start(&mut self, config: RunConfig) -> Result<bool, ValidationError> {
        if self.shared.status().is_active() {
            log::debug!("a run is already active, ignoring start");
            return Ok(false);
        }
        {
            let sequence = self.sequence.read().unwrap_or_else(PoisonError::into_inner);
            validate(sequence.rows(), &config).inspect_err(|err| log::warn!("{err}"))?;
        }
        // The previous thread may still be reporting its end
        self.join();

        self.notifier.rearm();
        self.shared.repetition.store(0, Ordering::SeqCst);
        self.shared.set_step(None);
        self.shared.set_status(RunStatus::Running);

        let run = Run {
            backend: self.backend.clone(),
            sequence: self.sequence.clone(),
            options: self.options,
            config,
            shared: self.shared.clone(),
            notifier: self.notifier.clone(),
        };
        match thread::Builder::new()
            .name("engine".to_string())
            .spawn(move || run.execute())
        {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(true)
            }
            Err(err) => {
                log::error!("cannot spawn the engine thread: {err}");
                self.shared.set_status(RunStatus::Idle);
                Ok(false)
            }
        }
    }

    /// Asks the run to stop at its next checkpoint. Returns false if nothing was running.
    pub fn stop(&self) -> bool {
        let stopped = self.shared.request_stop();
        if stopped {
            log::warn!("Stop requested");
        }
        stopped
    }

    /// Ends the run at once without waiting for any acknowledgement.
    ///
    /// Returns false if nothing was running.
    pub fn emergency_stop(&self) -> bool {
        let result = self
            .shared
            .status
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                RunStatus::from_u8(current)
                    .is_active()
                    .then_some(RunStatus::EmergencyStopped as u8)
            });
        if result.is_err() {
            return false;
        }
        log::warn!("Emergency stop");
        self.notifier.release();
        self.notifier.notify(Progress::HighlightsCleared);
        self.notifier.notify(Notice::emergency_stop());
        true
    }

    /// Waits for the engine thread, if any, and returns the status it left behind.
    pub fn join(&mut self) -> RunStatus {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("the engine thread panicked");
                self.shared.set_status(RunStatus::Stopped);
            }
        }
        self.shared.status()
    }

    /// Performs what a hotkey stands for.
    ///
    /// # Errors
    /// See [`Engine::start`].
    pub fn trigger(&mut self, hotkey: Hotkey, config: &RunConfig) -> Result<bool, ValidationError> {
        log::debug!("Hotkey {hotkey} pressed");
        match hotkey {
            Hotkey::Start => self.start(*config),
            Hotkey::Stop => Ok(self.stop()),
            Hotkey::EmergencyStop => Ok(self.emergency_stop()),
        }
    }
}

impl<B: Backend> Drop for Engine<B> {
    fn drop(&mut self) {
        self.shared.request_stop();
        if self.shared.status().is_active() {
            self.notifier.release();
        }
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds() {
        assert_eq!(parse_seconds("0.5"), Some(Duration::from_millis(500)));
        assert_eq!(parse_seconds(" 2 "), Some(Duration::from_secs(2)));
        assert_eq!(parse_seconds("0"), Some(Duration::ZERO));
        assert_eq!(parse_seconds("-1"), None);
        assert_eq!(parse_seconds("inf"), None);
        assert_eq!(parse_seconds("NaN"), None);
        assert_eq!(parse_seconds("half"), None);
        assert_eq!(parse_seconds(""), None);
    }

    #[test]
    fn validation() {
        let config = RunConfig::default();
        assert_eq!(validate(&[], &config), Err(ValidationError::NoRows));
        assert_eq!(
            validate(&[Row::new("a"), Row::new("  ")], &config),
            Err(ValidationError::EmptyKey { row: 2 })
        );
        assert_eq!(
            validate(&[Row::new("a").delay("soon")], &config),
            Err(ValidationError::InvalidNumber {
                row: 1,
                field: Field::Delay,
                value: "soon".to_string()
            })
        );
        assert_eq!(
            validate(&[Row::new("a"), Row::new("b").hold("-0.1")], &config),
            Err(ValidationError::InvalidNumber {
                row: 2,
                field: Field::Hold,
                value: "-0.1".to_string()
            })
        );
        let zero = RunConfig {
            mode: RunMode::Limited(0),
            safe_mode: true,
        };
        assert_eq!(
            validate(&[Row::new("a")], &zero),
            Err(ValidationError::InvalidRepetitions)
        );
        assert_eq!(validate(&[Row::new("a")], &config), Ok(()));
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            ValidationError::EmptyKey { row: 3 }.to_string(),
            "row 3: please specify a key/button"
        );
        let row = Row::new("tab");
        let notice = StepError::SafeModeBlocked {
            key: "tab".to_string(),
        }
        .notice(&row);
        assert_eq!(notice.message, "Action 'tab' is blocked in safe mode.");

        let row = Row::new("a").delay("x");
        let notice = StepError::InvalidNumber {
            row: 4,
            field: Field::Delay,
            value: "x".to_string(),
        }
        .notice(&row);
        assert_eq!(notice.message, "Invalid number in Row 4 ('x' or '0.0'). Stopping.");
    }

    #[test]
    fn status_round_trip() {
        for status in [
            RunStatus::Idle,
            RunStatus::Running,
            RunStatus::Stopping,
            RunStatus::Stopped,
            RunStatus::EmergencyStopped,
            RunStatus::Completed,
        ] {
            assert_eq!(RunStatus::from_u8(status as u8), status);
        }
        assert!(RunStatus::Stopping.is_active());
        assert!(!RunStatus::Completed.is_active());
    }
}
