//! The engine thread.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::backends::{Backend, BackendError, InputSink, ScreenSampler};
use crate::commands::{self, Action, Rgb};
use crate::notice::{Notifier, Progress};
use crate::policy;
use crate::runner::{
    EngineOptions, RunConfig, RunMode, RunStatus, Shared, StepError, check_timing, parse_seconds,
};
use crate::sampler::ColorWait;
use crate::sequence::{Row, SharedSequence};

/// A flag to break the outer loop.
enum LoopFlag {
    Break,
    Continue,
    Nothing,
}

/// Everything a run owns on its thread.
pub(super) struct Run<B: Backend> {
    pub backend: Arc<Mutex<B>>,
    pub sequence: SharedSequence,
    pub options: EngineOptions,
    pub config: RunConfig,
    pub shared: Arc<Shared>,
    pub notifier: Notifier,
}

/// Lets the sampler lock the backend once per sample instead of for a whole wait.
struct Locked<'a, B>(&'a Mutex<B>);

impl<B: ScreenSampler> ScreenSampler for Locked<'_, B> {
    fn sample_pixel(&self, x: i32, y: i32) -> Result<Rgb, BackendError> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sample_pixel(x, y)
    }
}

impl<B: Backend> Run<B> {
    /// The main engine task.
    pub fn execute(self) {
        let total = match self.config.mode {
            RunMode::Infinite => None,
            RunMode::Limited(count) => Some(count),
        };
        log::info!(
            "Starting a {} run, safe mode {}",
            self.config.mode,
            if self.config.safe_mode { "on" } else { "off" }
        );

        let mut repetition = 0;
        let completed = loop {
            if !self.shared.is_running() {
                break false;
            }
            if total.is_some_and(|total| repetition >= total) {
                break true;
            }
            repetition += 1;
            self.shared.repetition.store(repetition, Ordering::SeqCst);
            log::debug!("Repetition {repetition}");
            self.notifier.notify(Progress::Repetition {
                current: repetition,
                total,
            });
            match self.pass() {
                LoopFlag::Break => break false,
                LoopFlag::Continue | LoopFlag::Nothing => (),
            }
        };
        self.finish(completed);
    }

    /// Walks the rows once. The length is re-read before every step.
    fn pass(&self) -> LoopFlag {
        let mut index = 0;
        loop {
            if !self.shared.is_running() {
                return LoopFlag::Break;
            }
            let Some(row) = self.row(index) else {
                return LoopFlag::Nothing;
            };
            match self.step(index, &row) {
                LoopFlag::Break => return LoopFlag::Break,
                LoopFlag::Continue | LoopFlag::Nothing => (),
            }
            index += 1;
        }
    }

    /// A copy of the row as it is right now.
    fn row(&self, index: usize) -> Option<Row> {
        self.sequence
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    fn step(&self, index: usize, row: &Row) -> LoopFlag {
        self.shared.set_step(Some(index));
        self.notifier.notify(Progress::StepStarted(index));

        if row.key.trim().is_empty() {
            // Cleared while running
            log::warn!("Row {}: no key, skipping", index + 1);
            let delay = parse_seconds(&row.delay).unwrap_or_default();
            if !self.pause(delay) {
                return LoopFlag::Break;
            }
            self.notifier.notify(Progress::StepCleared(index));
            return LoopFlag::Continue;
        }

        match self.perform(index, row) {
            Ok(Some(delay)) => {
                self.notifier.notify(Progress::StepFinished(index));
                if !self.pause(delay) {
                    return LoopFlag::Break;
                }
                self.notifier.notify(Progress::StepCleared(index));
                LoopFlag::Nothing
            }
            Ok(None) => LoopFlag::Break,
            Err(err) => {
                self.fail(index, row, &err);
                LoopFlag::Break
            }
        }
    }

    /// Runs one row and returns the delay to sleep afterwards, or `None` if the run was stopped
    /// while it waited.
    fn perform(&self, index: usize, row: &Row) -> Result<Option<Duration>, StepError> {
        let (delay, hold) = check_timing(row).map_err(|(field, value)| StepError::InvalidNumber {
            row: index + 1,
            field,
            value,
        })?;
        let action =
            commands::parse_with_timeout(&row.key, self.options.color_timeout)?.with_hold(hold);
        if policy::is_blocked(&action, &row.key, self.config.safe_mode) {
            return Err(StepError::SafeModeBlocked {
                key: row.key.trim().to_string(),
            });
        }

        log::debug!("Row {}: {action}", index + 1);
        if self.dispatch(&action)? {
            Ok(Some(delay))
        } else {
            Ok(None)
        }
    }

    /// Returns false if a colour wait was cancelled.
    fn dispatch(&self, action: &Action) -> Result<bool, StepError> {
        if let Action::WaitColor {
            color,
            x,
            y,
            timeout,
        } = *action
        {
            let found = ColorWait::new(color, (x, y), timeout)
                .tolerance(self.options.tolerance)
                .poll_interval(self.options.poll_interval)
                .run(&Locked(&self.backend), || !self.shared.is_running());
            if found {
                return Ok(true);
            }
            if self.shared.is_running() {
                return Err(StepError::ColorWaitTimeout {
                    color,
                    x,
                    y,
                    timeout,
                });
            }
            log::debug!("colour wait cancelled");
            return Ok(false);
        }

        let mut backend = self.backend.lock().unwrap_or_else(PoisonError::into_inner);
        perform_input(&mut *backend, action, self.options.click_settle)?;
        Ok(true)
    }

    /// Sleeps in poll-interval slices. Returns false if the run stopped meanwhile.
    fn pause(&self, duration: Duration) -> bool {
        let start = Instant::now();
        loop {
            if !self.shared.is_running() {
                return false;
            }
            let elapsed = start.elapsed();
            if elapsed >= duration {
                return true;
            }
            thread::sleep((duration - elapsed).min(self.options.poll_interval));
        }
    }

    /// Reports a fatal error and waits until it is acknowledged.
    fn fail(&self, index: usize, row: &Row, err: &StepError) {
        if matches!(err, StepError::SafeModeBlocked { .. }) {
            log::warn!("Row {}: {err}", index + 1);
        } else {
            log::error!("Row {}: {err}", index + 1);
        }
        self.notifier.notify_blocking(err.notice(row));
        self.shared.request_stop();
    }

    fn finish(&self, completed: bool) {
        let settle = |current| match RunStatus::from_u8(current) {
            RunStatus::EmergencyStopped => None,
            RunStatus::Running if completed => Some(RunStatus::Completed as u8),
            _ => Some(RunStatus::Stopped as u8),
        };
        let _ = self
            .shared
            .status
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, settle);
        self.shared.set_step(None);
        let status = self.shared.status();
        log::info!("Run finished: {status}");
        self.notifier.notify(Progress::HighlightsCleared);
        self.notifier.notify(Progress::Finished(status));
    }
}

/// Executes an input action. A hold, once begun, always completes.
fn perform_input<S: InputSink + ?Sized>(
    sink: &mut S,
    action: &Action,
    settle: Duration,
) -> Result<(), BackendError> {
    match action {
        Action::Press { key, hold } if hold.is_zero() => sink.press(key),
        Action::Press { key, hold } => {
            sink.key_down(key)?;
            thread::sleep(*hold);
            sink.key_up(key)
        }
        Action::Type { text } => sink.type_text(text),
        Action::Click { button, at, hold } => {
            if let Some((x, y)) = *at {
                sink.move_to(x, y)?;
                thread::sleep(settle);
            }
            if hold.is_zero() {
                sink.click(*button)
            } else {
                sink.mouse_down(*button)?;
                thread::sleep(*hold);
                sink.mouse_up(*button)
            }
        }
        Action::MoveTo { x, y } => sink.move_to(*x, *y),
        // Handled by the sampler
        Action::WaitColor { .. } => Ok(()),
    }
}
