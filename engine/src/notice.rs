//! Everything the engine reports to the foreground.
//!
//! Progress and informational notices are fire and forget. A fatal notice holds the engine until
//! the foreground acknowledges it through its [`Inbox`], the way a modal dialog would.

use smol::channel::{Receiver, Sender};
use std::time::Duration;

use crate::commands::Rgb;
use crate::runner::RunStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    SafeModeBlocked,
    ColorNotFound,
    ActionError,
    RuntimeError,
    EmergencyStop,
}

impl NoticeKind {
    /// Whether the engine waits for an acknowledgement after sending this.
    #[must_use]
    pub fn requires_ack(self) -> bool {
        !matches!(self, NoticeKind::EmergencyStop)
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            NoticeKind::SafeModeBlocked => "Safe Mode Block",
            NoticeKind::ColorNotFound => "Wait Color Failed",
            NoticeKind::ActionError => "Action Error",
            NoticeKind::RuntimeError => "Runtime Error",
            NoticeKind::EmergencyStop => "Emergency Stop",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    #[must_use]
    pub fn requires_ack(&self) -> bool {
        self.kind.requires_ack()
    }

    #[must_use]
    pub fn safe_mode_blocked(key: &str) -> Self {
        Self {
            kind: NoticeKind::SafeModeBlocked,
            message: format!("Action '{key}' is blocked in safe mode."),
        }
    }

    #[must_use]
    pub fn color_not_found(color: Rgb, x: i32, y: i32, timeout: Duration) -> Self {
        let Rgb { r, g, b } = color;
        Self {
            kind: NoticeKind::ColorNotFound,
            message: format!(
                "Color ({r},{g},{b}) not found at ({x},{y}) within {}s.\nAutomation stopped.",
                timeout.as_secs_f64()
            ),
        }
    }

    /// A row that could not be turned into an action.
    #[must_use]
    pub fn invalid_action(key: &str, reason: &impl std::fmt::Display) -> Self {
        Self {
            kind: NoticeKind::ActionError,
            message: format!("Error processing action '{key}':\n{reason}\nAutomation stopped."),
        }
    }

    /// An action the backend failed to perform.
    #[must_use]
    pub fn action_error(key: &str, reason: &impl std::fmt::Display) -> Self {
        Self {
            kind: NoticeKind::ActionError,
            message: format!("Error performing action '{key}':\n{reason}\nAutomation stopped."),
        }
    }

    #[must_use]
    pub fn invalid_number(row: usize, delay: &str, hold: &str) -> Self {
        Self {
            kind: NoticeKind::RuntimeError,
            message: format!("Invalid number in Row {row} ('{delay}' or '{hold}'). Stopping."),
        }
    }

    #[must_use]
    pub fn emergency_stop() -> Self {
        Self {
            kind: NoticeKind::EmergencyStop,
            message: "Automation stopped.\nPress Start to begin again.".to_string(),
        }
    }
}

/// Row highlighting and run lifecycle. Rows are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// A pass over the sequence began. `total` is only known for limited runs.
    Repetition { current: u64, total: Option<u64> },
    StepStarted(usize),
    StepFinished(usize),
    StepCleared(usize),
    HighlightsCleared,
    Finished(RunStatus),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Progress(Progress),
    Notice(Notice),
}

impl From<Progress> for Report {
    fn from(value: Progress) -> Self {
        Report::Progress(value)
    }
}

impl From<Notice> for Report {
    fn from(value: Notice) -> Self {
        Report::Notice(value)
    }
}

/// Creates a connected pair.
#[must_use]
pub fn channel() -> (Notifier, Inbox) {
    let (reports_tx, reports_rx) = smol::channel::unbounded();
    let (ack_tx, ack_rx) = smol::channel::bounded(1);
    let (release_tx, release_rx) = smol::channel::bounded(1);
    (
        Notifier {
            reports: reports_tx,
            ack: ack_rx,
            release_tx,
            release_rx,
        },
        Inbox {
            reports: reports_rx,
            ack: ack_tx,
        },
    )
}

/// The engine's end.
#[derive(Clone)]
pub struct Notifier {
    reports: Sender<Report>,
    /// The acknowledgement latch. Holds at most one pending acknowledgement.
    ack: Receiver<()>,
    release_tx: Sender<()>,
    release_rx: Receiver<()>,
}

impl Notifier {
    /// Delivers without waiting. Dropped silently once the inbox is gone.
    pub fn notify(&self, report: impl Into<Report>) {
        if self.reports.try_send(report.into()).is_err() {
            log::trace!("inbox closed, dropping report");
        }
    }

    /// Delivers a notice and blocks until the foreground acknowledges it.
    ///
    /// Returns at once if the inbox is gone or the wait was released with [`Notifier::release`].
    pub fn notify_blocking(&self, notice: Notice) {
        while self.ack.try_recv().is_ok() {}
        if self.reports.try_send(Report::Notice(notice)).is_err() {
            log::debug!("inbox closed, not waiting for an acknowledgement");
            return;
        }
        smol::block_on(smol::future::or(
            async {
                let _ = self.ack.recv().await;
            },
            async {
                let _ = self.release_rx.recv().await;
            },
        ));
    }

    /// Lets the current and every later blocking notice return without an acknowledgement, until
    /// [`Notifier::rearm`] is called.
    pub fn release(&self) {
        let _ = self.release_tx.try_send(());
    }

    /// Withdraws a previous [`Notifier::release`].
    pub fn rearm(&self) {
        while self.release_rx.try_recv().is_ok() {}
    }
}

/// The foreground's end.
#[derive(Clone)]
pub struct Inbox {
    reports: Receiver<Report>,
    ack: Sender<()>,
}

impl Inbox {
    /// Waits for the next report. `None` once the engine is gone and everything was read.
    #[must_use]
    pub fn recv_blocking(&self) -> Option<Report> {
        self.reports.recv_blocking().ok()
    }

    #[must_use]
    pub fn try_recv(&self) -> Option<Report> {
        self.reports.try_recv().ok()
    }

    pub async fn recv(&self) -> Option<Report> {
        self.reports.recv().await.ok()
    }

    /// Sets the latch. Does nothing more when it is already set.
    pub fn acknowledge(&self) {
        let _ = self.ack.try_send(());
    }
}
