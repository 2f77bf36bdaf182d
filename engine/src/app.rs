//! `keyclicker` entry
//!
//! A headless foreground for the engine. It loads a saved sequence, runs it on the dry-run
//! backend and stands in for the dialogs of a desktop front end: notices are printed, and the
//! user answers them on stdin.
//!
//! SIGINT triggers an emergency stop, SIGTERM a normal stop.

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use smol::Timer;
use smol::io::{AsyncBufReadExt, BufReader};
use smol::stream::StreamExt;
use std::error::Error;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use crate::backends::{Backend, DryRun};
use crate::cli::CFG;
use crate::hotkeys::Hotkey;
use crate::notice::{Inbox, Notice, Progress, Report};
use crate::runner::{Engine, RunConfig, RunStatus};
use crate::sequence::Sequence;

/// How often pending signals are looked at.
const TICK: Duration = Duration::from_millis(50);

static PENDING_SIGNAL: AtomicI32 = AtomicI32::new(0);

extern "C" fn on_signal(signal: nix::libc::c_int) {
    PENDING_SIGNAL.store(signal, Ordering::SeqCst);
}

fn install_signal_handlers() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only stores to an atomic
        unsafe { sigaction(signal, &action) }?;
    }
    Ok(())
}

fn take_signal() -> Option<Hotkey> {
    match Signal::try_from(PENDING_SIGNAL.swap(0, Ordering::SeqCst)) {
        Ok(Signal::SIGINT) => Some(Hotkey::EmergencyStop),
        Ok(Signal::SIGTERM) => Some(Hotkey::Stop),
        _ => None,
    }
}

fn setup_logger(level: log::LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                message
            ));
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

enum Event {
    Report(Option<Report>),
    Line(Option<String>),
    Tick,
}

/// State of the foreground between two events.
struct Foreground {
    engine: Engine<DryRun>,
    config: RunConfig,
    stdin_open: bool,
    /// A notice is on screen and waits for `ack`.
    awaiting_ack: bool,
}

impl Foreground {
    /// Returns false once the run is over.
    fn report(&mut self, inbox: &Inbox, report: Report) -> bool {
        match report {
            Report::Progress(progress) => return self.progress(progress),
            Report::Notice(notice) => self.notice(inbox, &notice),
        }
        true
    }

    fn progress(&mut self, progress: Progress) -> bool {
        match progress {
            Progress::Repetition {
                current,
                total: Some(total),
            } => log::info!("Running (Loop {current}/{total})"),
            Progress::Repetition {
                current,
                total: None,
            } => log::info!("Running (Loop {current})"),
            Progress::StepStarted(index) => log::debug!("► row {}", index + 1),
            Progress::StepFinished(index) => log::debug!("✓ row {}", index + 1),
            Progress::StepCleared(_) | Progress::HighlightsCleared => (),
            Progress::Finished(status) => {
                log::info!("Status: {status}");
                return false;
            }
        }
        true
    }

    fn notice(&mut self, inbox: &Inbox, notice: &Notice) {
        println!("== {} ==\n{}", notice.title(), notice.message);
        if !notice.requires_ack() {
            return;
        }
        if self.stdin_open {
            println!("Type `ack` to continue.");
            self.awaiting_ack = true;
        } else {
            log::warn!("stdin is closed, acknowledging by myself");
            inbox.acknowledge();
        }
    }

    fn line(&mut self, inbox: &Inbox, line: &str) {
        let line = line.trim();
        if matches!(line, "ack" | "ok") {
            if !self.awaiting_ack {
                log::debug!("nothing to acknowledge");
            }
            self.awaiting_ack = false;
            inbox.acknowledge();
            return;
        }
        match line.parse::<Hotkey>() {
            Ok(hotkey) => self.hotkey(hotkey),
            Err(err) => log::warn!("{err}, expected one of `ack`, `stop`, `esc`"),
        }
    }

    /// Shows notices that arrived after the run finished and returns how many.
    fn drain(&mut self, inbox: &Inbox) -> usize {
        let mut shown = 0;
        while let Some(report) = inbox.try_recv() {
            if let Report::Notice(notice) = report {
                self.notice(inbox, &notice);
                shown += 1;
            }
        }
        shown
    }

    fn hotkey(&mut self, hotkey: Hotkey) {
        match self.engine.trigger(hotkey, &self.config) {
            Ok(true) => (),
            Ok(false) => log::debug!("{hotkey} had no effect"),
            Err(err) => log::error!("{err}"),
        }
    }
}

/// The real start.
///
/// # Errors
/// Fatal errors that will cause the program to exit will be returned here.
pub async fn start() -> Result<(), Box<dyn Error>> {
    setup_logger(CFG.level)?;
    install_signal_handlers()
        .inspect_err(|err| eprintln!("failed to install signal handlers: {err}"))?;

    let mut sequence = Sequence::new();
    let saved = sequence.load_file(&CFG.config).inspect_err(|err| {
        eprintln!("failed to load {}: {err}", CFG.config.display());
    })?;
    let config = RunConfig {
        mode: CFG.mode.unwrap_or(saved.mode),
        safe_mode: CFG.safe_mode.unwrap_or(saved.safe_mode),
    };
    log::info!(
        "Loaded {} rows from {}",
        sequence.len(),
        CFG.config.display()
    );

    let backend = CFG
        .pixels
        .iter()
        .fold(DryRun::new(), |backend, &(x, y, color)| {
            backend.with_pixel(x, y, color)
        });
    let (engine, inbox) = Engine::new(backend, sequence.shared(), CFG.options);
    log::info!(
        "Using the {} backend",
        engine
            .backend()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .name()
    );
    let mut foreground = Foreground {
        engine,
        config,
        stdin_open: true,
        awaiting_ack: false,
    };
    if !foreground.engine.trigger(Hotkey::Start, &config)? {
        return Err("the engine did not start".into());
    }

    let mut lines = BufReader::new(smol::Unblock::new(std::io::stdin())).lines();
    loop {
        let stdin_open = foreground.stdin_open;
        let event = smol::future::or(
            async { Event::Report(inbox.recv().await) },
            smol::future::or(
                async {
                    if stdin_open {
                        Event::Line(lines.next().await.and_then(Result::ok))
                    } else {
                        smol::future::pending().await
                    }
                },
                async {
                    Timer::after(TICK).await;
                    Event::Tick
                },
            ),
        )
        .await;

        match event {
            Event::Report(Some(report)) => {
                if !foreground.report(&inbox, report) {
                    foreground.drain(&inbox);
                    break;
                }
            }
            Event::Report(None) => break,
            Event::Line(Some(line)) => foreground.line(&inbox, &line),
            Event::Line(None) => {
                log::debug!("stdin closed");
                foreground.stdin_open = false;
                if foreground.awaiting_ack {
                    inbox.acknowledge();
                }
            }
            Event::Tick => {
                if let Some(hotkey) = take_signal() {
                    foreground.hotkey(hotkey);
                }
            }
        }
    }

    let status = foreground.engine.join();
    if status == RunStatus::Completed {
        println!("Automation completed.");
    }
    Ok(())
}
