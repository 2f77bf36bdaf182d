//! Replays sequences of key presses, clicks, cursor moves and pixel-colour waits.
//!
//! A foreground owns a [`Sequence`] and shares it with an [`Engine`], which replays it on its own
//! thread through a [`Backend`]. The engine reports progress and errors to an [`Inbox`].

pub mod app;
pub mod backends;
pub mod capture;
mod cli;
pub mod commands;
pub mod config;
pub mod hotkeys;
pub mod notice;
pub mod policy;
pub mod runner;
pub mod sampler;
pub mod sequence;

pub use backends::{Backend, BackendError, DryRun, InputSink, ScreenSampler};
pub use capture::Capture;
pub use commands::{Action, MouseButton, ParseError, Rgb, parse, parse_with_timeout};
pub use config::ConfigError;
pub use hotkeys::Hotkey;
pub use notice::{Inbox, Notice, NoticeKind, Progress, Report};
pub use policy::is_blocked;
pub use runner::{
    Engine, EngineOptions, RunConfig, RunMode, RunState, RunStatus, StepError, ValidationError,
};
pub use sampler::wait_for_color;
pub use sequence::{Row, Sequence, SequenceError, SharedSequence};
