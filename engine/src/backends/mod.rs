mod dry_run;

pub use dry_run::DryRun;

use thiserror::Error;

use crate::commands::{MouseButton, Rgb};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("input backend failed: {0}")]
    Failed(String),
    #[error("cannot read the pixel at ({x}, {y})")]
    Unavailable { x: i32, y: i32 },
}

/// Keyboard and mouse primitives.
pub trait InputSink {
    fn press(&mut self, key: &str) -> Result<(), BackendError>;
    fn key_down(&mut self, key: &str) -> Result<(), BackendError>;
    fn key_up(&mut self, key: &str) -> Result<(), BackendError>;
    fn type_text(&mut self, text: &str) -> Result<(), BackendError>;
    fn click(&mut self, button: MouseButton) -> Result<(), BackendError>;
    fn mouse_down(&mut self, button: MouseButton) -> Result<(), BackendError>;
    fn mouse_up(&mut self, button: MouseButton) -> Result<(), BackendError>;
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), BackendError>;
}

/// Reads single pixels off the screen.
pub trait ScreenSampler {
    /// # Errors
    /// Any capture failure, including a position off the screen.
    fn sample_pixel(&self, x: i32, y: i32) -> Result<Rgb, BackendError>;
}

/// General trait of a backend the engine can drive.
pub trait Backend: InputSink + ScreenSampler + Send + 'static {
    fn name(&self) -> &'static str;
}
