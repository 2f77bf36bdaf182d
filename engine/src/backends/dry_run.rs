//! A backend that prints what would be done instead of really doing so.

use std::collections::HashMap;

use crate::backends::{Backend, BackendError, InputSink, ScreenSampler};
use crate::commands::{MouseButton, Rgb};

#[derive(Default)]
pub struct DryRun {
    pixels: HashMap<(i32, i32), Rgb>,
    cursor: (i32, i32),
}

impl Backend for DryRun {
    fn name(&self) -> &'static str {
        "dry-run"
    }
}

impl DryRun {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the colour reported for a position. Every other position fails to sample.
    #[must_use]
    pub fn with_pixel(mut self, x: i32, y: i32, color: Rgb) -> Self {
        self.pixels.insert((x, y), color);
        self
    }

    /// Where the cursor would be.
    #[must_use]
    pub fn cursor(&self) -> (i32, i32) {
        self.cursor
    }
}

impl InputSink for DryRun {
    fn press(&mut self, key: &str) -> Result<(), BackendError> {
        log::trace!("Press: {key}");
        Ok(())
    }

    fn key_down(&mut self, key: &str) -> Result<(), BackendError> {
        log::trace!("Key down: {key}");
        Ok(())
    }

    fn key_up(&mut self, key: &str) -> Result<(), BackendError> {
        log::trace!("Key up: {key}");
        Ok(())
    }

    fn type_text(&mut self, text: &str) -> Result<(), BackendError> {
        log::trace!("Type: {text}");
        Ok(())
    }

    fn click(&mut self, button: MouseButton) -> Result<(), BackendError> {
        let (x, y) = self.cursor;
        log::trace!("Click: {button} at ({x}, {y})");
        Ok(())
    }

    fn mouse_down(&mut self, button: MouseButton) -> Result<(), BackendError> {
        log::trace!("Mouse down: {button}");
        Ok(())
    }

    fn mouse_up(&mut self, button: MouseButton) -> Result<(), BackendError> {
        log::trace!("Mouse up: {button}");
        Ok(())
    }

    fn move_to(&mut self, x: i32, y: i32) -> Result<(), BackendError> {
        log::trace!("Move to: ({x}, {y})");
        self.cursor = (x, y);
        Ok(())
    }
}

impl ScreenSampler for DryRun {
    fn sample_pixel(&self, x: i32, y: i32) -> Result<Rgb, BackendError> {
        self.pixels
            .get(&(x, y))
            .copied()
            .ok_or(BackendError::Unavailable { x, y })
    }
}
