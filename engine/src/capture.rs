//! Turns a picked screen position into command text.

use crate::backends::ScreenSampler;
use crate::commands::{MouseButton, Rgb};

/// A screen position and the colour found there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture {
    pub x: i32,
    pub y: i32,
    pub color: Rgb,
}

impl Capture {
    /// Reads the pixel at the position. If that fails the colour is recorded as black.
    pub fn take<S: ScreenSampler + ?Sized>(sampler: &S, x: i32, y: i32) -> Self {
        let color = sampler.sample_pixel(x, y).unwrap_or_else(|err| {
            log::warn!("{err}, recording (0,0,0)");
            Rgb::default()
        });
        Self { x, y, color }
    }

    #[must_use]
    pub fn click_at(&self, button: MouseButton) -> String {
        format!("{}({},{})", button.command(), self.x, self.y)
    }

    #[must_use]
    pub fn move_to(&self) -> String {
        format!("moveto({},{})", self.x, self.y)
    }

    #[must_use]
    pub fn wait_color(&self) -> String {
        let Rgb { r, g, b } = self.color;
        format!("waitcolor({r},{g},{b},{},{})", self.x, self.y)
    }

    #[must_use]
    pub fn coordinates(&self) -> String {
        format!("{},{}", self.x, self.y)
    }

    #[must_use]
    pub fn color(&self) -> String {
        let Rgb { r, g, b } = self.color;
        format!("{r},{g},{b}")
    }

    /// The commands a capture can be inserted as.
    #[must_use]
    pub fn snippets(&self) -> [String; 3] {
        [self.click_at(MouseButton::Left), self.move_to(), self.wait_color()]
    }
}
