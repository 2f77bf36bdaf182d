//! Waits for a pixel to show a colour.

use std::thread;
use std::time::{Duration, Instant};

use crate::backends::ScreenSampler;
use crate::commands::Rgb;

/// Largest per-channel difference still counted as a match.
pub const DEFAULT_TOLERANCE: u8 = 10;
/// Time between two samples.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A pending wait for a colour at a screen position.
#[derive(Debug, Clone, Copy)]
pub struct ColorWait {
    pub target: Rgb,
    pub at: (i32, i32),
    pub tolerance: u8,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl ColorWait {
    #[must_use]
    pub fn new(target: Rgb, at: (i32, i32), timeout: Duration) -> Self {
        Self {
            target,
            at,
            tolerance: DEFAULT_TOLERANCE,
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Whether the pixel matches right now. A failed sample never matches.
    pub fn sample<S: ScreenSampler + ?Sized>(&self, sampler: &S) -> bool {
        let (x, y) = self.at;
        match sampler.sample_pixel(x, y) {
            Ok(color) => self.target.matches(color, self.tolerance),
            Err(err) => {
                log::debug!("{err}, counting as no match");
                false
            }
        }
    }

    /// Polls until the colour shows up, the timeout passes or `is_cancelled` returns true.
    ///
    /// Returns true only on a match. A timeout is never reported before `timeout` has elapsed.
    pub fn run<S, F>(&self, sampler: &S, is_cancelled: F) -> bool
    where
        S: ScreenSampler + ?Sized,
        F: Fn() -> bool,
    {
        let start = Instant::now();
        loop {
            if is_cancelled() {
                return false;
            }
            if self.sample(sampler) {
                return true;
            }
            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                return false;
            }
            thread::sleep(self.poll_interval.min(self.timeout - elapsed));
        }
    }
}

/// Waits for `target` at `at`. See [`ColorWait::run`].
pub fn wait_for_color<S, F>(
    sampler: &S,
    target: Rgb,
    at: (i32, i32),
    tolerance: u8,
    timeout: Duration,
    poll_interval: Duration,
    is_cancelled: F,
) -> bool
where
    S: ScreenSampler + ?Sized,
    F: Fn() -> bool,
{
    ColorWait::new(target, at, timeout)
        .tolerance(tolerance)
        .poll_interval(poll_interval)
        .run(sampler, is_cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::BackendError;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(Rgb);
    impl ScreenSampler for Fixed {
        fn sample_pixel(&self, _x: i32, _y: i32) -> Result<Rgb, BackendError> {
            Ok(self.0)
        }
    }

    struct Broken;
    impl ScreenSampler for Broken {
        fn sample_pixel(&self, x: i32, y: i32) -> Result<Rgb, BackendError> {
            Err(BackendError::Unavailable { x, y })
        }
    }

    /// Fails a few times, then reports the colour.
    struct Flaky {
        failures: AtomicUsize,
        color: Rgb,
    }
    impl ScreenSampler for Flaky {
        fn sample_pixel(&self, x: i32, y: i32) -> Result<Rgb, BackendError> {
            if self.failures.load(Ordering::SeqCst) == 0 {
                return Ok(self.color);
            }
            self.failures.fetch_sub(1, Ordering::SeqCst);
            Err(BackendError::Unavailable { x, y })
        }
    }

    #[test]
    fn immediate_match() {
        let start = Instant::now();
        let found = wait_for_color(
            &Fixed(Rgb::new(205, 95, 10)),
            Rgb::new(200, 100, 0),
            (1, 1),
            DEFAULT_TOLERANCE,
            Duration::from_secs(5),
            DEFAULT_POLL_INTERVAL,
            || false,
        );
        assert!(found);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn never_matches() {
        let timeout = Duration::from_millis(350);
        let start = Instant::now();
        let found = ColorWait::new(Rgb::new(0, 0, 0), (0, 0), timeout)
            .poll_interval(Duration::from_millis(50))
            .run(&Fixed(Rgb::new(255, 255, 255)), || false);
        let elapsed = start.elapsed();
        assert!(!found);
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_millis(300));
    }

    #[test]
    fn sampling_errors_keep_polling() {
        let sampler = Flaky {
            failures: AtomicUsize::new(3),
            color: Rgb::new(9, 9, 9),
        };
        let found = ColorWait::new(Rgb::new(9, 9, 9), (0, 0), Duration::from_secs(5))
            .poll_interval(Duration::from_millis(10))
            .run(&sampler, || false);
        assert!(found);

        let found = ColorWait::new(Rgb::new(9, 9, 9), (0, 0), Duration::from_millis(50))
            .poll_interval(Duration::from_millis(10))
            .run(&Broken, || false);
        assert!(!found);
    }

    #[test]
    fn cancelled_while_polling() {
        let ticks = Cell::new(0);
        let start = Instant::now();
        let found = ColorWait::new(Rgb::new(0, 0, 0), (0, 0), Duration::from_secs(30))
            .poll_interval(Duration::from_millis(10))
            .run(&Broken, || {
                ticks.set(ticks.get() + 1);
                ticks.get() > 3
            });
        assert!(!found);
        assert_eq!(ticks.get(), 4);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
