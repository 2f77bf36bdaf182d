//! Do some preparations for integration tests

#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, LazyLock, Mutex, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use keyclicker::{
    Backend, BackendError, Engine, EngineOptions, Inbox, InputSink, MouseButton, Notice, Report,
    Rgb, Row, ScreenSampler, Sequence,
};

pub static CAPTURED: LazyLock<Arc<RwLock<String>>> =
    LazyLock::new(|| Arc::new(RwLock::new(String::new())));

struct Capturer {
    content: Arc<RwLock<String>>,
}
impl std::io::Write for Capturer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut locked = self.content.write().unwrap();
        let got = String::from_utf8_lossy(buf);
        locked.push_str(&got);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Routes logs into [`CAPTURED`]. Safe to call from every test.
pub fn setup() {
    let cap = Capturer {
        content: CAPTURED.clone(),
    };
    let _ = env_logger::builder()
        .is_test(true)
        .format(|buf, record| writeln!(buf, "{} {}", record.level(), record.args()))
        .filter_level(log::LevelFilter::Trace)
        .target(env_logger::Target::Pipe(Box::new(cap)))
        .try_init();
}

pub fn captured() -> String {
    CAPTURED.read().expect("Cannot read captured log").clone()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Press(String),
    KeyDown(String),
    KeyUp(String),
    Type(String),
    Click(MouseButton),
    MouseDown(MouseButton),
    MouseUp(MouseButton),
    MoveTo(i32, i32),
}

/// Remembers every input it is given. Clones share the record.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
    pixel: Option<Rgb>,
    fail_on: Option<String>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every position reads as this colour.
    pub fn with_pixel(mut self, color: Rgb) -> Self {
        self.pixel = Some(color);
        self
    }

    /// Pressing or typing `key` fails.
    pub fn failing_on(mut self, key: &str) -> Self {
        self.fail_on = Some(key.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&mut self, call: Call) -> Result<(), BackendError> {
        let failing = match (&call, &self.fail_on) {
            (Call::Press(key) | Call::Type(key), Some(bad)) => key == bad,
            _ => false,
        };
        if failing {
            return Err(BackendError::Failed("device unplugged".to_string()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl InputSink for Recorder {
    fn press(&mut self, key: &str) -> Result<(), BackendError> {
        self.record(Call::Press(key.to_string()))
    }
    fn key_down(&mut self, key: &str) -> Result<(), BackendError> {
        self.record(Call::KeyDown(key.to_string()))
    }
    fn key_up(&mut self, key: &str) -> Result<(), BackendError> {
        self.record(Call::KeyUp(key.to_string()))
    }
    fn type_text(&mut self, text: &str) -> Result<(), BackendError> {
        self.record(Call::Type(text.to_string()))
    }
    fn click(&mut self, button: MouseButton) -> Result<(), BackendError> {
        self.record(Call::Click(button))
    }
    fn mouse_down(&mut self, button: MouseButton) -> Result<(), BackendError> {
        self.record(Call::MouseDown(button))
    }
    fn mouse_up(&mut self, button: MouseButton) -> Result<(), BackendError> {
        self.record(Call::MouseUp(button))
    }
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), BackendError> {
        self.record(Call::MoveTo(x, y))
    }
}

impl ScreenSampler for Recorder {
    fn sample_pixel(&self, x: i32, y: i32) -> Result<Rgb, BackendError> {
        self.pixel.ok_or(BackendError::Unavailable { x, y })
    }
}

impl Backend for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }
}

/// Short enough that no test waits long.
pub fn fast_options() -> EngineOptions {
    EngineOptions {
        tolerance: 10,
        poll_interval: Duration::from_millis(10),
        color_timeout: Duration::from_millis(300),
        click_settle: Duration::ZERO,
    }
}

pub fn engine(rows: Vec<Row>, backend: &Recorder) -> (Engine<Recorder>, Inbox) {
    setup();
    Engine::new(
        backend.clone(),
        Sequence::from_rows(rows).shared(),
        fast_options(),
    )
}

/// Polls until `check` holds. Panics after five seconds.
pub fn wait_until(what: &str, check: impl Fn() -> bool) {
    let start = Instant::now();
    while !check() {
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "timed out waiting for {what}"
        );
        thread::sleep(Duration::from_millis(5));
    }
}

/// The next notice, skipping progress reports.
pub fn next_notice(inbox: &Inbox) -> Notice {
    let start = Instant::now();
    loop {
        match inbox.try_recv() {
            Some(Report::Notice(notice)) => return notice,
            Some(Report::Progress(_)) => (),
            None => {
                assert!(
                    start.elapsed() < Duration::from_secs(5),
                    "timed out waiting for a notice"
                );
                thread::sleep(Duration::from_millis(5));
            }
        }
    }
}

/// Everything reported so far.
pub fn drain(inbox: &Inbox) -> Vec<Report> {
    std::iter::from_fn(|| inbox.try_recv()).collect()
}
