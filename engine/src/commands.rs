//! Defines the actions a sequence row can describe.
//!
//! Also provides a function to parse the text of a row into an [`Action`].

use nom::bytes::complete::take_till1;
use nom::character::complete::{char, digit1, multispace0, one_of};
use nom::combinator::{all_consuming, map_res, opt, recognize};
use nom::error::ErrorKind;
use nom::multi::separated_list1;
use nom::sequence::{delimited, pair};
use nom::{IResult, Parser};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// How long a `waitcolor` waits unless the engine is configured otherwise.
pub const DEFAULT_COLOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Named keys a row can press or hold, besides single letters and digits.
const NAMED_KEYS: &[&str] = &[
    "tab", "space", "enter", "esc", "backspace", "delete", "insert",
    "up", "down", "left", "right",
    "home", "end", "pageup", "pagedown",
    "capslock", "numlock", "scrolllock",
    "printscreen", "prntscrn", "prtsc", "pause",
    "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12",
    "f13", "f14", "f15", "f16", "f17", "f18", "f19", "f20", "f21", "f22", "f23", "f24",
    "shift", "ctrl", "alt", "win", "cmd",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    fn from_command(name: &str) -> Option<Self> {
        match name {
            "click" => Some(MouseButton::Left),
            "rclick" => Some(MouseButton::Right),
            "mclick" => Some(MouseButton::Middle),
            _ => None,
        }
    }

    /// The command word that clicks this button.
    #[must_use]
    pub fn command(self) -> &'static str {
        match self {
            MouseButton::Left => "click",
            MouseButton::Right => "rclick",
            MouseButton::Middle => "mclick",
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouseButton::Left => write!(f, "left"),
            MouseButton::Right => write!(f, "right"),
            MouseButton::Middle => write!(f, "middle"),
        }
    }
}

/// A screen colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Whether every channel of `other` is within `tolerance` of this colour.
    #[must_use]
    pub fn matches(self, other: Rgb, tolerance: u8) -> bool {
        self.r.abs_diff(other.r) <= tolerance
            && self.g.abs_diff(other.g) <= tolerance
            && self.b.abs_diff(other.b) <= tolerance
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Presses a key, or holds it down for the given duration.
    Press { key: String, hold: Duration },
    /// Types the text character by character.
    Type { text: String },
    /// Clicks a button, optionally after moving the cursor to a position.
    Click {
        button: MouseButton,
        at: Option<(i32, i32)>,
        hold: Duration,
    },
    /// Moves the cursor.
    MoveTo { x: i32, y: i32 },
    /// Waits until the pixel at the position shows the colour.
    WaitColor {
        color: Rgb,
        x: i32,
        y: i32,
        timeout: Duration,
    },
}

impl Action {
    /// Attaches a hold time. Only presses and clicks can be held.
    #[must_use]
    pub fn with_hold(self, hold: Duration) -> Self {
        match self {
            Action::Press { key, .. } => Action::Press { key, hold },
            Action::Click { button, at, .. } => Action::Click { button, at, hold },
            other => other,
        }
    }

    #[must_use]
    pub fn hold(&self) -> Duration {
        match self {
            Action::Press { hold, .. } | Action::Click { hold, .. } => *hold,
            _ => Duration::ZERO,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Press { key, hold } if hold.is_zero() => write!(f, "press `{key}`"),
            Action::Press { key, hold } => write!(f, "hold `{key}` for {hold:?}"),
            Action::Type { text } => write!(f, "type {text:?}"),
            Action::Click { button, at, hold } => {
                if hold.is_zero() {
                    write!(f, "{button} click")?;
                } else {
                    write!(f, "{button} click held for {hold:?}")?;
                }
                if let Some((x, y)) = at {
                    write!(f, " at ({x}, {y})")?;
                }
                Ok(())
            }
            Action::MoveTo { x, y } => write!(f, "move to ({x}, {y})"),
            Action::WaitColor {
                color,
                x,
                y,
                timeout,
            } => write!(f, "wait for colour {color} at ({x}, {y}) for up to {timeout:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A recognised command got the wrong number of arguments, or an argument that is not an
    /// integer.
    #[error("`{command}` requires integer arguments {expected}")]
    InvalidCommandArguments {
        command: &'static str,
        expected: &'static str,
    },
    /// A colour channel of `waitcolor` does not fit in 0-255.
    #[error("`{command}` colour channel {value} is outside 0-255")]
    ColorOutOfRange { command: &'static str, value: i64 },
}

/// Commands written as `name(args)`.
#[derive(Clone, Copy)]
enum Call {
    Click(MouseButton),
    MoveTo,
    WaitColor,
}

impl Call {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "moveto" => Some(Call::MoveTo),
            "waitcolor" => Some(Call::WaitColor),
            other => MouseButton::from_command(other).map(Call::Click),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Call::Click(button) => button.command(),
            Call::MoveTo => "moveto",
            Call::WaitColor => "waitcolor",
        }
    }

    fn signature(self) -> &'static str {
        match self {
            Call::Click(_) | Call::MoveTo => "(x,y)",
            Call::WaitColor => "(r,g,b,x,y)",
        }
    }

    fn invalid(self) -> ParseError {
        ParseError::InvalidCommandArguments {
            command: self.name(),
            expected: self.signature(),
        }
    }
}

/// Splits `name(args)` on the first `(` and the last `)`.
fn parse_call(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, name) = take_till1(|c: char| c == '(').parse(input)?;
    let (input, _) = char('(').parse(input)?;
    let Some(end) = input.rfind(')') else {
        return Err(nom::Err::Error(nom::error::Error::new(input, ErrorKind::Char)));
    };
    Ok((&input[end + 1..], (name, &input[..end])))
}

fn parse_integer(input: &str) -> IResult<&str, i64> {
    map_res(
        recognize(pair(opt(one_of("+-")), digit1)),
        str::parse::<i64>,
    )
    .parse(input)
}

fn parse_arguments(input: &str) -> IResult<&str, Vec<i64>> {
    all_consuming(separated_list1(
        char(','),
        delimited(multispace0, parse_integer, multispace0),
    ))
    .parse(input)
}

fn build_call(call: Call, args: &str, timeout: Duration) -> Result<Action, ParseError> {
    let Ok((_, values)) = parse_arguments(args) else {
        return Err(call.invalid());
    };
    let coordinate = |value: i64| i32::try_from(value).map_err(|_| call.invalid());
    let channel = |value: i64| {
        u8::try_from(value).map_err(|_| ParseError::ColorOutOfRange {
            command: call.name(),
            value,
        })
    };

    match (call, values.as_slice()) {
        (Call::Click(button), &[x, y]) => Ok(Action::Click {
            button,
            at: Some((coordinate(x)?, coordinate(y)?)),
            hold: Duration::ZERO,
        }),
        (Call::MoveTo, &[x, y]) => Ok(Action::MoveTo {
            x: coordinate(x)?,
            y: coordinate(y)?,
        }),
        (Call::WaitColor, &[r, g, b, x, y]) => Ok(Action::WaitColor {
            color: Rgb::new(channel(r)?, channel(g)?, channel(b)?),
            x: coordinate(x)?,
            y: coordinate(y)?,
            timeout,
        }),
        _ => Err(call.invalid()),
    }
}

/// Whether the lower-cased text names a key that can be pressed or held.
#[must_use]
pub fn is_named_key(lowered: &str) -> bool {
    let mut chars = lowered.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphanumeric() {
            return true;
        }
    }
    NAMED_KEYS.contains(&lowered)
}

/// Parse the text of a row.
///
/// Equivalent to [`parse_with_timeout`] with [`DEFAULT_COLOR_TIMEOUT`].
///
/// # Errors
/// See [`parse_with_timeout`].
pub fn parse(raw: &str) -> Result<Action, ParseError> {
    parse_with_timeout(raw, DEFAULT_COLOR_TIMEOUT)
}

/// Parse the text of a row, giving `waitcolor` the supplied timeout.
///
/// The input is trimmed. Command names and keys are matched case-insensitively, while typed text
/// keeps its case. Anything that is not a command or a named key is typed literally, so plain text
/// never fails to parse.
///
/// # Errors
/// Returns a [`ParseError`] only for a malformed `click(..)`, `rclick(..)`, `mclick(..)`,
/// `moveto(..)` or `waitcolor(..)`.
pub fn parse_with_timeout(raw: &str, timeout: Duration) -> Result<Action, ParseError> {
    let text = raw.trim();
    if let Ok((_, (name, args))) = parse_call(text) {
        if let Some(call) = Call::from_name(&name.to_lowercase()) {
            return build_call(call, args, timeout);
        }
    }

    let lowered = text.to_lowercase();
    if let Some(button) = MouseButton::from_command(&lowered) {
        return Ok(Action::Click {
            button,
            at: None,
            hold: Duration::ZERO,
        });
    }
    if is_named_key(&lowered) {
        return Ok(Action::Press {
            key: text.to_string(),
            hold: Duration::ZERO,
        });
    }
    Ok(Action::Type {
        text: text.to_string(),
    })
}

impl FromStr for Action {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse(value)
    }
}
