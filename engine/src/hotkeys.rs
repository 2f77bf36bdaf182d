//! The three global triggers. Registering them with the desktop is up to the foreground.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hotkey {
    Start,
    Stop,
    EmergencyStop,
}

#[derive(Debug, PartialEq, Error)]
#[error("unknown hotkey `{0}`")]
pub struct UnknownHotkey(pub String);

impl Hotkey {
    pub const ALL: [Hotkey; 3] = [Hotkey::Start, Hotkey::Stop, Hotkey::EmergencyStop];

    /// The default key combination.
    #[must_use]
    pub fn binding(self) -> &'static str {
        match self {
            Hotkey::Start => "ctrl+f2",
            Hotkey::Stop => "ctrl+f3",
            Hotkey::EmergencyStop => "esc",
        }
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hotkey::Start => write!(f, "start"),
            Hotkey::Stop => write!(f, "stop"),
            Hotkey::EmergencyStop => write!(f, "emergency stop"),
        }
    }
}

impl FromStr for Hotkey {
    type Err = UnknownHotkey;

    /// Accepts a default binding or the name of the trigger. Case and spaces are ignored.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised: String = value
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match normalised.as_str() {
            "ctrl+f2" | "start" => Ok(Hotkey::Start),
            "ctrl+f3" | "stop" => Ok(Hotkey::Stop),
            "esc" | "escape" | "emergency" | "emergencystop" => Ok(Hotkey::EmergencyStop),
            _ => Err(UnknownHotkey(value.trim().to_string())),
        }
    }
}
