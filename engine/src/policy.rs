//! Safe mode.
//!
//! Blocks modifier and window-management keys, plus commands that type, paste or wait on the
//! screen, so an unattended sequence cannot hijack the desktop.

use crate::commands::Action;

/// Keys that are never pressed while safe mode is on.
pub const DANGEROUS_KEYS: [&str; 8] = ["alt", "ctrl", "shift", "win", "cmd", "f4", "delete", "tab"];

/// Command prefixes that are never run while safe mode is on.
pub const GUARDED_COMMANDS: [&str; 4] = ["type(", "paste(", "waitcolor", "ifcolor"];

/// Whether the action parsed from `raw` must not run.
///
/// Matching ignores case. A guarded command is caught anywhere in the text, so `Type(...)` typed
/// literally is blocked as well.
#[must_use]
pub fn is_blocked(action: &Action, raw: &str, safe_mode: bool) -> bool {
    if !safe_mode {
        return false;
    }
    let lowered = raw.trim().to_lowercase();
    let dangerous_key =
        matches!(action, Action::Press { .. }) && DANGEROUS_KEYS.contains(&lowered.as_str());
    dangerous_key || GUARDED_COMMANDS.iter().any(|cmd| lowered.contains(cmd))
}
