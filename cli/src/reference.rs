//! The key reference printed by `keyclickctl keys`.

use keyclicker::Hotkey;
use keyclicker::policy::{DANGEROUS_KEYS, GUARDED_COMMANDS};
use std::fmt::Write;

const ROWS: &str = "\
Each row holds a key, button, command or text, a delay and a hold time.
The delay (seconds) is waited after the action, the hold time (seconds) keeps a key or button
pressed.

Keys:
  a-z, 0-9
  tab, space, enter, esc, backspace, delete, insert
  up, down, left, right, home, end, pageup, pagedown
  capslock, numlock, scrolllock, printscreen (prntscrn, prtsc), pause
  f1-f24
  shift, ctrl, alt, win, cmd

Mouse, at the cursor:
  click, rclick, mclick

Mouse, at a position:
  moveto(x,y)     move the cursor
  click(x,y)      move, then left click
  rclick(x,y)     move, then right click
  mclick(x,y)     move, then middle click

Colour:
  waitcolor(r,g,b,x,y)
                  wait until the pixel at (x,y) shows the colour, give up after the timeout

Anything else is typed character by character, e.g. `Hello World!`.
";

/// Builds the whole reference text.
pub fn text() -> String {
    let mut text = String::from(ROWS);
    let _ = write!(
        text,
        "\nSafe mode blocks the keys {} and any row containing {}.\n\nHotkeys:\n",
        DANGEROUS_KEYS.join(", "),
        GUARDED_COMMANDS
            .iter()
            .map(|command| format!("`{command}`"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    for hotkey in Hotkey::ALL {
        let _ = writeln!(text, "  {:<16}{hotkey}", hotkey.binding());
    }
    text
}
