//! Human-facing console formatting. Colorized when stdout is a TTY,
//! plain otherwise — `--json` bypasses this entirely and serializes the
//! view model directly.

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

pub fn color_enabled() -> bool {
    std::io::stdout().is_terminal()
}

pub fn heading(text: &str) -> String {
    if color_enabled() {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

pub fn dim(text: &str) -> String {
    if color_enabled() {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

pub fn success(text: &str) -> String {
    if color_enabled() {
        text.green().to_string()
    } else {
        text.to_string()
    }
}

pub fn warn(text: &str) -> String {
    if color_enabled() {
        text.yellow().to_string()
    } else {
        text.to_string()
    }
}

/// Prints `value` as pretty JSON if `json` is set, otherwise runs
/// `human` to print the human-formatted view. Centralizes the one
/// branch every handler otherwise repeats.
pub fn render<T: serde::Serialize>(json: bool, value: &T, human: impl FnOnce()) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human();
    }
    Ok(())
}
