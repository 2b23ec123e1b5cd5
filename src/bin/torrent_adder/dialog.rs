//! Dialog back-ends for torrent-adder.
//!
//! Native macOS dialogs through `osascript`, or plain terminal prompts.

use std::io::{self, BufRead, Write};
use std::process::Command;
use std::sync::LazyLock;

use colored::Colorize;
use regex::Regex;
use torrent_adder::dialog::Dialog;
use torrent_adder::{print_error, print_warning};

const DIALOG_TITLE: &str = "Torrent Adder";

static TEXT_RETURNED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"text returned:(.*)$").expect("Failed to compile text returned regex"));

/// Native dialogs using AppleScript.
#[derive(Debug, Default)]
pub struct AppleScriptDialog;

/// Prompts on stdin and stdout.
#[derive(Debug, Default)]
pub struct TerminalDialog;

impl AppleScriptDialog {
    /// Run an AppleScript and return its output.
    ///
    /// Returns `None` if the script failed, which includes the user pressing cancel.
    fn run(script: &str) -> Option<String> {
        match Command::new("osascript").arg("-e").arg(script).output() {
            Ok(output) if output.status.success() => Some(String::from_utf8_lossy(&output.stdout).trim().to_string()),
            Ok(_) => None,
            Err(error) => {
                print_error!("Failed to run osascript: {error}");
                None
            }
        }
    }

    fn message_script(message: &str, icon: &str) -> String {
        format!(
            r#"display dialog "{}" with title "{DIALOG_TITLE}" buttons {{"OK"}} default button "OK" with icon {icon}"#,
            escape_applescript(message)
        )
    }
}

impl Dialog for AppleScriptDialog {
    fn show_error(&self, message: &str) {
        Self::run(&Self::message_script(message, "stop"));
    }

    fn show_info(&self, message: &str) {
        Self::run(&Self::message_script(message, "note"));
    }

    fn choose(&self, prompt: &str, items: &[&str], default: Option<usize>) -> Option<usize> {
        let default_item = default.and_then(|index| items.get(index)).or_else(|| items.first())?;
        let items_list = items
            .iter()
            .map(|item| format!("\"{}\"", escape_applescript(item)))
            .collect::<Vec<_>>()
            .join(", ");
        let script = format!(
            r#"choose from list {{{items_list}}} with prompt "{}" with title "{DIALOG_TITLE}" default items {{"{}"}}"#,
            escape_applescript(prompt),
            escape_applescript(default_item)
        );

        let selected = Self::run(&script)?;
        if selected == "false" {
            return None;
        }
        items.iter().position(|item| *item == selected)
    }

    fn confirm(&self, prompt: &str) -> Option<bool> {
        let script = format!(
            r#"display dialog "{}" with title "{DIALOG_TITLE}" buttons {{"Choose Other", "Yes"}} default button "Yes""#,
            escape_applescript(prompt)
        );
        Self::run(&script).map(|result| result.contains("Yes"))
    }

    fn ask_text(&self, prompt: &str, default: &str) -> Option<String> {
        let script = format!(
            r#"display dialog "{}" with title "{DIALOG_TITLE}" default answer "{}" buttons {{"Cancel", "OK"}} default button "OK""#,
            escape_applescript(prompt),
            escape_applescript(default)
        );
        Self::run(&script).and_then(|result| parse_text_returned(&result))
    }
}

impl TerminalDialog {
    /// Print a prompt and read one line.
    ///
    /// Returns `None` on end of input or a read error.
    fn read_line(prompt: &str) -> Option<String> {
        print!("{prompt} ");
        if let Err(error) = io::stdout().flush() {
            print_warning!("Failed to flush stdout: {error}");
        }

        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(0) => None,
            Ok(_) => Some(input.trim().to_string()),
            Err(error) => {
                print_error!("Failed to read input: {error}");
                None
            }
        }
    }
}

impl Dialog for TerminalDialog {
    fn show_error(&self, message: &str) {
        eprintln!("{}", message.red());
    }

    fn show_info(&self, message: &str) {
        println!("{}", message.green());
    }

    fn choose(&self, prompt: &str, items: &[&str], default: Option<usize>) -> Option<usize> {
        println!("{}", prompt.bold());
        for (index, item) in items.iter().enumerate() {
            println!("  {:>2}) {item}", index + 1);
        }
        let hint = default.map_or_else(
            || "(number, q to cancel):".to_string(),
            |index| format!("(number, q to cancel, default {}):", index + 1),
        );
        let input = Self::read_line(&hint.dimmed().to_string())?;
        parse_choice(&input, items.len(), default)
    }

    fn confirm(&self, prompt: &str) -> Option<bool> {
        println!("{}", prompt.bold());
        let input = Self::read_line(&"[Y]es / [n]o, choose other / [q]uit:".dimmed().to_string())?;
        parse_confirm(&input)
    }

    fn ask_text(&self, prompt: &str, default: &str) -> Option<String> {
        let input = Self::read_line(&format!("{} {}", prompt.bold(), format!("({default}):").dimmed()))?;
        if input.is_empty() {
            Some(default.to_string())
        } else {
            Some(input)
        }
    }
}

/// Escape a string for use inside an AppleScript string literal.
fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Get the entered text from a `display dialog` result.
fn parse_text_returned(result: &str) -> Option<String> {
    TEXT_RETURNED_RE
        .captures(result)
        .and_then(|captures| captures.get(1))
        .map(|text| text.as_str().trim().to_string())
}

/// Parse a one-based list selection.
fn parse_choice(input: &str, count: usize, default: Option<usize>) -> Option<usize> {
    let input = input.trim();
    if input.is_empty() {
        return default.filter(|&index| index < count);
    }
    if input.eq_ignore_ascii_case("q") {
        return None;
    }
    input
        .parse::<usize>()
        .ok()
        .filter(|&number| (1..=count).contains(&number))
        .map(|number| number - 1)
}

fn parse_confirm(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
