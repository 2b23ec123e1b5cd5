//! User interaction primitives.
//!
//! The add workflow only needs a handful of prompts.
//! Every prompt returns `None` when the user cancels.

/// Prompts and messages shown to the user.
pub trait Dialog {
    /// Show an error message.
    fn show_error(&self, message: &str);

    /// Show an informational message.
    fn show_info(&self, message: &str);

    /// Let the user pick one of the items.
    ///
    /// Returns the index of the chosen item.
    fn choose(&self, prompt: &str, items: &[&str], default: Option<usize>) -> Option<usize>;

    /// Ask a yes or no question. `Some(false)` means the user wants to choose something else.
    fn confirm(&self, prompt: &str) -> Option<bool>;

    /// Ask for free text, pre-filled with `default`.
    fn ask_text(&self, prompt: &str, default: &str) -> Option<String>;
}
