//! Help text rendered from registry metadata.

use std::fmt::Write as _;

use super::entry::CommandEntry;
use super::{CommandRegistry, ParamShape};

impl<T> CommandRegistry<T> {
    /// Lists every command with its usage and description.
    #[must_use]
    pub fn help(&self) -> String {
        let rows: Vec<(String, &CommandEntry<T>)> = self
            .commands()
            .map(|entry| (usage(entry), entry))
            .collect();
        let width = rows.iter().map(|(usage, _)| usage.len()).max().unwrap_or(0);
        let mut text = String::from("Available commands:\n");
        for (usage, entry) in rows {
            let _ = write!(text, "  {usage:<width$}  {}", entry.description());
            if !entry.aliases().is_empty() {
                let _ = write!(text, " (aliases: {})", entry.aliases().join(", "));
            }
            text.push('\n');
        }
        text
    }

    /// Renders detailed help for one command, or `None` if it is unknown.
    #[must_use]
    pub fn help_for(&self, name: &str) -> Option<String> {
        let entry = self.get(name)?;
        let mut text = format!("Usage: {}\n", usage(entry));
        if !entry.description().is_empty() {
            let _ = writeln!(text, "{}", entry.description());
        }
        if !entry.aliases().is_empty() {
            let _ = writeln!(text, "Aliases: {}", entry.aliases().join(", "));
        }
        let documented: Vec<_> = entry
            .docs()
            .iter()
            .filter(|doc| !doc.description.is_empty())
            .collect();
        if !documented.is_empty() {
            text.push_str("Arguments:\n");
            let width = documented.iter().map(|doc| doc.name.len()).max().unwrap_or(0);
            for doc in documented {
                let _ = writeln!(text, "  {:<width$}  {}", doc.name, doc.description);
            }
        }
        Some(text)
    }
}

/// Single-line usage form, e.g. `greet <name> [times]`.
pub(crate) fn usage<T>(entry: &CommandEntry<T>) -> String {
    let mut line = entry.name().to_owned();
    for (spec, name) in entry.positional() {
        line.push(' ');
        match spec.shape {
            ParamShape::Required => {
                let _ = write!(line, "<{name}>");
            }
            ParamShape::Optional => {
                let _ = write!(line, "[{name}]");
            }
            _ => {
                let _ = write!(line, "[{name}...]");
            }
        }
    }
    line
}
