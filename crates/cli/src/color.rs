// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal colors for help text and service listings

use clap::builder::styling::{Ansi256Color, Color, Style, Styles};
use std::io::IsTerminal;

/// What a painted span means; each tone maps to one 256-color code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Service names and help section headers
    Name,
    /// Flags and other literals in help output
    Literal,
    /// Paths and secondary columns
    Dim,
}

impl Tone {
    fn code(self) -> u8 {
        match self {
            Tone::Name => 74,
            Tone::Literal => 250,
            Tone::Dim => 245,
        }
    }

    fn style(self) -> Style {
        Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(self.code()))))
    }
}

/// `NO_COLOR=1` beats `COLOR=1`, which beats the TTY check.
fn decide(no_color: Option<String>, color: Option<String>, tty: bool) -> bool {
    if no_color.as_deref() == Some("1") {
        return false;
    }
    color.as_deref() == Some("1") || tty
}

pub fn should_colorize() -> bool {
    decide(
        std::env::var("NO_COLOR").ok(),
        std::env::var("COLOR").ok(),
        std::io::stdout().is_terminal(),
    )
}

/// Clap help styles in the kiln palette.
pub fn styles() -> Styles {
    if !should_colorize() {
        return Styles::plain();
    }
    Styles::styled()
        .header(Tone::Name.style())
        .literal(Tone::Literal.style())
        .placeholder(Tone::Dim.style())
}

pub fn paint(tone: Tone, text: &str) -> String {
    if !should_colorize() {
        return text.to_string();
    }
    let style = tone.style();
    format!("{}{text}{}", style.render(), style.render_reset())
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
