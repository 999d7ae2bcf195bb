//! Terminal palette.
//!
//! Catppuccin-style names over plain ANSI bright colors, so output looks the
//! same on terminals without truecolor support.

use colored::{ColoredString, Colorize};

pub trait CatppuccinExt {
    fn ctp_red(&self) -> ColoredString;
    fn ctp_yellow(&self) -> ColoredString;
    fn ctp_green(&self) -> ColoredString;
    fn sky(&self) -> ColoredString;
    fn lavender(&self) -> ColoredString;
    fn subtext0(&self) -> ColoredString;
    fn ctp_white(&self) -> ColoredString;
}

impl<S: AsRef<str>> CatppuccinExt for S {
    fn ctp_red(&self) -> ColoredString {
        self.as_ref().bright_red()
    }

    fn ctp_yellow(&self) -> ColoredString {
        self.as_ref().bright_yellow()
    }

    fn ctp_green(&self) -> ColoredString {
        self.as_ref().bright_green()
    }

    // Sky -> bright cyan
    fn sky(&self) -> ColoredString {
        self.as_ref().bright_cyan()
    }

    // Lavender -> bright blue
    fn lavender(&self) -> ColoredString {
        self.as_ref().bright_blue()
    }

    fn subtext0(&self) -> ColoredString {
        self.as_ref().white()
    }

    fn ctp_white(&self) -> ColoredString {
        self.as_ref().bright_white()
    }
}
