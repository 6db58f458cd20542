//! Terminal colors for the text report.

use console::Style;
use uncov_core::Colorize;

pub struct TerminalColors {
    critical: Style,
    warning: Style,
    success: Style,
}

impl TerminalColors {
    /// Colors for stdout, or `None` when disabled or unsupported.
    pub fn detect(disabled: bool) -> Option<Self> {
        if disabled || !console::colors_enabled() {
            return None;
        }
        Some(Self::new())
    }

    fn new() -> Self {
        Self {
            critical: Style::new().red().bold(),
            warning: Style::new().yellow(),
            success: Style::new().green(),
        }
    }
}

impl Colorize for TerminalColors {
    fn critical(&self, text: &str) -> String {
        self.critical.apply_to(text).to_string()
    }

    fn warning(&self, text: &str) -> String {
        self.warning.apply_to(text).to_string()
    }

    fn success(&self, text: &str) -> String {
        self.success.apply_to(text).to_string()
    }
}
