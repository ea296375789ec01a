//! Console output for the interactive CLI, with color support.

use std::io::BufRead;

use crate::panel::PanelOutput;
use crate::routing::RoutingOutcome;
use crate::specialists::SpecialistRegistry;
use crate::task::UnitOfWork;

/// Characters of the final response shown after a run.
pub const PREVIEW_CHARS: usize = 500;

/// Available colors for printed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterColor {
    Red,
    Green,
    Yellow,
    Cyan,
    BoldGreen,
    BoldCyan,
    BoldWhite,
}

impl PrinterColor {
    /// ANSI escape code for this color.
    fn ansi_code(&self) -> &'static str {
        match self {
            Self::Red => "\x1b[31m",
            Self::Green => "\x1b[32m",
            Self::Yellow => "\x1b[33m",
            Self::Cyan => "\x1b[36m",
            Self::BoldGreen => "\x1b[1;32m",
            Self::BoldCyan => "\x1b[1;36m",
            Self::BoldWhite => "\x1b[1;37m",
        }
    }
}

/// ANSI reset code.
const RESET: &str = "\x1b[0m";

/// Printer for console output. Color can be switched off for pipes.
#[derive(Debug, Clone)]
pub struct Printer {
    color: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Printer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, content: &str, color: PrinterColor) -> String {
        if self.color {
            format!("{}{}{}", color.ansi_code(), content, RESET)
        } else {
            content.to_string()
        }
    }

    /// Print a message with the specified color.
    pub fn print(&self, content: &str, color: PrinterColor) {
        println!("{}", self.paint(content, color));
    }

    pub fn rule(&self, width: usize) {
        println!("{}", "-".repeat(width));
    }

    /// Title block and the list of available specialists.
    pub fn banner(&self, registry: &SpecialistRegistry, max_experts: usize) {
        println!("\n{}", "=".repeat(60));
        self.print("EXPERT PANEL ASSISTANT", PrinterColor::BoldWhite);
        println!("{}", "=".repeat(60));
        println!("Available experts:");
        for profile in registry.iter() {
            println!("  {}", profile.label());
        }
        println!("At most {} experts will be selected based on relevance.", max_experts);
        self.rule(60);
    }

    /// Selected specialists, plus a visible notice when routing fell back.
    pub fn routing(&self, outcome: &RoutingOutcome, registry: &SpecialistRegistry) {
        println!();
        self.print("🎯 EXPERT ROUTING RESULTS", PrinterColor::BoldCyan);
        self.rule(40);
        for line in routing_lines(outcome, registry) {
            println!("{}", line);
        }
        if outcome.degraded {
            self.print(
                "⚠️  Could not parse expert selection from router output. Using default experts.",
                PrinterColor::Yellow,
            );
        }
        self.rule(40);
    }

    /// One progress line per finished unit.
    pub fn unit_finished(&self, unit: &UnitOfWork) {
        let secs = unit.execution_duration().unwrap_or_default();
        self.print(
            &format!("  ✓ {} ({:.1}s)", unit.id, secs),
            PrinterColor::Green,
        );
    }

    /// Closing block: where the response went and a preview of it.
    pub fn result(&self, output: &PanelOutput, saved_to: &str) {
        println!("\n{}", "=".repeat(60));
        self.print("EXPERT PANEL RESPONSE", PrinterColor::BoldWhite);
        println!("{}", "=".repeat(60));
        self.print(&format!("✅ Full response saved to: {}", saved_to), PrinterColor::BoldGreen);
        println!("\nResponse Preview:");
        self.rule(40);
        println!("{}", preview(&output.final_text, PREVIEW_CHARS));
        println!("\n{}", "=".repeat(60));
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}", self.paint(&format!("❌ {}", message), PrinterColor::Red));
    }

    pub fn step(&self, message: &str) {
        self.print(message, PrinterColor::Cyan);
    }
}

/// `Selected 2 expert(s):` followed by a numbered line per specialist.
pub fn routing_lines(outcome: &RoutingOutcome, registry: &SpecialistRegistry) -> Vec<String> {
    let mut lines = vec![format!("Selected {} expert(s):", outcome.selection.len())];
    for (i, id) in outcome.selection.iter().enumerate() {
        let label = registry
            .get(id)
            .map(|p| p.label())
            .unwrap_or_else(|| id.clone());
        lines.push(format!("  {}. {}", i + 1, label));
    }
    lines
}

/// The first `max_chars` characters of `text`, with `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Read a message until two consecutive blank lines or end of input.
///
/// A single blank line is kept as a paragraph break. The result is trimmed.
pub fn read_message<R: BufRead>(reader: R) -> std::io::Result<String> {
    let mut lines = Vec::new();
    let mut blank_run = 0;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run >= 2 {
                break;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }

    Ok(lines.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{SelectionParser, Router};

    #[test]
    fn test_read_message_stops_after_two_blank_lines() {
        let input = "Subject: Hi\n\nFirst paragraph.\n\n\nIgnored tail\n";
        let message = read_message(input.as_bytes()).unwrap();
        assert_eq!(message, "Subject: Hi\n\nFirst paragraph.");
    }

    #[test]
    fn test_read_message_eof_and_empty() {
        assert_eq!(read_message("one line".as_bytes()).unwrap(), "one line");
        assert_eq!(read_message("\n\n".as_bytes()).unwrap(), "");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 500), "short");
        let long = "é".repeat(600);
        let p = preview(&long, 500);
        assert_eq!(p.chars().count(), 503);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn test_routing_lines() {
        let registry = SpecialistRegistry::builtin().unwrap();
        let router = Router::new(SelectionParser::default(), 3);
        let outcome = router.from_output(&registry, "Selected: Julie Zhuo, Roger Martin".to_string());

        assert_eq!(
            routing_lines(&outcome, &registry),
            vec![
                "Selected 2 expert(s):".to_string(),
                "  1. 👥 Julie Zhuo (Team Dynamics & Scaling)".to_string(),
                "  2. 📈 Roger Martin (Strategy & Market Positioning)".to_string(),
            ]
        );
    }

    #[test]
    fn test_paint_without_color() {
        let printer = Printer::new(false);
        assert_eq!(printer.paint("x", PrinterColor::Red), "x");
        assert_eq!(Printer::default().paint("x", PrinterColor::Red), "\x1b[31mx\x1b[0m");
    }
}
