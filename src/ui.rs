//! Terminal front end — spinner and colored event output.
//!
//! Uses `indicatif` for the task spinner and `console` for styling.
//! [`TerminalSink`] implements [`NotificationSink`] so the runner can narrate
//! a tutorial run in the terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::runner::NotificationSink;
use crate::sequencer::{Phase, RunReport};

/// Renders sequencer notifications as terminal output.
pub struct TerminalSink {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    // Show per-gate visibility changes, not just arrivals.
    verbose: bool,
}

impl TerminalSink {
    pub fn new(verbose: bool) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            verbose,
        }
    }

    /// Print the run report as pretty JSON under a colored header.
    pub fn print_report(&self, report: &RunReport) {
        let status_style = match report.phase {
            Phase::Finished => &self.green,
            Phase::Idle => &self.yellow,
            _ => &self.red,
        };
        println!();
        println!("{}", status_style.apply_to("─── Run Report ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }
}

impl NotificationSink for TerminalSink {
    fn on_task_changed(&mut self, index: usize, label: &str) {
        if index > 0 {
            self.pb
                .println(format!("  {} Task complete", self.green.apply_to("✓")));
        }
        self.pb.set_message(format!("Task {}: {label}", index + 1));
    }

    fn on_tutorial_completed(&mut self) {
        self.pb
            .println(format!("  {} Task complete", self.green.apply_to("✓")));
        self.pb.finish_and_clear();
        println!("{}", self.green.apply_to("🎉 Tutorial completed!"));
    }

    fn on_checkpoint_visibility(&mut self, course: &str, node: usize, visible: bool) {
        if self.verbose {
            let verb = if visible { "shown" } else { "hidden" };
            self.pb.println(format!("    gate {node} of {course} {verb}"));
        }
    }

    fn on_correct_arrival(&mut self, course: &str, next: usize) {
        self.pb.println(format!(
            "  {} Gate passed, fly gate {next} of {course}",
            self.green.apply_to("✓")
        ));
    }

    fn on_wrong_arrival(&mut self, course: &str, node: usize, expected: usize) {
        self.pb.println(format!(
            "  {} Wrong gate: flew {node}, expected {expected} of {course}",
            self.yellow.apply_to("↻")
        ));
    }

    fn on_lap_completed(&mut self, course: &str) {
        self.pb.println(format!(
            "  {} Course {course} complete",
            self.green.apply_to("✓")
        ));
    }
}
