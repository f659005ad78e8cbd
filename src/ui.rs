//! Terminal rendering of workflow events: progress bar and coloured output.
//!
//! Uses `indicatif` for the bar and `console` for styling. [`RunProgress`]
//! is driven entirely by [`WorkflowEvent`]s received on the caller's task.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::extractor::ExtractionResult;
use crate::workflow::{AUTHOR_FIELD, IMAGE_URL_FIELD, RunReport, TITLE_FIELD, WorkflowEvent};

/// Progress bar plus the title/author/result lines for one run.
pub struct RunProgress {
    // 0..=100, driven by Progress events.
    pb: ProgressBar,
    // Completed line and report header.
    green: Style,
    // Failed line.
    red: Style,
    // Cancelled line.
    yellow: Style,
    // Field labels.
    bold: Style,
}

impl RunProgress {
    pub fn start() -> Self {
        let pb = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        pb.set_style(style);
        pb.set_message("processing");

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow().bold(),
            bold: Style::new().bold(),
        }
    }

    pub fn handle(&self, event: &WorkflowEvent) {
        match event {
            WorkflowEvent::Progress(fraction) => {
                self.pb.set_position(percent(*fraction));
            }
            WorkflowEvent::FieldsExtracted { title, author } => {
                self.pb.set_message("downloading image");
                self.pb
                    .println(format!("  {} {title}", self.bold.apply_to("title: ")));
                self.pb
                    .println(format!("  {} {author}", self.bold.apply_to("author:")));
            }
            WorkflowEvent::Completed(report) => {
                self.pb.finish_and_clear();
                match &report.image {
                    Some(image) => println!(
                        "  {} Saved {} ({} bytes)",
                        self.green.apply_to("✓"),
                        image.path.display(),
                        image.bytes
                    ),
                    None => println!(
                        "  {} Done, no image URL in input",
                        self.green.apply_to("✓")
                    ),
                }
            }
            WorkflowEvent::Cancelled(message) => {
                self.pb.abandon();
                eprintln!("  {} Stopped: {message}", self.yellow.apply_to("■"));
            }
            WorkflowEvent::Failed(message) => {
                self.pb.abandon();
                eprintln!("  {} {message}", self.red.apply_to("✗"));
            }
        }
    }

    /// Prints the report as pretty JSON.
    pub fn print_report(&self, report: &RunReport) {
        println!();
        println!("{}", self.green.apply_to("─── Run Report ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }
}

/// Prints extracted fields for `pobieracz extract`.
pub fn print_fields(result: &ExtractionResult, unknown: &str) {
    let bold = Style::new().bold();
    for name in [TITLE_FIELD, AUTHOR_FIELD, IMAGE_URL_FIELD] {
        let value = result.get_or(name, unknown);
        println!("{} {value}", bold.apply_to(format!("{name}:")));
    }
}

fn percent(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_and_clamps() {
        assert_eq!(percent(0.0), 0);
        assert_eq!(percent(0.3), 30);
        assert_eq!(percent(1.0), 100);
        assert_eq!(percent(1.7), 100);
        assert_eq!(percent(-0.2), 0);
    }

    #[test]
    fn progress_events_move_the_bar() {
        let progress = RunProgress::start();
        progress.pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        progress.handle(&WorkflowEvent::Progress(0.4));
        assert_eq!(progress.pb.position(), 40);
        progress.handle(&WorkflowEvent::Cancelled("download stopped".into()));
        assert!(progress.pb.is_finished());
    }
}
