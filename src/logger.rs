use std::sync::{Arc, Mutex};
use std::time::Duration;

use atty::Stream as AttyStream;
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::scenario::{ScenarioOutcome, ScenarioReport};

#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    is_tty: bool,
    stdout: Mutex<()>,
    stderr: Mutex<()>,
}

#[derive(Copy, Clone)]
enum LogLevel {
    Info,
    Success,
    Warn,
    Error,
    Detail,
}

#[derive(Copy, Clone)]
enum LogTarget {
    Stdout,
    Stderr,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                is_tty: atty::is(AttyStream::Stdout),
                stdout: Mutex::new(()),
                stderr: Mutex::new(()),
            }),
        }
    }

    pub fn is_tty(&self) -> bool {
        self.inner.is_tty
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(None, LogLevel::Info, message.into());
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(None, LogLevel::Success, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(None, LogLevel::Warn, message.into());
    }

    pub fn warn_with_progress(&self, pb: Option<&ProgressBar>, message: impl Into<String>) {
        self.log(pb, LogLevel::Warn, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(None, LogLevel::Error, message.into());
    }

    pub fn detail(&self, pb: Option<&ProgressBar>, message: impl Into<String>) {
        self.log(pb, LogLevel::Detail, message.into());
    }

    pub fn blank(&self) {
        println!();
    }

    pub fn scenario_banner(&self, name: &str, total_steps: usize) {
        let text = style(format!("{name} • {total_steps} steps")).cyan().bold();
        self.log(None, LogLevel::Info, text.to_string());
    }

    /// One bar per scenario, TTY only. Log lines while the bar is live must
    /// go through the `pb`-taking methods so they suspend it.
    pub fn step_progress(&self, total_steps: usize, name: &str) -> Option<ProgressBar> {
        if !self.is_tty() {
            return None;
        }

        let pb = ProgressBar::with_draw_target(
            Some(total_steps as u64),
            ProgressDrawTarget::stderr_with_hz(20),
        );
        let bar_style = ProgressStyle::with_template(
            "{prefix} {wide_bar} {pos}/{len} [{elapsed_precise}] {msg}",
        )
        .unwrap()
        .progress_chars("█▉▊▋▌▍▎▏  ");
        pb.set_style(bar_style);
        pb.set_prefix(style(name.to_string()).cyan().bold().to_string());
        pb.enable_steady_tick(Duration::from_millis(150));
        Some(pb)
    }

    pub fn step_start(&self, pb: Option<&ProgressBar>, description: &str) {
        if let Some(pb) = pb {
            pb.set_message(description.to_string());
        } else {
            self.log(None, LogLevel::Detail, description.to_string());
        }
    }

    pub fn step_pass(&self, pb: Option<&ProgressBar>, description: &str, elapsed_ms: f64) {
        let message = format!("{description} – {elapsed_ms:.1}ms");
        if let Some(pb) = pb {
            pb.inc(1);
            pb.set_message(self.render_line(LogLevel::Success, message));
        } else {
            self.log(None, LogLevel::Success, message);
        }
    }

    pub fn step_fail(&self, pb: Option<&ProgressBar>, description: &str, reason: &str) {
        let rendered = self.render_line(LogLevel::Error, format!("{description}: {reason}"));
        if let Some(pb) = pb {
            pb.inc(1);
            pb.println(rendered.clone());
            pb.set_message(rendered);
        } else {
            self.log(None, LogLevel::Error, format!("{description}: {reason}"));
        }
    }

    pub fn finish_progress(&self, pb: Option<ProgressBar>, message: impl Into<String>) {
        if let Some(pb) = pb {
            pb.finish_with_message(message.into());
        }
    }

    fn log(&self, pb: Option<&ProgressBar>, level: LogLevel, message: String) {
        let rendered = self.render_line(level, message);
        let target = log_target(level);

        if let Some(pb) = pb {
            let inner = Arc::clone(&self.inner);
            let rendered_clone = rendered.clone();
            pb.suspend(move || {
                let lock = match target {
                    LogTarget::Stdout => inner.stdout.lock().unwrap(),
                    LogTarget::Stderr => inner.stderr.lock().unwrap(),
                };
                drop(lock);

                match target {
                    LogTarget::Stdout => println!("{rendered_clone}"),
                    LogTarget::Stderr => eprintln!("{rendered_clone}"),
                }
            });
            return;
        }

        let lock = match target {
            LogTarget::Stdout => self.inner.stdout.lock().unwrap(),
            LogTarget::Stderr => self.inner.stderr.lock().unwrap(),
        };
        drop(lock);

        match target {
            LogTarget::Stdout => println!("{rendered}"),
            LogTarget::Stderr => eprintln!("{rendered}"),
        }
    }

    fn render_line(&self, level: LogLevel, message: String) -> String {
        let (icon, styled_msg) = match level {
            LogLevel::Info => (style("•").cyan(), style(message)),
            LogLevel::Success => (style("✔").green().bold(), style(message).green().bold()),
            LogLevel::Warn => (style("▲").yellow().bold(), style(message).yellow()),
            LogLevel::Error => (style("✖").red().bold(), style(message).red()),
            LogLevel::Detail => (style("↻").dim(), style(message).dim()),
        };
        format!("{} {}", icon, styled_msg)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

fn log_target(level: LogLevel) -> LogTarget {
    match level {
        LogLevel::Warn | LogLevel::Error => LogTarget::Stderr,
        LogLevel::Info | LogLevel::Success | LogLevel::Detail => LogTarget::Stdout,
    }
}

pub fn summarize_reports(logger: &Logger, reports: &[ScenarioReport]) -> bool {
    let failures: Vec<&ScenarioReport> = reports
        .iter()
        .filter(|report| !matches!(report.outcome, ScenarioOutcome::Passed))
        .collect();

    if failures.is_empty() {
        logger.success(format!("All {} scenario(s) passed", reports.len()));
        return true;
    }

    logger.error("Failure summary:");
    for report in &failures {
        if let ScenarioOutcome::Failed { step, reason } = &report.outcome {
            logger.error(format!("{} failed at {step}: \"{reason}\"", report.name));
        }
    }
    logger.error(format!(
        "{}/{} scenario(s) failed",
        failures.len(),
        reports.len()
    ));
    false
}
