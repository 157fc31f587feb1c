use colored::Colorize;
use log::warn;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::pipeline::{Diagnostic, DiagnosticLevel, InstallRequest, PipelineOutcome};

/// Renders pipeline diagnostics on the terminal while a run is in progress.
pub struct DisplayManager {
    tx: Option<UnboundedSender<Diagnostic>>,
    display_task: Option<tokio::task::JoinHandle<()>>,
    verbosity: u8,
}

impl DisplayManager {
    pub fn new(verbosity: u8) -> Self {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        Self {
            tx: Some(tx),
            display_task: Some(tokio::spawn(display_worker(rx, verbosity))),
            verbosity,
        }
    }

    /// A sender for the pipeline to stream diagnostics through.
    pub fn reporter(&self) -> Option<UnboundedSender<Diagnostic>> {
        self.tx.clone()
    }

    pub fn report_start(&self, request: &InstallRequest) {
        println!(
            "{} {} to {}",
            "Installing".bold(),
            request.coordinate,
            request.target.display()
        );
    }

    /// Waits for queued diagnostics to be shown, then prints the summary.
    ///
    /// Every other reporter must have been dropped, or this never returns.
    pub async fn finish(mut self, outcome: &PipelineOutcome) {
        self.tx.take();
        if let Some(display_task) = self.display_task.take() {
            if let Err(e) = display_task.await {
                warn!("Display worker failed, {}", e);
            }
        }

        if outcome.success() {
            for line in success_lines(outcome) {
                println!("{}", line);
            }
        } else {
            for line in remediation_lines(outcome, self.verbosity) {
                eprintln!("{}", line);
            }
        }
    }
}

async fn display_worker(mut rx: UnboundedReceiver<Diagnostic>, verbosity: u8) {
    while let Some(diagnostic) = rx.recv().await {
        let Some(message) = format_diagnostic(&diagnostic, verbosity) else {
            continue;
        };

        match diagnostic.level {
            DiagnosticLevel::Warning | DiagnosticLevel::Error => eprintln!("{}", message),
            _ => println!("{}", message),
        }
    }
}

/// Formats a diagnostic, or returns `None` when it is too detailed to show.
pub fn format_diagnostic(diagnostic: &Diagnostic, verbosity: u8) -> Option<String> {
    let message = &diagnostic.message;
    match diagnostic.level {
        DiagnosticLevel::Detail if verbosity == 0 => None,
        DiagnosticLevel::Detail => Some(format!("  {}", message.dimmed())),
        DiagnosticLevel::Info => Some(format!("{} {}", "•".blue(), message)),
        DiagnosticLevel::Success => Some(format!("{} {}", "✓".green(), message.green())),
        DiagnosticLevel::Warning => Some(format!("{} {}", "!".yellow().bold(), message.yellow())),
        DiagnosticLevel::Error => Some(format!("{} {}", "✗".red().bold(), message.red().bold())),
    }
}

/// How to use the installed artifact.
pub fn success_lines(outcome: &PipelineOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    let path = outcome.primary_file.display().to_string();

    if outcome.manual_verification_requested {
        lines.push(format!(
            "{} verification files were kept next to {} until you finish checking them",
            "Note:".yellow().bold(),
            path
        ));
    }

    let warnings = outcome
        .diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Warning)
        .count();
    if warnings > 0 {
        lines.push(format!(
            "{} installed with {} warning(s), see above",
            "Note:".yellow().bold(),
            warnings
        ));
    }

    let executable = outcome
        .artifact
        .as_ref()
        .is_some_and(|artifact| artifact.coordinate.is_executable());
    if executable {
        lines.push(format!("Run it with: {}", format!("java -jar {}", path).bold()));
    } else {
        lines.push(format!("Downloaded to: {}", path.bold()));
    }

    lines
}

/// How to get the artifact anyway. The error itself was already streamed.
pub fn remediation_lines(outcome: &PipelineOutcome, verbosity: u8) -> Vec<String> {
    let mut lines = Vec::new();

    if !outcome.preserved_files.is_empty() {
        lines.push("The following files were kept for inspection:".to_string());
        for file in &outcome.preserved_files {
            lines.push(format!("  {}", file.display()));
        }
    }

    lines.push(format!(
        "You can download the artifact manually from {}",
        outcome.manual_download_url.underline()
    ));
    if verbosity < 2 {
        lines.push(format!(
            "Re-run with {} for verbose diagnostics",
            "--debug".bold()
        ));
    }

    lines
}
