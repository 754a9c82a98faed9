//! # Output Rendering
//!
//! Terminal capabilities are probed once at startup into an [`OutputConfig`],
//! which then picks a [`Renderer`]:
//!
//! - [`RichRenderer`]: colours, emoji and a spinner while work is running.
//! - [`PlainRenderer`]: bracketed ASCII tags, no escape codes, no spinner.
//!   Used for pipes, dumb terminals and `--color=never`.
//!
//! Colour detection honours `--color=always|never|auto`, `NO_COLOR`,
//! `CLICOLOR=0`, `CLICOLOR_FORCE=1` and `TERM=dumb`.

use std::env;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::locator::DiscoveredRepository;
use crate::prime::PrimingMethod;
use crate::workspace::WorkspaceOutcome;

/// What the terminal can do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub use_color: bool,
    /// stderr is attached to a terminal, so transient progress can be drawn.
    pub interactive: bool,
}

impl OutputConfig {
    /// Probe the environment, with `color_flag` (`always`, `never`, `auto`)
    /// taking precedence.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        let interactive = console::Term::stderr().is_term();
        Self {
            use_color,
            interactive,
        }
    }

    fn detect_color_support() -> bool {
        // Presence alone disables colours, even when empty.
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    pub fn plain() -> Self {
        Self {
            use_color: false,
            interactive: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Turns results into user-facing text.
///
/// Renderers build strings; printing is left to the caller.
pub trait Renderer: Send + Sync {
    /// Listing produced by `discover`.
    fn discovered(&self, base: &Path, repositories: &[DiscoveredRepository]) -> String;

    /// Summary of a created workspace, including per-repository failures and
    /// degraded priming.
    fn workspace(&self, outcome: &WorkspaceOutcome) -> String;

    /// Report for a workspace in which nothing could be mounted.
    fn nothing_mounted(&self, attempted: usize, root: Option<&Path>) -> String;

    /// A running progress indicator, if this renderer draws one.
    fn progress(&self, _message: &str) -> Option<ProgressBar> {
        None
    }
}

/// Pick the renderer for `config`.
pub fn select_renderer(config: &OutputConfig) -> Box<dyn Renderer> {
    if config.use_color {
        Box::new(RichRenderer {
            spinner: config.interactive,
        })
    } else {
        Box::new(PlainRenderer)
    }
}

/// Coloured output with emoji.
pub struct RichRenderer {
    spinner: bool,
}

impl RichRenderer {
    pub fn new(spinner: bool) -> Self {
        Self { spinner }
    }
}

impl Renderer for RichRenderer {
    fn discovered(&self, base: &Path, repositories: &[DiscoveredRepository]) -> String {
        let mut out = String::new();
        if repositories.is_empty() {
            let _ = writeln!(
                out,
                "🔍 No repositories found under {}",
                style(base.display()).bold()
            );
            return out;
        }
        let _ = writeln!(
            out,
            "🔍 {} repositories under {}",
            repositories.len(),
            style(base.display()).bold()
        );
        for repo in repositories {
            let _ = writeln!(
                out,
                "   {} {} {}",
                style(&repo.name).cyan().bold(),
                style(format!("({})", repo.current_branch)).dim(),
                repo.path.display()
            );
        }
        out
    }

    fn workspace(&self, outcome: &WorkspaceOutcome) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "✅ Workspace ready: {}",
            style(outcome.workspace.root_path().display()).bold()
        );
        for (mounted, (_, priming)) in outcome.workspace.mounted().iter().zip(&outcome.priming) {
            let deps = match priming.method {
                PrimingMethod::Skipped if priming.is_degraded() => {
                    style("deps not primed".to_string()).yellow()
                }
                method => style(format!("deps {}", method)).dim(),
            };
            let _ = writeln!(
                out,
                "   📦 {} {} {} {}",
                style(mounted.alias()).cyan().bold(),
                style(format!("@{}", mounted.selection().branch())).dim(),
                style(mounted.package_manager()).green(),
                deps
            );
        }
        for failure in &outcome.failures {
            let _ = writeln!(
                out,
                "   ⚠️  {} {}",
                style(&failure.alias).yellow().bold(),
                failure.message
            );
        }
        if outcome.failed_count() > 0 {
            let _ = writeln!(
                out,
                "{}",
                style(format!(
                    "{} of {} repositories failed",
                    outcome.failed_count(),
                    outcome.failed_count() + outcome.mounted_count()
                ))
                .yellow()
            );
        }
        out
    }

    fn nothing_mounted(&self, attempted: usize, root: Option<&Path>) -> String {
        let mut out = format!(
            "❌ {}",
            style(format!("No repositories mounted ({} attempted)", attempted))
                .red()
                .bold()
        );
        if let Some(root) = root {
            let _ = write!(out, "\n   partial workspace left at {}", root.display());
        }
        out.push('\n');
        out
    }

    fn progress(&self, message: &str) -> Option<ProgressBar> {
        if !self.spinner {
            return None;
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            bar.set_style(spinner_style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Some(bar)
    }
}

/// ASCII-only output for pipes and dumb terminals.
pub struct PlainRenderer;

impl Renderer for PlainRenderer {
    fn discovered(&self, base: &Path, repositories: &[DiscoveredRepository]) -> String {
        let mut out = String::new();
        if repositories.is_empty() {
            let _ = writeln!(out, "[SCAN] No repositories found under {}", base.display());
            return out;
        }
        let _ = writeln!(
            out,
            "[SCAN] {} repositories under {}",
            repositories.len(),
            base.display()
        );
        for repo in repositories {
            let _ = writeln!(
                out,
                "  {} ({}) {}",
                repo.name,
                repo.current_branch,
                repo.path.display()
            );
        }
        out
    }

    fn workspace(&self, outcome: &WorkspaceOutcome) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "[OK] Workspace ready: {}",
            outcome.workspace.root_path().display()
        );
        for (mounted, (_, priming)) in outcome.workspace.mounted().iter().zip(&outcome.priming) {
            let _ = write!(
                out,
                "  {} @{} {} deps={}",
                mounted.alias(),
                mounted.selection().branch(),
                mounted.package_manager(),
                priming.method
            );
            if let Some(error) = &priming.error {
                let _ = write!(out, " ({})", error);
            }
            out.push('\n');
        }
        for failure in &outcome.failures {
            let _ = writeln!(out, "[WARN] {}: {}", failure.alias, failure.message);
        }
        if outcome.failed_count() > 0 {
            let _ = writeln!(
                out,
                "{} of {} repositories failed",
                outcome.failed_count(),
                outcome.failed_count() + outcome.mounted_count()
            );
        }
        out
    }

    fn nothing_mounted(&self, attempted: usize, root: Option<&Path>) -> String {
        let mut out = format!("[ERR] No repositories mounted ({} attempted)\n", attempted);
        if let Some(root) = root {
            let _ = writeln!(out, "  partial workspace left at {}", root.display());
        }
        out
    }
}
