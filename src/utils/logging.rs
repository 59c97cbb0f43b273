// file: src/utils/logging.rs
// description: stderr tracing setup and colored status lines for operator commands
// reference: https://docs.rs/tracing-subscriber

use colored::{ColoredString, Colorize};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// HTTP plumbing stays quiet unless `--verbose` is given.
const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "rmcp=warn"];

fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }

    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        QUIET_DEPENDENCIES
            .iter()
            .filter_map(|directive| directive.parse::<Directive>().ok())
            .fold(EnvFilter::new("info"), EnvFilter::add_directive)
    })
}

/// Logs go to stderr: stdout carries the MCP stdio transport and command output.
pub fn init_logger(colored_output: bool, verbose: bool) {
    let fmt_layer = fmt::layer()
        .compact()
        .with_target(verbose)
        .with_file(verbose)
        .with_line_number(verbose)
        .with_writer(std::io::stderr)
        .with_ansi(colored_output);

    tracing_subscriber::registry()
        .with(log_filter(verbose))
        .with(fmt_layer)
        .init();
}

fn status_line(marker: ColoredString, msg: impl std::fmt::Display) -> String {
    format!("{} {}", marker, msg)
}

pub fn format_success(msg: &str) -> String {
    status_line("✓".green().bold(), msg.green())
}

pub fn format_error(msg: &str) -> String {
    status_line("✗".red().bold(), msg.red())
}

pub fn format_warning(msg: &str) -> String {
    status_line("⚠".yellow().bold(), msg.yellow())
}

pub fn format_info(msg: &str) -> String {
    status_line("ℹ".blue().bold(), msg)
}

pub fn format_step(step: usize, total: usize, msg: &str) -> String {
    status_line(format!("[{}/{}]", step, total).cyan().bold(), msg)
}
