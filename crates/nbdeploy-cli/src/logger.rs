//! Terminal logging with colored module prefixes
//!
//! ```ignore
//! log!("convert"; "running `{}`", command);
//! debug!("assets"; "copied {}", path.display());
//! ```
//!
//! Messages go to stderr so that stdout only carries the published path.

use owo_colors::{OwoColorize, Stream};
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);
static QUIET: AtomicBool = AtomicBool::new(false);

/// Set output verbosity globally (from `--verbose` / `--quiet`)
pub fn init(verbose: bool, quiet: bool) {
    VERBOSE.store(verbose && !quiet, Ordering::SeqCst);
    QUIET.store(quiet, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::SeqCst)
}

/// Log a message with a colored module prefix (silent with `--quiet`)
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        if !$crate::logger::is_quiet() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Log a message only when `--verbose` is enabled
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Print a message with a colored module prefix to stderr
pub fn log(module: &str, message: &str) {
    eprintln!("{} {message}", colorize_prefix(module));
}

fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    match module {
        "error" => prefix
            .if_supports_color(Stream::Stderr, |p| p.bright_red().bold().to_string())
            .to_string(),
        "warn" => prefix
            .if_supports_color(Stream::Stderr, |p| p.bright_yellow().bold().to_string())
            .to_string(),
        "deploy" => prefix
            .if_supports_color(Stream::Stderr, |p| p.bright_green().bold().to_string())
            .to_string(),
        _ => prefix
            .if_supports_color(Stream::Stderr, |p| p.bright_blue().bold().to_string())
            .to_string(),
    }
}
