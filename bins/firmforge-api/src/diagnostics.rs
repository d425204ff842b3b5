//! Diagnostics extraction over the toolchain's combined output.
//!
//! Both functions are pure text transforms, applied only after a terminal
//! outcome is known.

use firmforge_common::types::SizeMetrics;
use lazy_static::lazy_static;
use regex::Regex;

/// Case-sensitive markers that identify relevant failure lines.
const ERROR_MARKERS: [&str; 4] = ["error:", "Error:", "undefined reference", "fatal error"];
/// At most this many marker lines are surfaced.
const MAX_SUMMARY_LINES: usize = 8;
/// Fallback prefix length when no marker line matches.
const RAW_FALLBACK_CHARS: usize = 800;

lazy_static! {
    static ref FLASH_RE: Regex =
        Regex::new(r"Sketch uses (\d+) bytes").expect("flash usage pattern");
    static ref RAM_RE: Regex =
        Regex::new(r"Global variables use (\d+) bytes").expect("ram usage pattern");
}

/// Surface the most relevant error lines from a failed build.
///
/// Scans line by line, keeping every line that contains one of the error
/// markers, in original order, capped at eight lines. When nothing matches
/// (a failure mode the marker set does not recognize) the first 800
/// characters of the raw text are returned instead, so the caller always
/// gets something to show.
pub fn error_summary(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| ERROR_MARKERS.iter().any(|marker| line.contains(marker)))
        .take(MAX_SUMMARY_LINES)
        .collect();

    if lines.is_empty() {
        text.chars().take(RAW_FALLBACK_CHARS).collect()
    } else {
        lines.join("\n")
    }
}

/// Pull flash and RAM byte counts out of a successful build's output.
///
/// The two patterns are matched independently: a toolchain version that
/// reports only one of them yields `None` for the other.
pub fn size_metrics(text: &str) -> SizeMetrics {
    SizeMetrics {
        flash: capture_bytes(&FLASH_RE, text),
        ram: capture_bytes(&RAM_RE, text),
    }
}

fn capture_bytes(re: &Regex, text: &str) -> Option<u64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
