// src/utils/console.rs

//! Human-facing console output for run progress and end-of-run summaries.
//!
//! Diagnostics go through the `log` facade; this module prints the framed
//! headers and summary tables an operator reads at the end of a run.

use chrono::Local;

fn enabled() -> bool {
    log::log_enabled!(log::Level::Info)
}

fn stamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Print a framed header.
pub fn header(title: &str) {
    if enabled() {
        println!();
        println!("{}", "═".repeat(60));
        println!("  {}", title);
        println!("{}", "═".repeat(60));
    }
}

/// Print a step in a multi-step process.
pub fn step(step_num: usize, total: usize, message: &str) {
    if enabled() {
        println!("[{}] [STEP {}/{}] {}", stamp(), step_num, total, message);
    }
}

/// Print an indented line.
pub fn sub_item(message: &str) {
    if enabled() {
        println!("    {}", message);
    }
}

/// Print a success line. Always shown.
pub fn success(message: &str) {
    println!("[{}] ✓ {}", stamp(), message);
}

/// Print a separator line.
pub fn separator() {
    if enabled() {
        println!("{}", "─".repeat(60));
    }
}

/// Print a titled block of key/value pairs. Always shown.
pub fn summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("[{}] [SUMMARY] {}", stamp(), title);
    for (key, value) in items {
        println!("    {}: {}", key, value);
    }
}
