//! Shared CLI helpers: banner, tool panels, usage line, approval parsing.

use colored::Colorize;

use starbot_core::types::UsageInfo;
use starbot_core::utils::take_chars;

/// Tool results longer than this are cut in the terminal (the model sees the full text).
pub const RESULT_DISPLAY_CHARS: usize = 2000;

/// Print the banner shown at REPL start.
pub fn print_banner(model: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!(
        "{}  v{}  {}",
        "★ StarBot".cyan().bold(),
        version.dimmed(),
        model.dimmed()
    );
    println!(
        "{}",
        "Type a message to start. /clear resets the conversation, /exit quits.".dimmed()
    );
    println!();
}

/// Shorten a tool result for display.
pub fn display_result(result: &str) -> String {
    let head = take_chars(result, RESULT_DISPLAY_CHARS);
    if head.len() < result.len() {
        format!("{head}...")
    } else {
        result.to_string()
    }
}

/// Lay out `body` inside a titled box, one string per line.
pub fn render_panel(title: &str, body: &str) -> Vec<String> {
    let mut lines = Vec::with_capacity(body.lines().count() + 2);
    lines.push(format!("╭─ {title}"));
    if body.is_empty() {
        lines.push("│".to_string());
    }
    for line in body.lines() {
        lines.push(format!("│ {line}"));
    }
    lines.push("╰─".to_string());
    lines
}

pub fn print_tool_call(name: &str, arguments: &str) {
    println!();
    println!("{}", format!("🔧 {name}").yellow().bold());
    for line in render_panel("arguments", arguments) {
        println!("{}", line.yellow());
    }
}

pub fn print_tool_result(name: &str, result: &str) {
    for line in render_panel(&format!("{name} result"), &display_result(result)) {
        println!("{}", line.green());
    }
}

pub fn print_error(message: &str) {
    println!("{}", message.red().bold());
}

/// One dimmed line: this turn's last call plus the running total.
pub fn format_usage(usage: &UsageInfo, cumulative: &UsageInfo) -> String {
    format!(
        "tokens: {} in / {} out ({} total, {} this session)",
        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens, cumulative.total_tokens
    )
}

/// Whether a confirmation answer means "yes". An empty answer approves.
pub fn is_approval(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "" | "y" | "yes")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
