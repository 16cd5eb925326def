//! `starbot status` — show configuration and the registered tools.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use starbot_agent::{builtin_registry, ToolRegistry};
use starbot_core::config::{get_config_path, load_config};

/// Run the status command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    println!();
    println!("{}", "★ StarBot Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        path.display(),
        if path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".red().to_string()
        }
    );
    println!("  {:<18} {}", "Model:".bold(), config.model.model);
    println!("  {:<18} {}", "Base URL:".bold(), config.model.base_url);
    println!(
        "  {:<18} {}",
        "API key:".bold(),
        if config.model.is_configured() {
            "✓ set".green().to_string()
        } else {
            "not set (run `starbot onboard`)".red().to_string()
        }
    );
    println!(
        "  {:<18} {} (temperature {}, max tokens {})",
        "Iterations:".bold(),
        config.agent.max_iterations,
        config.model.temperature,
        config.model.max_tokens
    );
    println!(
        "  {:<18} {}",
        "Confirm tools:".bold(),
        if config.agent.confirm_dangerous {
            "on"
        } else {
            "off"
        }
    );
    println!(
        "  {:<18} exec {}s, http {}s",
        "Timeouts:".bold(),
        config.tools.exec.timeout,
        config.tools.http.timeout
    );

    println!();
    println!("  {}", "Tools:".bold());
    let registry = builtin_registry(&config.tools);
    for line in tool_lines(&registry) {
        println!("    {line}");
    }
    println!();

    Ok(())
}

/// One line per tool, sorted by name, dangerous ones flagged.
fn tool_lines(registry: &ToolRegistry) -> Vec<String> {
    registry
        .tool_names()
        .into_iter()
        .map(|name| {
            if registry.is_dangerous(&name) {
                format!("{name:<16} {}", "dangerous".yellow())
            } else {
                name
            }
        })
        .collect()
}
