//! `starbot onboard` — first-run setup wizard.
//!
//! Prompts for the API key, base URL and model, then writes
//! `~/.starbot/config.json` (or the `--config` path). Pressing Enter keeps the
//! value shown in brackets.

use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use rustyline::DefaultEditor;

use starbot_core::config::{load_config, save_config, Config};

/// Answers collected by the wizard; empty strings mean "keep current".
#[derive(Debug, Default)]
struct Answers {
    api_key: String,
    base_url: String,
    model: String,
}

/// Run the onboard command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    wizard(config, config_path)?;
    println!(
        "{}",
        "  Setup complete! Run `starbot agent` to start chatting.".green()
    );
    println!();
    Ok(())
}

/// Return `config` unchanged if it has an API key, otherwise run the wizard.
pub fn ensure_configured(config: Config, config_path: Option<&Path>) -> Result<Config> {
    if config.model.is_configured() {
        return Ok(config);
    }
    println!("{}", "No API key configured yet.".yellow());
    wizard(config, config_path)
}

/// Prompt, merge the answers into `config` and save it.
pub fn wizard(config: Config, config_path: Option<&Path>) -> Result<Config> {
    println!();
    println!("{}", "★ StarBot — Setup".cyan().bold());
    println!();

    let mut editor = DefaultEditor::new().context("failed to open terminal input")?;
    let key_hint = if config.model.is_configured() {
        " [keep current]"
    } else {
        ""
    };
    let answers = Answers {
        api_key: ask(&mut editor, &format!("API key{key_hint}: "))?,
        base_url: ask(&mut editor, &format!("Base URL [{}]: ", config.model.base_url))?,
        model: ask(&mut editor, &format!("Model [{}]: ", config.model.model))?,
    };

    let config = apply_answers(config, answers)?;
    let saved = save_config(&config, config_path)?;
    println!();
    println!("  {} config saved to {}", "✓".green(), saved.display());
    println!("  {} model {}", "✓".green(), config.model.model);
    println!();
    Ok(config)
}

fn ask(editor: &mut DefaultEditor, prompt: &str) -> Result<String> {
    let line = editor.readline(prompt).context("setup cancelled")?;
    Ok(line.trim().to_string())
}

/// Merge non-empty answers over the current values.
fn apply_answers(mut config: Config, answers: Answers) -> Result<Config> {
    if !answers.api_key.is_empty() {
        config.model.api_key = answers.api_key;
    }
    if !config.model.is_configured() {
        bail!("An API key is required");
    }
    if !answers.base_url.is_empty() {
        config.model.base_url = answers.base_url.trim_end_matches('/').to_string();
    }
    if !answers.model.is_empty() {
        config.model.model = answers.model;
    }
    Ok(config)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
