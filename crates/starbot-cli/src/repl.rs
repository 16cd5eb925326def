//! Interactive REPL and single-shot mode.
//!
//! Uses `rustyline` for readline-style editing with persistent history, and
//! renders [`AgentEvent`]s as they arrive: text is streamed straight to
//! stdout, tool calls and results are drawn as panels.

use std::io::{BufRead, Write};

use anyhow::{bail, Result};
use colored::Colorize;
use futures::StreamExt;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use starbot_agent::{Agent, AgentEvent};
use starbot_core::utils::get_history_path;

use crate::helpers;

const CONFIRM_PROMPT: &str = "Allow execution? (y/n) > ";

/// What the REPL should do with one line of input.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Skip,
    Exit,
    Clear,
    Message(&'a str),
}

fn parse_command(input: &str) -> Command<'_> {
    match input.trim() {
        "" => Command::Skip,
        "/exit" | "/quit" => Command::Exit,
        "/clear" => Command::Clear,
        text => Command::Message(text),
    }
}

/// Run the interactive REPL loop until `/exit`, Ctrl-C or Ctrl-D.
pub async fn run(mut agent: Agent, auto_approve: bool) -> Result<()> {
    helpers::print_banner(agent.model());

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        match parse_command(&input) {
            Command::Skip => continue,
            Command::Exit => break,
            Command::Clear => {
                agent.reset();
                println!("{}\n", "Conversation cleared.".dimmed());
            }
            Command::Message(text) => {
                let _ = editor.add_history_entry(text);
                debug!(input = text, "processing input");
                println!();
                run_turn(&mut agent, text, |_, _| {
                    auto_approve || ask_with_editor(&mut editor)
                })
                .await;
                println!();
            }
        }
    }

    save_history(&mut editor);
    println!("{}", "Goodbye!".dimmed());
    Ok(())
}

/// Process one message and exit; fails if the turn ended with an error.
pub async fn run_once(mut agent: Agent, message: &str, auto_approve: bool) -> Result<()> {
    let ok = run_turn(&mut agent, message, |_, _| auto_approve || ask_on_stdin()).await;
    if !ok {
        bail!("agent turn failed");
    }
    Ok(())
}

/// Drive one agent turn, rendering every event.
///
/// `confirm` is asked for each `Confirm` event and its answer resolves the
/// agent's gate before the stream is polled again. Returns `false` when the
/// turn produced an `Error` event.
pub async fn run_turn<F>(agent: &mut Agent, input: &str, mut confirm: F) -> bool
where
    F: FnMut(&str, &str) -> bool,
{
    let gate = agent.confirmation_gate();
    let mut stream = agent.run(input);
    let mut out = TextOut::default();
    let mut last_usage = None;
    let mut ok = true;

    while let Some(event) = stream.next().await {
        match event {
            AgentEvent::Text { content } => out.write(&content),
            AgentEvent::ToolCall {
                name, arguments, ..
            } => {
                out.finish_line();
                helpers::print_tool_call(&name, &arguments);
            }
            AgentEvent::Confirm {
                name, arguments, ..
            } => {
                out.finish_line();
                let approved = confirm(&name, &arguments);
                debug!(tool = %name, approved, "confirmation answered");
                gate.resolve(approved);
            }
            AgentEvent::ToolResult { name, result, .. } => {
                helpers::print_tool_result(&name, &result);
            }
            AgentEvent::Usage { usage, cumulative } => {
                last_usage = Some((usage, cumulative));
            }
            AgentEvent::Error { message } => {
                out.finish_line();
                helpers::print_error(&message);
                ok = false;
            }
        }
    }
    out.finish_line();

    if let Some((usage, cumulative)) = last_usage {
        println!("{}", helpers::format_usage(&usage, &cumulative).dimmed());
    }
    ok
}

/// Tracks whether streamed text left the cursor mid-line.
#[derive(Default)]
struct TextOut {
    open: bool,
}

impl TextOut {
    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
        self.open = !text.ends_with('\n');
    }

    fn finish_line(&mut self) {
        if self.open {
            println!();
            self.open = false;
        }
    }
}

fn ask_with_editor(editor: &mut Editor<(), DefaultHistory>) -> bool {
    match editor.readline(&CONFIRM_PROMPT.yellow().to_string()) {
        Ok(answer) => helpers::is_approval(&answer),
        // Ctrl-C / Ctrl-D at the prompt denies.
        Err(_) => false,
    }
}

fn ask_on_stdin() -> bool {
    print!("{}", CONFIRM_PROMPT.yellow());
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(0) | Err(_) => false,
        Ok(_) => helpers::is_approval(&answer),
    }
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = get_history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = get_history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
