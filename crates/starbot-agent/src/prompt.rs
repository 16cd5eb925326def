//! System prompt builder.
//!
//! The configured prompt is followed by an `<environment>` block so the model
//! knows which OS, shell and directory its tools run in.

use std::path::PathBuf;

use chrono::Local;

/// Builds the system message placed at the head of every conversation.
#[derive(Clone, Debug)]
pub struct PromptBuilder {
    base: String,
    cwd: PathBuf,
    shell: String,
}

impl PromptBuilder {
    /// Use the current process directory and login shell.
    pub fn new(base: impl Into<String>) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let shell = std::env::var("SHELL")
            .or_else(|_| std::env::var("COMSPEC"))
            .unwrap_or_else(|_| default_shell().to_string());
        Self {
            base: base.into(),
            cwd,
            shell,
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn build(&self) -> String {
        let now = Local::now().format("%Y-%m-%d %H:%M");
        let environment = format!(
            "<environment>\n\
             os: {os}/{arch}\n\
             shell: {shell}\n\
             cwd: {cwd}\n\
             date: {now}\n\
             </environment>",
            os = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            shell = self.shell,
            cwd = self.cwd.display(),
        );

        let base = self.base.trim();
        if base.is_empty() {
            environment
        } else {
            format!("{base}\n\n{environment}")
        }
    }
}

fn default_shell() -> &'static str {
    if cfg!(target_os = "windows") {
        "cmd"
    } else {
        "sh"
    }
}
