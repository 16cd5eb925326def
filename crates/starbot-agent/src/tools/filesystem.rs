//! Filesystem tools — read, write, search.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use globset::GlobBuilder;
use serde_json::{json, Value};
use tracing::debug;
use walkdir::WalkDir;

use starbot_core::utils::expand_home;

use super::base::{optional_string, require_string, Tool, ToolOutput};

/// Maximum files returned by `file_search`.
const MAX_FILES: usize = 100;

/// Maximum grep hits returned by `file_search`.
const MAX_MATCHES: usize = 50;

// ─────────────────────────────────────────────
// FileReadTool
// ─────────────────────────────────────────────

/// Reads and returns the entire content of a UTF-8 file.
pub struct FileReadTool;

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "file_read"
    }

    fn description(&self) -> &str {
        "Read file content. Returns the text content of a file."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path to read" }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<ToolOutput> {
        let path = expand_home(&require_string(&params, "path")?);
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(ToolOutput::Text(content))
    }
}

// ─────────────────────────────────────────────
// FileWriteTool
// ─────────────────────────────────────────────

/// Writes content to a file, creating parent directories as needed.
pub struct FileWriteTool;

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "file_write"
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates parent directories if needed."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path to write" },
                "content": { "type": "string", "description": "Content to write" }
            },
            "required": ["path", "content"]
        })
    }

    fn dangerous(&self) -> bool {
        true
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<ToolOutput> {
        let path_str = require_string(&params, "path")?;
        let content = require_string(&params, "content")?;
        let path = expand_home(&path_str);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, &content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(ToolOutput::Text(format!(
            "Written {} chars to {}",
            content.chars().count(),
            path_str
        )))
    }
}

// ─────────────────────────────────────────────
// FileSearchTool
// ─────────────────────────────────────────────

/// Glob search with optional substring grep.
///
/// Relative patterns are resolved against `base_dir` and reported relative
/// to it.
pub struct FileSearchTool {
    base_dir: PathBuf,
}

impl FileSearchTool {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Files matching `pattern`, sorted, at most [`MAX_FILES`].
    fn find(&self, pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
        let expanded = expand_home(pattern);
        let relative = expanded.is_relative();
        let joined = if relative {
            self.base_dir.join(&expanded)
        } else {
            expanded
        };
        // Walk root and matcher must see the same path; components() drops `./`.
        let full: PathBuf = joined.components().collect();

        let (root, depth) = split_glob_root(&full);
        let glob = GlobBuilder::new(&full.to_string_lossy())
            .literal_separator(true)
            .build()
            .with_context(|| format!("Invalid glob pattern: {pattern}"))?
            .compile_matcher();

        debug!(root = %root.display(), pattern = %pattern, "file search");

        let mut walker = WalkDir::new(&root).sort_by_file_name();
        if let Some(depth) = depth {
            walker = walker.max_depth(depth);
        }

        let files = walker
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| glob.is_match(p))
            .take(MAX_FILES)
            .map(|p| {
                if relative {
                    p.strip_prefix(&self.base_dir).map(PathBuf::from).unwrap_or(p)
                } else {
                    p
                }
            })
            .collect();
        Ok(files)
    }

    fn grep(&self, files: &[PathBuf], needle: &str) -> Vec<String> {
        let mut hits = Vec::new();
        for file in files {
            let full = self.base_dir.join(file);
            let Ok(bytes) = std::fs::read(&full) else {
                continue;
            };
            let text = String::from_utf8_lossy(&bytes);
            for (i, line) in text.lines().enumerate() {
                if line.contains(needle) {
                    hits.push(format!("{}:{}: {}", file.display(), i + 1, line.trim_end()));
                    if hits.len() >= MAX_MATCHES {
                        return hits;
                    }
                }
            }
        }
        hits
    }
}

impl Default for FileSearchTool {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

/// Split a glob into the literal directory to walk and the walk depth
/// (`None` when the pattern contains `**`).
fn split_glob_root(pattern: &Path) -> (PathBuf, Option<usize>) {
    let is_glob = |s: &str| s.contains(['*', '?', '[', '{']);

    let mut root = PathBuf::new();
    let mut rest = Vec::new();
    for component in pattern.components() {
        let text = component.as_os_str().to_string_lossy();
        if rest.is_empty() && !is_glob(&text) {
            root.push(component);
        } else {
            rest.push(text.into_owned());
        }
    }

    if rest.is_empty() {
        // literal path: match only itself
        return (root, Some(0));
    }
    let recursive = rest.iter().any(|c| c == "**");
    if root.as_os_str().is_empty() {
        root = PathBuf::from(".");
    }
    (root, if recursive { None } else { Some(rest.len()) })
}

#[async_trait]
impl Tool for FileSearchTool {
    fn name(&self) -> &str {
        "file_search"
    }

    fn description(&self) -> &str {
        "Search for files matching a glob pattern, optionally grep content."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Glob pattern (e.g. '**/*.py')" },
                "grep": { "type": "string", "description": "Optional text to search inside files" }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<ToolOutput> {
        let pattern = require_string(&params, "pattern")?;
        let grep = optional_string(&params, "grep").filter(|g| !g.is_empty());

        let files = self.find(&pattern)?;

        let text = match grep {
            None if files.is_empty() => "No files found".to_string(),
            None => files
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            Some(needle) => {
                let hits = self.grep(&files, &needle);
                if hits.is_empty() {
                    "No matches found".to_string()
                } else {
                    hits.join("\n")
                }
            }
        };
        Ok(ToolOutput::Text(text))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
