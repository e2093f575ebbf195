//! Remote filesystem tools backed by the Nexus server.

use crate::nexus::{GrepRequest, NexusClient};
use async_trait::async_trait;
use nexagent_core::auth::AuthContext;
use nexagent_core::error::ToolError;
use nexagent_core::schema::{ArgKind, ArgumentSchema};
use nexagent_core::tool::{Tool, ToolResult};
use std::sync::Arc;

/// Lines shown by `less`.
const PREVIEW_LINES: usize = 100;

/// Matches listed before the output is cut off.
const MAX_GREP_MATCHES: usize = 200;

fn str_arg<'a>(arguments: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    arguments[key].as_str().filter(|s| !s.is_empty())
}

// --- grep_files ---

pub struct GrepFilesTool {
    nexus: Arc<dyn NexusClient>,
}

impl GrepFilesTool {
    pub fn new(nexus: Arc<dyn NexusClient>) -> Self {
        Self { nexus }
    }
}

#[async_trait]
impl Tool for GrepFilesTool {
    fn name(&self) -> &str {
        "grep_files"
    }

    fn description(&self) -> &str {
        "Search file contents in the Nexus filesystem for a pattern. Returns matching lines as path:line: content."
    }

    fn argument_schema(&self) -> ArgumentSchema {
        ArgumentSchema::new()
            .required("pattern", ArgKind::String, "Text or regex to search for")
            .optional("path", ArgKind::String, "Directory to search (default: /)")
            .optional("file_pattern", ArgKind::String, "Only search files matching this glob, e.g. *.py")
            .optional("ignore_case", ArgKind::Boolean, "Case-insensitive search (default: false)")
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        auth: &AuthContext,
    ) -> Result<ToolResult, ToolError> {
        let pattern = str_arg(&arguments, "pattern")
            .ok_or_else(|| ToolError::InvalidArguments("'pattern' must not be empty".into()))?;
        let request = GrepRequest {
            pattern: pattern.to_string(),
            path: str_arg(&arguments, "path").unwrap_or("/").to_string(),
            file_pattern: str_arg(&arguments, "file_pattern").map(String::from),
            ignore_case: arguments["ignore_case"].as_bool().unwrap_or(false),
        };

        let matches = self.nexus.grep(auth, &request).await?;
        if matches.is_empty() {
            return Ok(ToolResult::success(format!(
                "No matches found for '{}' in {}",
                request.pattern, request.path
            )));
        }

        let mut lines: Vec<String> = matches
            .iter()
            .take(MAX_GREP_MATCHES)
            .map(|m| format!("{}:{}: {}", m.file, m.line, m.content.trim_end()))
            .collect();
        if matches.len() > MAX_GREP_MATCHES {
            lines.push(format!(
                "... {} more matches not shown; narrow the search",
                matches.len() - MAX_GREP_MATCHES
            ));
        }

        Ok(ToolResult::success(lines.join("\n"))
            .with_data(serde_json::json!({ "total_matches": matches.len() })))
    }
}

// --- glob_files ---

pub struct GlobFilesTool {
    nexus: Arc<dyn NexusClient>,
}

impl GlobFilesTool {
    pub fn new(nexus: Arc<dyn NexusClient>) -> Self {
        Self { nexus }
    }
}

#[async_trait]
impl Tool for GlobFilesTool {
    fn name(&self) -> &str {
        "glob_files"
    }

    fn description(&self) -> &str {
        "Find files in the Nexus filesystem by name pattern, e.g. **/*.py."
    }

    fn argument_schema(&self) -> ArgumentSchema {
        ArgumentSchema::new()
            .required("pattern", ArgKind::String, "Glob pattern, e.g. **/*.md")
            .optional("path", ArgKind::String, "Directory to search (default: /)")
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        auth: &AuthContext,
    ) -> Result<ToolResult, ToolError> {
        let pattern = str_arg(&arguments, "pattern")
            .ok_or_else(|| ToolError::InvalidArguments("'pattern' must not be empty".into()))?;
        let path = str_arg(&arguments, "path").unwrap_or("/");

        let files = self.nexus.glob(auth, pattern, path).await?;
        if files.is_empty() {
            return Ok(ToolResult::success(format!(
                "No files matching '{pattern}' in {path}"
            )));
        }
        let count = files.len();
        Ok(ToolResult::success(format!("Found {count} files:\n{}", files.join("\n")))
            .with_data(serde_json::json!({ "count": count })))
    }
}

// --- read_file ---

/// A parsed `read_file` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadCommand {
    /// Whole file
    Cat { path: String },
    /// Inclusive, 1-based line range
    Range { path: String, start: usize, end: usize },
    /// First lines only
    Less { path: String },
}

impl ReadCommand {
    /// Parse `cat <path>`, `cat <path> <start> <end>`, `less <path>` or a bare path.
    pub fn parse(cmd: &str) -> Result<Self, String> {
        let parts: Vec<&str> = cmd.split_whitespace().collect();
        match parts.as_slice() {
            [] => Err("empty command".into()),
            ["cat", path] => Ok(Self::Cat {
                path: path.to_string(),
            }),
            ["cat", path, start, end] => {
                let start: usize = start
                    .parse()
                    .map_err(|_| format!("invalid start line '{start}'"))?;
                let end: usize = end.parse().map_err(|_| format!("invalid end line '{end}'"))?;
                if start == 0 || end < start {
                    return Err(format!("invalid line range {start}-{end}"));
                }
                Ok(Self::Range {
                    path: path.to_string(),
                    start,
                    end,
                })
            }
            ["less", path] => Ok(Self::Less {
                path: path.to_string(),
            }),
            [path] if !matches!(*path, "cat" | "less") => Ok(Self::Cat {
                path: path.to_string(),
            }),
            _ => Err(format!(
                "unsupported command '{cmd}'; use 'cat <path>', 'cat <path> <start> <end>' or 'less <path>'"
            )),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Cat { path } | Self::Range { path, .. } | Self::Less { path } => path,
        }
    }

    /// Apply the command to the file's content.
    pub fn render(&self, content: &str) -> String {
        match self {
            Self::Cat { .. } => content.to_string(),
            Self::Range { start, end, .. } => content
                .lines()
                .skip(start - 1)
                .take(end - start + 1)
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Less { .. } => {
                let total = content.lines().count();
                let head = content
                    .lines()
                    .take(PREVIEW_LINES)
                    .collect::<Vec<_>>()
                    .join("\n");
                if total > PREVIEW_LINES {
                    format!(
                        "{head}\n\n... (showing first {PREVIEW_LINES} of {total} lines; use 'cat {} <start> <end>' for more)",
                        self.path()
                    )
                } else {
                    head
                }
            }
        }
    }
}

pub struct ReadFileTool {
    nexus: Arc<dyn NexusClient>,
}

impl ReadFileTool {
    pub fn new(nexus: Arc<dyn NexusClient>) -> Self {
        Self { nexus }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file from the Nexus filesystem. Commands: 'cat /file.py' (full file), 'cat /file.py 10 20' (lines 10-20), 'less /large.json' (first 100 lines)."
    }

    fn argument_schema(&self) -> ArgumentSchema {
        ArgumentSchema::new().required(
            "cmd",
            ArgKind::String,
            "Read command: 'cat <path>', 'cat <path> <start> <end>' or 'less <path>'",
        )
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        auth: &AuthContext,
    ) -> Result<ToolResult, ToolError> {
        let cmd = arguments["cmd"].as_str().unwrap_or_default();
        let command = ReadCommand::parse(cmd).map_err(ToolError::InvalidArguments)?;
        let content = self.nexus.read(auth, command.path()).await?;
        Ok(ToolResult::success(command.render(&content)))
    }
}

// --- write_file ---

pub struct WriteFileTool {
    nexus: Arc<dyn NexusClient>,
}

impl WriteFileTool {
    pub fn new(nexus: Arc<dyn NexusClient>) -> Self {
        Self { nexus }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file in the Nexus filesystem, creating or replacing it."
    }

    fn argument_schema(&self) -> ArgumentSchema {
        ArgumentSchema::new()
            .required("path", ArgKind::String, "Absolute file path")
            .required("content", ArgKind::String, "Full file content")
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        auth: &AuthContext,
    ) -> Result<ToolResult, ToolError> {
        let path = str_arg(&arguments, "path")
            .ok_or_else(|| ToolError::InvalidArguments("'path' must not be empty".into()))?;
        let content = arguments["content"].as_str().unwrap_or_default();
        let written = self.nexus.write(auth, path, content).await?;
        Ok(ToolResult::success(format!("Wrote {written} bytes to {path}")))
    }
}
