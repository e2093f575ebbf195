//! Sandboxed code execution: the `python` and `bash` tools.
//!
//! The Nexus filesystem is reachable from sandboxed code through
//! `NEXUS_SERVER_URL` and `NEXUS_API_KEY`, which carry the caller's
//! credential for the duration of one run. Anonymous runs get no key.

use async_trait::async_trait;
use nexagent_core::auth::AuthContext;
use nexagent_core::error::ToolError;
use nexagent_core::schema::{ArgKind, ArgumentSchema};
use nexagent_core::tool::{FailureKind, Tool, ToolResult};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    Bash,
}

impl Language {
    fn tool_name(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Bash => "bash",
        }
    }
}

/// Captured output of one sandbox run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl SandboxOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    fn render(&self) -> String {
        let mut text = self.stdout.trim_end().to_string();
        if !self.stderr.trim().is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str("[stderr]: ");
            text.push_str(self.stderr.trim_end());
        }
        if !self.success() {
            text = format!("[exit code: {}]\n{text}", self.exit_code);
        }
        if text.is_empty() {
            text = "(no output)".into();
        }
        text
    }
}

/// Isolated code execution.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn run(
        &self,
        language: Language,
        source: &str,
        auth: &AuthContext,
    ) -> Result<SandboxOutput, ToolError>;
}

/// Runs code in a local child process with a wall-clock limit.
///
/// The child is spawned with `kill_on_drop`, so a timeout or a cancelled
/// request tears it down.
pub struct ProcessSandbox {
    python: String,
    shell: String,
    workdir: Option<PathBuf>,
    timeout: Duration,
    max_output_bytes: usize,
    nexus_url: String,
}

impl ProcessSandbox {
    pub fn new(timeout: Duration) -> Self {
        Self {
            python: "python3".into(),
            shell: "bash".into(),
            workdir: None,
            timeout,
            max_output_bytes: 64 * 1024,
            nexus_url: "http://localhost:8080".into(),
        }
    }

    pub fn from_config(
        sandbox: &nexagent_config::SandboxConfig,
        nexus: &nexagent_config::NexusConfig,
    ) -> Self {
        Self {
            python: sandbox.python.clone(),
            shell: sandbox.shell.clone(),
            workdir: sandbox.workdir.clone(),
            timeout: Duration::from_secs(sandbox.timeout_secs),
            max_output_bytes: sandbox.max_output_bytes,
            nexus_url: nexus.url.clone(),
        }
    }

    pub fn with_shell(mut self, shell: &str) -> Self {
        self.shell = shell.into();
        self
    }

    fn command(&self, language: Language, source: &str, auth: &AuthContext) -> Command {
        let program = match language {
            Language::Python => &self.python,
            Language::Bash => &self.shell,
        };
        let mut cmd = Command::new(program);
        cmd.arg("-c")
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env("NEXUS_SERVER_URL", &self.nexus_url);

        match auth.bearer_token() {
            Some(key) => {
                cmd.env("NEXUS_API_KEY", key);
            }
            None => {
                cmd.env_remove("NEXUS_API_KEY");
            }
        }
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn truncate(&self, bytes: &[u8]) -> String {
        let text = String::from_utf8_lossy(bytes);
        if text.len() <= self.max_output_bytes {
            return text.into_owned();
        }
        let mut cut = self.max_output_bytes;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        format!(
            "{}\n... (output truncated, {} bytes total)",
            &text[..cut],
            text.len()
        )
    }
}

#[async_trait]
impl Sandbox for ProcessSandbox {
    async fn run(
        &self,
        language: Language,
        source: &str,
        auth: &AuthContext,
    ) -> Result<SandboxOutput, ToolError> {
        let tool_name = language.tool_name();
        debug!(tool = tool_name, caller = %auth.fingerprint(), "Starting sandbox process");

        let child = self
            .command(language, source, auth)
            .spawn()
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: tool_name.into(),
                reason: format!("failed to start sandbox: {e}"),
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ToolError::ExecutionFailed {
                tool_name: tool_name.into(),
                reason: e.to_string(),
            })?,
            Err(_) => {
                warn!(tool = tool_name, timeout_secs = self.timeout.as_secs(), "Sandbox timed out");
                return Err(ToolError::Timeout {
                    tool_name: tool_name.into(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        Ok(SandboxOutput {
            stdout: self.truncate(&output.stdout),
            stderr: self.truncate(&output.stderr),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// `python(code)` and `bash(command)` share this adapter.
pub struct SandboxTool {
    language: Language,
    sandbox: Arc<dyn Sandbox>,
}

impl SandboxTool {
    pub fn python(sandbox: Arc<dyn Sandbox>) -> Self {
        Self {
            language: Language::Python,
            sandbox,
        }
    }

    pub fn bash(sandbox: Arc<dyn Sandbox>) -> Self {
        Self {
            language: Language::Bash,
            sandbox,
        }
    }

    fn source_arg(&self) -> &'static str {
        match self.language {
            Language::Python => "code",
            Language::Bash => "command",
        }
    }
}

#[async_trait]
impl Tool for SandboxTool {
    fn name(&self) -> &str {
        self.language.tool_name()
    }

    fn description(&self) -> &str {
        match self.language {
            Language::Python => {
                "Run Python code in a sandbox and return stdout/stderr. The Nexus filesystem is mounted at /mnt/nexus."
            }
            Language::Bash => {
                "Run a bash command in a sandbox and return stdout/stderr. The Nexus filesystem is mounted at /mnt/nexus."
            }
        }
    }

    fn argument_schema(&self) -> ArgumentSchema {
        match self.language {
            Language::Python => {
                ArgumentSchema::new().required("code", ArgKind::String, "Python source to execute")
            }
            Language::Bash => {
                ArgumentSchema::new().required("command", ArgKind::String, "Shell command to execute")
            }
        }
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        auth: &AuthContext,
    ) -> Result<ToolResult, ToolError> {
        let source = arguments[self.source_arg()]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                ToolError::InvalidArguments(format!("'{}' must not be empty", self.source_arg()))
            })?;

        let output = self.sandbox.run(self.language, source, auth).await?;
        let text = output.render();
        let result = if output.success() {
            ToolResult::success(text)
        } else {
            ToolResult::failure(FailureKind::ExecutionFailed, text)
        };
        Ok(result.with_data(serde_json::json!({ "exit_code": output.exit_code })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::RecordingSandbox;
    use nexagent_core::tool::ToolOutcome;

    #[test]
    fn output_rendering() {
        let ok = SandboxOutput {
            stdout: "42\n".into(),
            stderr: String::new(),
            exit_code: 0,
        };
        assert_eq!(ok.render(), "42");

        let failed = SandboxOutput {
            stdout: String::new(),
            stderr: "NameError: x\n".into(),
            exit_code: 1,
        };
        assert_eq!(failed.render(), "[exit code: 1]\n[stderr]: NameError: x");
        assert_eq!(SandboxOutput::default().render(), "(no output)");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut sandbox = ProcessSandbox::new(Duration::from_secs(1));
        sandbox.max_output_bytes = 5;
        let out = sandbox.truncate("ab\u{e9}\u{e9}cd".as_bytes());
        assert!(out.starts_with("ab\u{e9}"));
        assert!(out.contains("truncated"));
    }

    #[tokio::test]
    async fn python_tool_uses_code_argument() {
        let sandbox = Arc::new(RecordingSandbox {
            output: SandboxOutput {
                stdout: "hello\n".into(),
                ..Default::default()
            },
            ..Default::default()
        });
        let tool = SandboxTool::python(sandbox.clone());
        let result = tool
            .execute(serde_json::json!({"code": "print('hello')"}), &AuthContext::anonymous())
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.output, "hello");
        assert_eq!(
            sandbox.runs.lock().unwrap()[0],
            (Language::Python, "print('hello')".to_string())
        );
    }

    #[tokio::test]
    async fn nonzero_exit_is_failure_outcome() {
        let sandbox = Arc::new(RecordingSandbox {
            output: SandboxOutput {
                exit_code: 2,
                stderr: "ls: cannot access".into(),
                ..Default::default()
            },
            ..Default::default()
        });
        let result = SandboxTool::bash(sandbox)
            .execute(serde_json::json!({"command": "ls /nope"}), &AuthContext::anonymous())
            .await
            .unwrap();
        assert_eq!(result.outcome, ToolOutcome::Failure(FailureKind::ExecutionFailed));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_sandbox_runs_and_exports_credential() {
        let sandbox = ProcessSandbox::new(Duration::from_secs(10)).with_shell("sh");
        let auth = AuthContext::from_header(Some("Bearer sk-sandbox"));
        let output = sandbox
            .run(Language::Bash, "echo \"$NEXUS_SERVER_URL $NEXUS_API_KEY\"", &auth)
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "http://localhost:8080 sk-sandbox");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn anonymous_run_gets_no_nexus_key() {
        let sandbox = ProcessSandbox::from_config(
            &nexagent_config::SandboxConfig {
                shell: "sh".into(),
                ..Default::default()
            },
            &nexagent_config::NexusConfig::default(),
        );
        let tool = SandboxTool::bash(Arc::new(sandbox));
        let result = tool
            .execute(
                serde_json::json!({"command": "echo \"key=${NEXUS_API_KEY:-none}\""}),
                &AuthContext::anonymous(),
            )
            .await
            .unwrap();
        assert_eq!(result.output, "key=none");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_sandbox_times_out() {
        let sandbox = ProcessSandbox::new(Duration::from_millis(200)).with_shell("sh");
        let err = sandbox
            .run(Language::Bash, "sleep 5", &AuthContext::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { tool_name, .. } if tool_name == "bash"));
    }
}
