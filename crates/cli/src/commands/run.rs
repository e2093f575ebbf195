//! `nexagent run`: serve one request from the terminal.

use clap::Args;
use nexagent_agent::{AgentRuntime, AgentStreamEvent};
use nexagent_config::AppConfig;
use nexagent_core::request::{InputMessage, RequestMetadata, RunInput, RunRequest};
use nexagent_gateway::runs::{ErrorResponse, RunResponse};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// The user message
    pub message: String,

    /// Assistant to run
    #[arg(short, long, default_value = "react")]
    pub assistant: String,

    /// Provider (anthropic, openai, gemini, openrouter)
    #[arg(long)]
    pub provider: Option<String>,

    /// Model tier (pro, flash)
    #[arg(long)]
    pub tier: Option<String>,

    /// Explicit model id, overriding the tier
    #[arg(long)]
    pub model: Option<String>,

    /// Bearer credential forwarded to tools
    #[arg(long, env = "NEXAGENT_AUTH", hide_env_values = true)]
    pub auth: Option<String>,

    /// File currently open in the caller's editor
    #[arg(long)]
    pub opened_file: Option<String>,

    /// Caller's workspace root
    #[arg(long)]
    pub workspace: Option<String>,

    /// Enable extended thinking where the provider supports it
    #[arg(long, overrides_with = "no_thinking")]
    pub thinking: bool,

    /// Disable extended thinking even where it is on by default
    #[arg(long, overrides_with = "thinking")]
    pub no_thinking: bool,

    /// Print agent events as they happen
    #[arg(long)]
    pub stream: bool,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// `None` leaves the choice to the assistant and provider.
    fn enable_thinking(&self) -> Option<bool> {
        if self.no_thinking {
            Some(false)
        } else if self.thinking {
            Some(true)
        } else {
            None
        }
    }

    pub fn to_request(&self) -> RunRequest {
        RunRequest {
            assistant_id: self.assistant.clone(),
            input: RunInput {
                messages: vec![InputMessage::new("user", &self.message)],
            },
            metadata: RequestMetadata {
                x_auth: self.auth.clone(),
                opened_file_path: self.opened_file.clone(),
                workspace_path: self.workspace.clone(),
                llm_provider: self.provider.clone(),
                llm_tier: self.tier.clone(),
                llm_model: self.model.clone(),
                enable_thinking: self.enable_thinking(),
                ..Default::default()
            },
        }
    }
}

pub async fn run(config: &AppConfig, args: RunArgs) -> anyhow::Result<()> {
    let runtime = AgentRuntime::from_config(config);
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let (tx, printer) = if args.stream && !args.json {
        let (tx, rx) = mpsc::channel(64);
        (Some(tx), Some(tokio::spawn(print_events(rx))))
    } else {
        (None, None)
    };

    let result = runtime.run(args.to_request(), cancel, tx).await;
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    match result {
        Ok(outcome) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&RunResponse::from(outcome))?);
                return Ok(());
            }
            if !args.stream {
                println!("{}", outcome.answer);
                print_sources(&outcome.citations);
            }
            tracing::debug!(
                provider = %outcome.provider.provider,
                model = %outcome.provider.model,
                iterations = outcome.iterations,
                "Run complete"
            );
            Ok(())
        }
        Err(failure) => {
            if args.json {
                let body = ErrorResponse {
                    error: failure.error.to_string(),
                    kind: failure.error.kind().to_string(),
                    state: failure.last_state.to_string(),
                    iterations: failure.iterations,
                    messages: failure.conversation.messages().to_vec(),
                };
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            Err(failure.into())
        }
    }
}

async fn print_events(mut rx: mpsc::Receiver<AgentStreamEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            AgentStreamEvent::Thought { content } => println!("[thought] {content}"),
            AgentStreamEvent::ToolCall { name, input, .. } => println!("[tool] {name} {input}"),
            AgentStreamEvent::ToolResult {
                name,
                success,
                duration_ms,
                ..
            } => {
                let status = if success { "ok" } else { "failed" };
                println!("[tool] {name} {status} in {duration_ms}ms");
            }
            AgentStreamEvent::Citation { citation } => {
                println!("[source] {} {}", citation.marker, citation.title)
            }
            AgentStreamEvent::PolicyRejected { guard, reason, .. } => {
                println!("[policy] {guard}: {reason}")
            }
            AgentStreamEvent::Answer { content, citations } => {
                println!();
                println!("{content}");
                print_sources(&citations);
            }
            AgentStreamEvent::Done { iterations, .. } => {
                println!();
                println!("[done] {iterations} iteration(s)");
            }
            AgentStreamEvent::Error { message, state, .. } => {
                println!("[error] {message} (state {state})")
            }
        }
    }
}

fn print_sources(citations: &[nexagent_core::citation::Citation]) {
    if citations.is_empty() {
        return;
    }
    println!();
    println!("Sources:");
    for c in citations {
        match c.year {
            Some(year) => println!("  {} {}. {} ({year}). {}", c.marker, c.title, c.publication, c.url),
            None => println!("  {} {}. {}. {}", c.marker, c.title, c.publication, c.url),
        }
    }
}
