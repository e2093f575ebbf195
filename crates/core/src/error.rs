//! Error types for the nexagent domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] is the
//! request-level taxonomy the reasoning loop reports to callers.

use thiserror::Error;

/// The top-level error type for all nexagent operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Resolution ---
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // --- Caller-contract violations (model proposed an invalid action) ---
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidToolArguments { tool: String, reason: String },

    // --- Safety valves ---
    #[error("Iteration budget exceeded after {limit} iterations")]
    IterationBudgetExceeded { limit: u32 },

    #[error("Policy unsatisfiable: answer rejected {rejections} times")]
    PolicyUnsatisfiable { rejections: u32 },

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Request cancelled")]
    Cancelled,

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a [`Error::Configuration`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Stable machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::InvalidRequest(_) => "invalid_request",
            Self::UnknownTool(_) => "unknown_tool",
            Self::InvalidToolArguments { .. } => "invalid_tool_arguments",
            Self::IterationBudgetExceeded { .. } => "iteration_budget_exceeded",
            Self::PolicyUnsatisfiable { .. } => "policy_unsatisfiable",
            Self::Provider(_) => "provider_error",
            Self::Tool(_) => "tool_error",
            Self::Cancelled => "cancelled",
            Self::Serialization(_) => "serialization_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the model caused this error by proposing an invalid action.
    ///
    /// The loop turns these into corrective tool results instead of failing.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::UnknownTool(_) | Self::InvalidToolArguments { .. })
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Adapter-level failures. The registry converts these into failed
/// [`ToolResult`](crate::tool::ToolResult)s; they never abort the loop.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Sandbox timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Permission denied: {tool_name} — {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Remote operation failed: {operation} — {reason}")]
    Remote { operation: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}
