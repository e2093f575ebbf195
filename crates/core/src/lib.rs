//! # nexagent Core
//!
//! Domain types, traits, and error definitions for the nexagent
//! tool-orchestration runtime. This crate has **no framework dependencies**;
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (LLM transport, tool adapter) is a trait here.
//! Implementations live in their respective crates, which makes it easy to:
//! - Swap implementations via configuration
//! - Test the loop with scripted providers and in-memory tools
//! - Keep the dependency graph pointing inward on core

pub mod auth;
pub mod citation;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod request;
pub mod schema;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use auth::{AuthContext, AuthScope};
pub use citation::{Citation, CitationDraft, CitationLedger};
pub use error::{Error, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{
    ModelSource, Provider, ProviderConfig, ProviderRequest, ProviderResponse, ThinkingConfig,
    Tier, ToolDefinition, Usage,
};
pub use request::{InputMessage, RequestMetadata, RunInput, RunRequest};
pub use schema::{ArgKind, ArgSpec, ArgumentSchema};
pub use tool::{
    Credentials, FailureKind, RegistryBuilder, Tool, ToolCall, ToolOutcome, ToolRegistry,
    ToolResult,
};
