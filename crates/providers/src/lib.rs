//! LLM provider resolution and transports for nexagent.
//!
//! The [`ProviderResolver`] turns request metadata into a
//! [`ProviderConfig`](nexagent_core::ProviderConfig); the [`ProviderRouter`]
//! maps the resolved provider name to a `nexagent_core::Provider`.

pub mod openai_compat;
pub mod resolver;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use resolver::{AssistantDefaults, ProviderResolver, builtin_model};
pub use router::{ProviderRouter, build_from_config};
