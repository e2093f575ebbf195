//! Tool adapters for nexagent.
//!
//! Core tools work against a Nexus server (filesystem, memories) and a
//! code sandbox and are always registered. Web search, web crawl and the
//! dental literature search need third-party API keys and are registered
//! only when those keys are present at startup.

pub mod fs;
pub mod literature;
pub mod memory;
pub mod nexus;
pub mod sandbox;
pub mod search;
pub mod web;

#[cfg(test)]
mod fakes;

use nexagent_config::AppConfig;
use nexagent_core::tool::{Credentials, RegistryBuilder, ToolRegistry};
use std::sync::Arc;
use std::time::Duration;

pub use fs::{GlobFilesTool, GrepFilesTool, ReadCommand, ReadFileTool, WriteFileTool};
pub use literature::DentalLiteratureTool;
pub use memory::QueryMemoriesTool;
pub use nexus::{GrepMatch, HttpNexusClient, MemoryRecord, NexusClient, Skill};
pub use sandbox::{Language, ProcessSandbox, Sandbox, SandboxOutput, SandboxTool};
pub use search::{CrawlBackend, FirecrawlClient, SearchBackend, TavilyClient};
pub use web::{WebCrawlTool, WebSearchTool};

/// The external services tool adapters talk to.
#[derive(Clone)]
pub struct ToolBackends {
    pub nexus: Arc<dyn NexusClient>,
    pub sandbox: Arc<dyn Sandbox>,
    pub search: Arc<dyn SearchBackend>,
    pub crawl: Arc<dyn CrawlBackend>,
}

impl ToolBackends {
    /// Real HTTP and process backends built from configuration.
    pub fn from_config(config: &AppConfig, credentials: &Credentials) -> Self {
        let timeout = Duration::from_secs(config.tools.timeout_secs);
        let gates = &config.tools.gates;
        let search_key = credentials
            .get(&gates.web_search)
            .or_else(|| credentials.get(&gates.search_dental_literature))
            .unwrap_or_default();
        let crawl_key = credentials.get(&gates.web_crawl).unwrap_or_default();

        Self {
            nexus: Arc::new(HttpNexusClient::from_config(&config.nexus)),
            sandbox: Arc::new(ProcessSandbox::from_config(&config.sandbox, &config.nexus)),
            search: Arc::new(TavilyClient::new(&config.tools.tavily_url, search_key, timeout)),
            crawl: Arc::new(FirecrawlClient::new(&config.tools.firecrawl_url, crawl_key, timeout)),
        }
    }
}

/// Build the registry over the given backends.
///
/// Registration order is the order tools are advertised to the model.
pub fn build_registry_with(
    backends: ToolBackends,
    config: &AppConfig,
    credentials: Credentials,
) -> ToolRegistry {
    let gates = &config.tools.gates;
    RegistryBuilder::new(credentials)
        .core(GrepFilesTool::new(backends.nexus.clone()))
        .core(GlobFilesTool::new(backends.nexus.clone()))
        .core(ReadFileTool::new(backends.nexus.clone()))
        .core(WriteFileTool::new(backends.nexus.clone()))
        .core(SandboxTool::python(backends.sandbox.clone()))
        .core(SandboxTool::bash(backends.sandbox.clone()))
        .core(QueryMemoriesTool::new(backends.nexus.clone()))
        .optional(
            WebSearchTool::new(backends.search.clone(), &gates.web_search)
                .with_default_max_results(config.tools.max_search_results),
        )
        .optional(WebCrawlTool::new(backends.crawl.clone(), &gates.web_crawl))
        .optional(DentalLiteratureTool::new(
            backends.search.clone(),
            &gates.search_dental_literature,
        ))
        .max_parallel(config.agent.max_parallel_tools)
        .build()
}
