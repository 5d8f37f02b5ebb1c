//! HTTP retrieval backends for the knowledge handler's two search tools.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use switchboard_agent::{KnowledgeSearch, ToolError, WebSearch};
use switchboard_core::config::SearchConfig;

pub const NO_KNOWLEDGE_RESULTS: &str = "No knowledge base entries matched the query.";
pub const NO_WEB_RESULTS: &str = "No web results found for the query.";

/// Client for the internal knowledge-base retrieval service.
pub struct HttpKnowledgeSearch {
    client: reqwest::Client,
    base_url: String,
}

/// Client for the external web-search service.
pub struct HttpWebSearch {
    client: reqwest::Client,
    base_url: String,
    max_results: usize,
}

pub fn build_clients(
    config: &SearchConfig,
) -> Result<(HttpKnowledgeSearch, HttpWebSearch), reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .build()?;

    Ok((
        HttpKnowledgeSearch {
            client: client.clone(),
            base_url: config.knowledge_base_url.clone(),
        },
        HttpWebSearch {
            client,
            base_url: config.web_search_base_url.clone(),
            max_results: config.max_web_results.max(1) as usize,
        },
    ))
}

#[derive(Debug, Deserialize)]
struct KnowledgeResponse {
    results: Vec<KnowledgeEntry>,
}

#[derive(Debug, Deserialize)]
struct KnowledgeEntry {
    content: String,
    #[serde(default)]
    source: Option<String>,
}

fn format_knowledge_results(entries: &[KnowledgeEntry]) -> String {
    if entries.is_empty() {
        return NO_KNOWLEDGE_RESULTS.to_string();
    }

    entries
        .iter()
        .map(|entry| match entry.source.as_deref().filter(|s| !s.is_empty()) {
            Some(source) => format!("{}\n[Source: {source}]", entry.content),
            None => entry.content.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Deserialize)]
struct WebResponse {
    results: Vec<WebEntry>,
}

#[derive(Debug, Deserialize)]
struct WebEntry {
    title: String,
    body: String,
    #[serde(default)]
    href: Option<String>,
}

fn format_web_results(entries: &[WebEntry], max_results: usize) -> String {
    if entries.is_empty() {
        return NO_WEB_RESULTS.to_string();
    }

    entries
        .iter()
        .take(max_results)
        .map(|entry| match entry.href.as_deref().filter(|h| !h.is_empty()) {
            Some(href) => format!("- {}: {} ({href})", entry.title, entry.body),
            None => format!("- {}: {}", entry.title, entry.body),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl KnowledgeSearch for HttpKnowledgeSearch {
    async fn search(&self, query: &str) -> Result<String, ToolError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|error| ToolError(format!("knowledge base unreachable: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError(format!("knowledge base returned {status}")));
        }

        let parsed: KnowledgeResponse = response
            .json()
            .await
            .map_err(|error| ToolError(format!("knowledge base response invalid: {error}")))?;

        debug!(
            event_name = "search.knowledge.completed",
            result_count = parsed.results.len(),
            "knowledge base query completed"
        );
        Ok(format_knowledge_results(&parsed.results))
    }
}

#[async_trait]
impl WebSearch for HttpWebSearch {
    async fn search(&self, query: &str) -> Result<String, ToolError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|error| ToolError(format!("web search unreachable: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError(format!("web search returned {status}")));
        }

        let parsed: WebResponse = response
            .json()
            .await
            .map_err(|error| ToolError(format!("web search response invalid: {error}")))?;

        debug!(
            event_name = "search.web.completed",
            result_count = parsed.results.len(),
            "web search query completed"
        );
        Ok(format_web_results(&parsed.results, self.max_results))
    }
}
