//! NewsAPI-style headlines source.
//!
//! Talks to any endpoint that speaks the NewsAPI `top-headlines` dialect:
//!
//! ```text
//! GET <endpoint>?q=<query>&page=<n>&pageSize=<k>&apiKey=<key>
//! → { "status": "ok", "articles": [ { "title", "description", "urlToImage",
//!                                     "source": { "id", "name" }, ... } ] }
//! ```
//!
//! The payload is decoded into private wire structs and then validated into
//! [`Article`]s.  Anything that does not fit is a
//! [`FeedError::MalformedResponse`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info};

use super::{Article, HeadlinesSource};
use crate::error::FeedError;

/// Fallback when a headline names neither a source id nor a source name.
const UNKNOWN_SOURCE: &str = "unknown";

/// A headlines source backed by a NewsAPI-compatible HTTP endpoint.
pub struct NewsApiSource {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    /// Sent as `sources=` when the query is empty.
    default_sources: Option<String>,
}

impl NewsApiSource {
    /// Create a source for `endpoint`, with a per-request `timeout`.
    pub fn new(
        endpoint: Url,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            default_sources: None,
        })
    }

    /// Comma-separated source ids to request when no search query is set.
    pub fn with_default_sources(mut self, sources: Option<String>) -> Self {
        self.default_sources = sources.filter(|s| !s.is_empty());
        self
    }

    /// Build the request URL for one page.
    ///
    /// An empty query omits `q` entirely (and sends the default source list
    /// instead, if one is configured).
    pub fn request_url(&self, query: &str, page: u32, page_size: u32) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            if query.is_empty() {
                if let Some(sources) = &self.default_sources {
                    pairs.append_pair("sources", sources);
                }
            } else {
                pairs.append_pair("q", query);
            }
            pairs.append_pair("page", &page.to_string());
            pairs.append_pair("pageSize", &page_size.to_string());
            pairs.append_pair("apiKey", &self.api_key);
        }
        url
    }

    /// Validate a response body and map it into [`Article`]s.
    ///
    /// This is a pure function (no I/O) so that tests can exercise the schema
    /// rules without a server.
    pub fn parse_response(body: &[u8]) -> Result<Vec<Article>, FeedError> {
        let response: WireResponse = serde_json::from_slice(body)?;

        if response.status.as_deref() == Some("error") {
            let message = response
                .message
                .unwrap_or_else(|| "upstream reported an error".into());
            return Err(FeedError::NetworkFailure(message));
        }

        let articles = response
            .articles
            .ok_or_else(|| FeedError::MalformedResponse("missing `articles` array".into()))?;

        articles
            .into_iter()
            .enumerate()
            .map(|(i, wire)| wire.into_article(i))
            .collect()
    }
}

#[async_trait]
impl HeadlinesSource for NewsApiSource {
    fn name(&self) -> &str {
        self.endpoint.host_str().unwrap_or("headlines")
    }

    async fn fetch_page(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Article>, FeedError> {
        debug!(source = self.name(), query, page, page_size, "requesting headlines");

        let response = self
            .client
            .get(self.request_url(query, page, page_size))
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let detail = upstream_message(&body)
                .or_else(|| status.canonical_reason().map(String::from))
                .unwrap_or_default();
            return Err(FeedError::NetworkFailure(format!(
                "HTTP {}: {detail}",
                status.as_u16()
            )));
        }

        let articles = Self::parse_response(&body)?;
        info!(source = self.name(), page, count = articles.len(), "fetched headlines");
        Ok(articles)
    }
}

/// Pull the `message` field out of an error body, if there is one.
fn upstream_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<WireResponse>(body)
        .ok()
        .and_then(|r| r.message)
}

// ---------------------------------------------------------------------------
// Wire schema
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WireResponse {
    status: Option<String>,
    message: Option<String>,
    articles: Option<Vec<WireArticle>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
    source: Option<WireSource>,
}

#[derive(Deserialize)]
struct WireSource {
    id: Option<String>,
    name: Option<String>,
}

impl WireArticle {
    fn into_article(self, index: usize) -> Result<Article, FeedError> {
        let title = self
            .title
            .ok_or_else(|| FeedError::MalformedResponse(format!("article {index} has no title")))?;

        let source_id = self
            .source
            .and_then(|s| s.id.or(s.name))
            .unwrap_or_else(|| UNKNOWN_SOURCE.into());

        // Unparseable dates degrade to None rather than rejecting the article.
        let published_at = self
            .published_at
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(Article::new(title, source_id, published_at)
            .with_description(self.description)
            .with_image_url(self.url_to_image)
            .with_url(self.url))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
