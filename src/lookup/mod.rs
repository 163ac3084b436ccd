//! Article lookup service client.
//!
//! `ArticleLookup` abstracts the HTTP call for testability;
//! `HttpArticleLookup` is the real client. Handlers depend on the trait,
//! so tests drive them with a mock instead of a network.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::LookupConfig;
use crate::error::{BotError, Result};

/// One article returned by the lookup service. Fields the service omits
/// deserialize to empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub url: String,
}

/// Abstracts the article search call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArticleLookup: Send + Sync {
    /// Search for articles matching `query`. An empty list is a valid
    /// result, not an error.
    async fn search(&self, query: &str) -> Result<Vec<Article>>;
}

/// Real lookup client speaking JSON over HTTP.
pub struct HttpArticleLookup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpArticleLookup {
    /// Build a client from configuration. Fails if the base URL is not
    /// configured.
    pub fn new(config: &LookupConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(BotError::Config(
                "lookup.base_url is not configured".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("devbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BotError::Lookup(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl ArticleLookup for HttpArticleLookup {
    async fn search(&self, query: &str) -> Result<Vec<Article>> {
        debug!(query, "fetching articles from lookup service");
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query)])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| BotError::Lookup(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| BotError::Lookup(format!("lookup service returned an error: {e}")))?;
        let articles: Vec<Article> = response
            .json()
            .await
            .map_err(|e| BotError::Lookup(format!("cannot decode lookup response: {e}")))?;
        debug!(count = articles.len(), "lookup service responded");
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_missing_fields_default_empty() {
        let article: Article = serde_json::from_str(r#"{"title": "T"}"#).unwrap();
        assert_eq!(article.title, "T");
        assert_eq!(article.body, "");
        assert_eq!(article.url, "");
    }

    #[test]
    fn test_unconfigured_base_url_is_config_error() {
        assert!(matches!(
            HttpArticleLookup::new(&LookupConfig::default()),
            Err(BotError::Config(_))
        ));
    }

    #[test]
    fn test_configured_client_builds() {
        let config = LookupConfig {
            base_url: "https://reads.example.com/api/search".to_string(),
            timeout_secs: 5,
        };
        assert!(HttpArticleLookup::new(&config).is_ok());
    }
}
