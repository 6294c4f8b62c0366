//! Prowlarr API client
//!
//! HTTP client for a Prowlarr-style aggregation service. The service
//! fans a query out to the configured indexers, parses and scores the
//! results, and returns them as one list; this client normalizes that
//! list into domain releases sorted by score and surfaces the response
//! headers so the engine can honor `Retry-After`.

use crate::models::ProwlarrSearchResult;
use async_trait::async_trait;
use fetcharr_core::{
    FetcharrError, Indexer, IndexerResponse, Release, Result, ScoringParams, SearchCriteria,
};
use reqwest::{Client, Response};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Configuration for the Prowlarr client
#[derive(Debug, Clone)]
pub struct ProwlarrConfig {
    /// Base URL of the Prowlarr instance (e.g., "http://localhost:9696")
    pub base_url: String,

    /// API key for authentication
    pub api_key: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// User agent string to send with requests
    pub user_agent: String,
}

impl Default for ProwlarrConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9696".to_string(),
            api_key: String::new(),
            timeout: 30,
            user_agent: "Fetcharr/0.3".to_string(),
        }
    }
}

/// Main Prowlarr API client
#[derive(Debug)]
pub struct ProwlarrClient {
    config: ProwlarrConfig,
    client: Client,
    base_url: Url,
}

impl ProwlarrClient {
    /// Create a new Prowlarr client with the given configuration
    pub fn new(config: ProwlarrConfig) -> Result<Self> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| FetcharrError::ExternalServiceError {
                service: "prowlarr".to_string(),
                error: format!("Invalid base URL: {}", e),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| FetcharrError::ExternalServiceError {
                service: "prowlarr".to_string(),
                error: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            config,
            client,
            base_url,
        })
    }

    fn search_url(&self, criteria: &SearchCriteria, scoring: &ScoringParams) -> Result<Url> {
        let mut url =
            self.base_url
                .join("/api/v1/search")
                .map_err(|e| FetcharrError::ExternalServiceError {
                    service: "prowlarr".to_string(),
                    error: format!("Failed to build search URL: {}", e),
                })?;

        {
            let mut query_pairs = url.query_pairs_mut();
            query_pairs.append_pair("type", &criteria.search_type.to_string());
            if !criteria.query.is_empty() {
                query_pairs.append_pair("query", &criteria.query);
            }
            if !criteria.categories.is_empty() {
                let categories = criteria
                    .categories
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                query_pairs.append_pair("categories", &categories);
            }
            if let Some(ref imdb_id) = criteria.imdb_id {
                query_pairs.append_pair("imdbId", imdb_id);
            }
            if let Some(tmdb_id) = criteria.tmdb_id {
                query_pairs.append_pair("tmdbId", &tmdb_id.to_string());
            }
            if let Some(tvdb_id) = criteria.tvdb_id {
                query_pairs.append_pair("tvdbId", &tvdb_id.to_string());
            }
            if let Some(year) = criteria.year {
                query_pairs.append_pair("year", &year.to_string());
            }
            if let Some(season) = criteria.season {
                query_pairs.append_pair("season", &season.to_string());
            }
            if let Some(episode) = criteria.episode {
                query_pairs.append_pair("episode", &episode.to_string());
            }
            if let Some(limit) = criteria.limit {
                query_pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(min_seeders) = scoring.min_seeders {
                query_pairs.append_pair("minSeeders", &min_seeders.to_string());
            }
        }
        Ok(url)
    }

    fn collect_headers(response: &Response) -> HashMap<String, String> {
        response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl Indexer for ProwlarrClient {
    async fn search_torrents(
        &self,
        criteria: &SearchCriteria,
        scoring: &ScoringParams,
    ) -> Result<IndexerResponse> {
        let url = self.search_url(criteria, scoring)?;
        debug!(%url, "Searching Prowlarr");

        let response = self
            .client
            .get(url)
            .header("X-Api-Key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| FetcharrError::ExternalServiceError {
                service: "prowlarr".to_string(),
                error: format!("Request failed: {}", e),
            })?;

        let headers = Self::collect_headers(&response);
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FetcharrError::IndexerError {
                message: format!("HTTP {}: {}", status, error_text),
            });
        }

        let results: Vec<ProwlarrSearchResult> =
            response
                .json()
                .await
                .map_err(|e| FetcharrError::IndexerError {
                    message: format!("Failed to parse search response: {}", e),
                })?;

        let mut releases: Vec<Release> = results.into_iter().map(Release::from).collect();
        // the engine relies on score-descending order; sort is stable
        releases.sort_by(|a, b| b.score.cmp(&a.score));

        debug!(count = releases.len(), "Prowlarr search finished");
        Ok(IndexerResponse { releases, headers })
    }
}
