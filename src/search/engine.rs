use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogSnapshot, ScoredCandidate},
    ports::ScoredSearchPort,
    search::BoolQuery,
};

/// HTTP client for the external search engine
///
/// Submits weighted boolean queries against the perfume index and returns
/// ranked hits. Any transport or non-2xx failure surfaces as
/// `SearchUnavailable`; callers decide whether to degrade or propagate.
#[derive(Clone)]
pub struct SearchEngineClient {
    http_client: HttpClient,
    base_url: String,
    index: String,
}

/// Raw search response envelope
#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f32>,
    #[serde(default)]
    matched_queries: Vec<String>,
}

/// Raw single-document response
#[derive(Debug, Deserialize)]
struct DocResponse {
    found: bool,
    #[serde(rename = "_source")]
    source: Option<CatalogSnapshot>,
}

impl SearchEngineClient {
    pub fn new(base_url: String, index: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url,
            index,
        }
    }

    /// Converts raw hits into scored candidates
    ///
    /// Hits whose id is not a valid perfume identifier are dropped with a
    /// warning rather than failing the whole result page.
    fn parse_hits(&self, response: SearchResponse) -> Vec<ScoredCandidate> {
        response
            .hits
            .hits
            .into_iter()
            .filter_map(|hit| match Uuid::parse_str(&hit.id) {
                Ok(perfume_id) => Some(ScoredCandidate {
                    perfume_id,
                    score: hit.score.unwrap_or(0.0),
                    matched_terms: hit.matched_queries,
                }),
                Err(_) => {
                    tracing::warn!(hit_id = %hit.id, "Dropping hit with malformed id");
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl ScoredSearchPort for SearchEngineClient {
    async fn search(&self, query: &BoolQuery, limit: usize) -> AppResult<Vec<ScoredCandidate>> {
        let url = format!("{}/{}/_search", self.base_url, self.index);
        let body = json!({
            "size": limit,
            "query": query.to_json(),
        });

        tracing::debug!(index = %self.index, limit = limit, "Executing scored search");

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::SearchUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Search request failed");
            return Err(AppError::SearchUnavailable(format!(
                "search returned status {}",
                status
            )));
        }

        let search_response: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::SearchUnavailable(e.to_string()))?;

        let candidates = self.parse_hits(search_response);
        tracing::debug!(hit_count = candidates.len(), "Scored search completed");

        Ok(candidates)
    }

    async fn get(&self, perfume_id: Uuid) -> AppResult<CatalogSnapshot> {
        let url = format!("{}/{}/_doc/{}", self.base_url, self.index, perfume_id);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::SearchUnavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("perfume {}", perfume_id)));
        }

        if !response.status().is_success() {
            return Err(AppError::SearchUnavailable(format!(
                "document fetch returned status {}",
                response.status()
            )));
        }

        let doc: DocResponse = response
            .json()
            .await
            .map_err(|e| AppError::SearchUnavailable(e.to_string()))?;

        match doc.source {
            Some(snapshot) if doc.found => Ok(snapshot),
            _ => Err(AppError::NotFound(format!("perfume {}", perfume_id))),
        }
    }
}
