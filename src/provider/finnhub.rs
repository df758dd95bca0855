//! Finnhub symbol-search adapter.
//!
//! Uses the `/search` endpoint for free-text lookup. Finnhub's free tier
//! is limited to 60 calls per minute; the per-host token bucket keeps the
//! engine well under that. API documentation: https://finnhub.io/docs/api

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use super::SearchProvider;
use crate::errors::ResolverError;
use crate::models::{AssetKind, RawHit};
use crate::transport::ResilientClient;

const BASE_URL: &str = "https://finnhub.io/api/v1";
const HOST: &str = "finnhub.io";
const PROVIDER_ID: &str = "Finnhub";

/// Response from /search
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchItem>,
}

/// Individual search result item
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    /// Full description/name
    #[serde(default)]
    description: String,
    /// Display symbol, fallback description
    #[serde(default)]
    display_symbol: String,
    /// Symbol for API calls
    #[serde(default)]
    symbol: String,
    /// Security type (e.g. "Common Stock", "ETF")
    #[serde(rename = "type", default)]
    security_type: String,
}

/// Finnhub free-text symbol search.
pub struct FinnhubProvider {
    api_key: Option<String>,
}

impl FinnhubProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

#[async_trait]
impl SearchProvider for FinnhubProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn host(&self) -> &'static str {
        HOST
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search_raw(
        &self,
        client: &ResilientClient,
        query: &str,
    ) -> Result<Vec<RawHit>, ResolverError> {
        let Some(key) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };

        let url = format!("{}/search", BASE_URL);
        let payload = client.get_json(&url, &[("q", query), ("token", key)]).await?;

        let response: SearchResponse =
            serde_json::from_value(payload).map_err(|e| ResolverError::Parse {
                host: HOST.to_string(),
                message: format!("search response: {}", e),
            })?;

        let hits: Vec<RawHit> = response
            .result
            .into_iter()
            .filter(|item| !item.symbol.trim().is_empty())
            .map(|item| {
                let name = if !item.description.is_empty() {
                    item.description
                } else if !item.display_symbol.is_empty() {
                    item.display_symbol
                } else {
                    item.symbol.clone()
                };
                RawHit {
                    symbol: item.symbol.to_uppercase(),
                    name,
                    kind: AssetKind::from_provider_type(&item.security_type),
                }
            })
            .collect();

        debug!("Finnhub: {} hits for '{}'", hits.len(), query);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_without_key() {
        assert!(!FinnhubProvider::new(None).is_configured());
        assert!(!FinnhubProvider::new(Some("  ".to_string())).is_configured());
        assert!(FinnhubProvider::new(Some("k".to_string())).is_configured());
    }

    #[test]
    fn test_search_response_parsing() {
        let json = r#"{
            "count": 2,
            "result": [
                {
                    "description": "Apple Inc",
                    "displaySymbol": "AAPL",
                    "symbol": "AAPL",
                    "type": "Common Stock"
                },
                {
                    "description": "",
                    "displaySymbol": "APLE",
                    "symbol": "aple",
                    "type": "REIT"
                }
            ]
        }"#;

        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.result.len(), 2);
        assert_eq!(response.result[0].symbol, "AAPL");
        assert_eq!(response.result[0].security_type, "Common Stock");
        // Missing description falls back to the display symbol downstream
        assert!(response.result[1].description.is_empty());
    }

    #[test]
    fn test_empty_response_parses() {
        let response: SearchResponse = serde_json::from_str(r#"{"count": 0}"#).unwrap();
        assert!(response.result.is_empty());
    }
}
