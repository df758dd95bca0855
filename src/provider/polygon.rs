//! Polygon reference-data adapter.
//!
//! Uses the `/v3/reference/tickers` endpoint with a free-text `search`
//! parameter. Polygon indexes far more than US listings, so hits are
//! filtered to US exchanges and (optionally) OTC venues before they reach
//! the scoring pipeline.

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use super::SearchProvider;
use crate::errors::ResolverError;
use crate::models::{AssetKind, RawHit};
use crate::transport::ResilientClient;

const BASE_URL: &str = "https://api.polygon.io";
const HOST: &str = "api.polygon.io";
const PROVIDER_ID: &str = "Polygon";

/// Results per search request.
const SEARCH_LIMIT: &str = "30";

const US_EXCHANGES: &[&str] = &[
    "XNAS", "XNYS", "ARCX", "BATS", "IEXG", "LTSE", "XASE", "XPHL", "EDGA", "EDGX",
];
const OTC_EXCHANGES: &[&str] = &["OTC", "OTCQX", "OTCQB", "PINX"];

/// Response from /v3/reference/tickers
#[derive(Debug, Deserialize)]
struct TickersResponse {
    #[serde(default)]
    results: Vec<TickerItem>,
}

/// Individual reference ticker entry
#[derive(Debug, Deserialize)]
struct TickerItem {
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    ticker_type: String,
    #[serde(default)]
    market: String,
    #[serde(default)]
    locale: String,
    #[serde(default)]
    primary_exchange: String,
    #[serde(default)]
    primary_exchange_mic: String,
}

/// Polygon free-text reference search with a US/OTC listing filter.
pub struct PolygonProvider {
    api_key: Option<String>,
    prefer_otc: bool,
}

impl PolygonProvider {
    pub fn new(api_key: Option<String>, prefer_otc: bool) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            prefer_otc,
        }
    }

    /// Keep only listings tradable on US venues (or OTC when preferred).
    fn is_us_listing(&self, item: &TickerItem) -> bool {
        let locale = item.locale.to_lowercase();
        if !locale.is_empty() && locale != "us" {
            return false;
        }

        let market = item.market.to_lowercase();
        let exchange = item.primary_exchange.to_uppercase();
        let mic = item.primary_exchange_mic.to_uppercase();

        if market == "stocks" {
            return true;
        }
        if self.prefer_otc
            && (market == "otc"
                || OTC_EXCHANGES.contains(&exchange.as_str())
                || OTC_EXCHANGES.contains(&mic.as_str()))
        {
            return true;
        }
        US_EXCHANGES.contains(&exchange.as_str()) || US_EXCHANGES.contains(&mic.as_str())
    }
}

#[async_trait]
impl SearchProvider for PolygonProvider {
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

        let url = format!("{}/v3/reference/tickers", BASE_URL);
        let params = [
            ("search", query),
            ("active", "true"),
            ("limit", SEARCH_LIMIT),
            ("apiKey", key),
        ];
        let payload = client.get_json(&url, &params).await?;

        let response: TickersResponse =
            serde_json::from_value(payload).map_err(|e| ResolverError::Parse {
                host: HOST.to_string(),
                message: format!("tickers response: {}", e),
            })?;

        let hits: Vec<RawHit> = response
            .results
            .into_iter()
            .filter(|item| self.is_us_listing(item) && !item.ticker.trim().is_empty())
            .map(|item| {
                let name = if item.name.is_empty() {
                    item.ticker.clone()
                } else {
                    item.name
                };
                RawHit {
                    symbol: item.ticker.to_uppercase(),
                    name,
                    kind: AssetKind::from_provider_type(&item.ticker_type),
                }
            })
            .collect();

        debug!("Polygon: {} US hits for '{}'", hits.len(), query);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(market: &str, locale: &str, exchange: &str) -> TickerItem {
        TickerItem {
            ticker: "TEST".to_string(),
            name: "Test Co".to_string(),
            ticker_type: "CS".to_string(),
            market: market.to_string(),
            locale: locale.to_string(),
            primary_exchange: exchange.to_string(),
            primary_exchange_mic: String::new(),
        }
    }

    #[test]
    fn test_us_stocks_pass_filter() {
        let p = PolygonProvider::new(Some("k".to_string()), true);
        assert!(p.is_us_listing(&item("stocks", "us", "XNAS")));
        assert!(p.is_us_listing(&item("", "us", "XNYS")));
    }

    #[test]
    fn test_foreign_locale_rejected() {
        let p = PolygonProvider::new(Some("k".to_string()), true);
        assert!(!p.is_us_listing(&item("stocks", "ca", "XTSE")));
    }

    #[test]
    fn test_otc_gated_by_preference() {
        let with_otc = PolygonProvider::new(Some("k".to_string()), true);
        let without_otc = PolygonProvider::new(Some("k".to_string()), false);
        let otc = item("otc", "us", "OTCQX");
        assert!(with_otc.is_us_listing(&otc));
        assert!(!without_otc.is_us_listing(&otc));
    }

    #[test]
    fn test_tickers_response_parsing() {
        let json = r#"{
            "status": "OK",
            "count": 1,
            "results": [
                {
                    "ticker": "AAPL",
                    "name": "Apple Inc.",
                    "market": "stocks",
                    "locale": "us",
                    "primary_exchange": "XNAS",
                    "type": "CS",
                    "active": true
                }
            ]
        }"#;
        let response: TickersResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].ticker, "AAPL");
        assert_eq!(response.results[0].market, "stocks");
    }

    #[test]
    fn test_missing_results_field_parses_empty() {
        let response: TickersResponse = serde_json::from_str(r#"{"status": "OK"}"#).unwrap();
        assert!(response.results.is_empty());
    }
}
