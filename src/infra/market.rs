//! HTTP clients for the two market data sources.
//!
//! - Price aggregates come from the Fuzzwork market API, batched.
//! - Daily traded volumes come from ESI region history, one id at a time.
//! - Every request gets a bounded timeout and one retry; whatever still
//!   fails degrades to a sentinel instead of aborting the run.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{TypeId, UNKNOWN_VOLUME};

const FUZZWORK_BASE_URL: &str = "https://market.fuzzwork.co.uk/";
const ESI_BASE_URL: &str = "https://esi.evetech.net/";
const USER_AGENT: &str = "industry-profit-scanner/1.0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const RETRY_BACKOFF: Duration = Duration::from_secs(2);
/// Pause between consecutive requests to stay under remote rate limits.
const REQUEST_DELAY: Duration = Duration::from_millis(200);
/// Ids per aggregates request; larger batches trip the endpoint.
const PRICE_CHUNK_SIZE: usize = 200;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct MarketClient {
    http: Client,
    fuzzwork_base: Url,
    esi_base: Url,
    region_id: TypeId,
}

impl MarketClient {
    pub fn new(region_id: TypeId) -> Result<Self, MarketError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            fuzzwork_base: Url::parse(FUZZWORK_BASE_URL)?,
            esi_base: Url::parse(ESI_BASE_URL)?,
            region_id,
        })
    }

    /// Minimum sell price for every id, in chunks. Ids the endpoint cannot
    /// price (including whole chunks that fail even after the retry) come
    /// back as 0.0 so the analysis can continue.
    pub async fn preload_prices(
        &self,
        ids: &[TypeId],
    ) -> Result<HashMap<TypeId, f64>, MarketError> {
        info!(
            "loading prices for {} types in chunks of {PRICE_CHUNK_SIZE}",
            ids.len()
        );

        let mut prices = HashMap::with_capacity(ids.len());
        for (index, chunk) in ids.chunks(PRICE_CHUNK_SIZE).enumerate() {
            match self.fetch_price_chunk(chunk).await {
                Ok(aggregates) => {
                    for &id in chunk {
                        prices.insert(id, min_sell(&aggregates, id));
                    }
                }
                Err(error) => {
                    warn!("price chunk {index} failed after retry: {error}; its prices fall back to 0");
                    for &id in chunk {
                        prices.insert(id, 0.0);
                    }
                }
            }
            tokio::time::sleep(REQUEST_DELAY).await;
        }

        info!("price load complete ({} types)", prices.len());
        Ok(prices)
    }

    async fn fetch_price_chunk(
        &self,
        chunk: &[TypeId],
    ) -> Result<serde_json::Value, MarketError> {
        let ids: Vec<String> = chunk.iter().map(ToString::to_string).collect();
        let mut url = self.fuzzwork_base.join("aggregates/")?;
        url.query_pairs_mut()
            .append_pair("region", &self.region_id.to_string())
            .append_pair("types", &ids.join(","));

        self.get_with_retry(url).await
    }

    /// Mean daily traded volume over the lookback window, one history call
    /// per id. Failed fetches report [`UNKNOWN_VOLUME`] so the item is not
    /// silently filtered out later.
    pub async fn fetch_volumes(
        &self,
        ids: &[TypeId],
        window_days: u32,
    ) -> Result<HashMap<TypeId, f64>, MarketError> {
        info!(
            "generating {window_days}-day volume averages for {} types (one request each, slow)",
            ids.len()
        );

        let mut volumes = HashMap::with_capacity(ids.len());
        for (index, &id) in ids.iter().enumerate() {
            if index % 50 == 0 && index > 0 {
                info!("  {index}/{} histories fetched", ids.len());
            }

            let volume = match self.fetch_history(id).await {
                Ok(history) => mean_volume(&history, window_days),
                Err(error) => {
                    warn!("history fetch for type {id} failed: {error}; volume treated as unknown");
                    UNKNOWN_VOLUME
                }
            };
            volumes.insert(id, volume);
            tokio::time::sleep(REQUEST_DELAY).await;
        }

        Ok(volumes)
    }

    async fn fetch_history(&self, id: TypeId) -> Result<Vec<HistoryDay>, MarketError> {
        let mut url = self
            .esi_base
            .join(&format!("latest/markets/{}/history/", self.region_id))?;
        url.query_pairs_mut()
            .append_pair("datasource", "tranquility")
            .append_pair("type_id", &id.to_string());

        self.get_with_retry(url).await
    }

    async fn get_with_retry<T>(&self, url: Url) -> Result<T, MarketError>
    where
        T: DeserializeOwned,
    {
        match self.get_json(url.clone()).await {
            Ok(value) => Ok(value),
            Err(error) => {
                debug!("request to {url} failed ({error}), retrying once");
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.get_json(url).await
            }
        }
    }

    async fn get_json<T>(&self, url: Url) -> Result<T, MarketError>
    where
        T: DeserializeOwned,
    {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

/// One day of region market history. Only the traded volume matters here.
#[derive(Debug, Deserialize)]
struct HistoryDay {
    #[serde(default)]
    volume: f64,
}

fn mean_volume(history: &[HistoryDay], window_days: u32) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let start = history.len().saturating_sub(window_days as usize);
    let window = &history[start..];
    window.iter().map(|day| day.volume).sum::<f64>() / window.len() as f64
}

/// Digs `{id}.sell.min` out of an aggregates payload. The endpoint mixes
/// numeric and quoted-string numbers, so both are accepted.
fn min_sell(aggregates: &serde_json::Value, id: TypeId) -> f64 {
    aggregates
        .get(id.to_string())
        .and_then(|entry| entry.get("sell"))
        .and_then(|sell| sell.get("min"))
        .and_then(number_or_string)
        .unwrap_or(0.0)
}

fn number_or_string(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.parse().ok(),
        _ => None,
    }
}
