//! Live weather from the AMap REST API.

use std::sync::Arc;

use reqwest::Client;
use tracing::instrument;
use url::Url;

use crate::types::{LiveWeatherResponse, WeatherError, WeatherSnapshot};

pub(crate) const AMAP_BASE_URL: &str = "https://restapi.amap.com";
pub(crate) const USER_AGENT: &str = concat!("Launchdeck/", env!("CARGO_PKG_VERSION"));
const WEATHER_PATH: &str = "/v3/weather/weatherInfo";

/// City-level code for Beijing, used to probe whether a key works.
pub const VERIFY_AREA_CODE: &str = "110100";

/// Fetches live conditions for an area code.
///
/// Every call is independent: no retry, no caching, and the HTTP client's
/// default timeout.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Arc<Client>,
    base_url: String,
}

impl WeatherClient {
    /// Client for the public AMap endpoint.
    ///
    /// # Errors
    /// Fails if the underlying HTTP client cannot be built (TLS backend).
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_base_url(AMAP_BASE_URL)
    }

    /// Client for an alternative host, e.g. a proxy or a mock server.
    ///
    /// # Errors
    /// Fails if the underlying HTTP client cannot be built (TLS backend).
    pub fn with_base_url(base_url: &str) -> Result<Self, WeatherError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Live conditions for `area_code`, or `None` on any failure.
    pub async fn fetch_live_weather(&self, area_code: &str, api_key: &str) -> Option<WeatherSnapshot> {
        match self.try_fetch_live_weather(area_code, api_key).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!("Failed to fetch weather for {}: {}", area_code, e);
                None
            }
        }
    }

    /// Live conditions for `area_code`, reporting why a fetch failed.
    ///
    /// # Errors
    /// - [`WeatherError::MissingApiKey`] for a blank key (no request is made)
    /// - [`WeatherError::InvalidApiKey`] / [`WeatherError::Api`] when the provider rejects the call
    /// - [`WeatherError::NoData`] when the live-conditions list is empty
    /// - [`WeatherError::Network`] for transport failures, non-2xx statuses and undecodable bodies
    #[instrument(skip(self, api_key), level = "debug")]
    pub async fn try_fetch_live_weather(
        &self,
        area_code: &str,
        api_key: &str,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(WeatherError::MissingApiKey);
        }

        let url = Url::parse_with_params(
            &format!("{}{}", self.base_url, WEATHER_PATH),
            &[("key", api_key), ("city", area_code), ("extensions", "base")],
        )?;

        let response = self.client.get(url).send().await?.error_for_status()?;
        let body: LiveWeatherResponse = response.json().await?;

        if let Some(err) = body.status.error() {
            return Err(err);
        }

        let live = body.lives.into_iter().next().ok_or(WeatherError::NoData)?;
        let snapshot = live.into_snapshot(area_code);
        tracing::debug!("Weather for {}: {}", area_code, snapshot.summary());
        Ok(snapshot)
    }

    /// Whether `api_key` can fetch weather for [`VERIFY_AREA_CODE`].
    ///
    /// A usability check only; it says nothing about the key's quotas or
    /// which other services it is enabled for.
    pub async fn verify_api_key(&self, api_key: &str) -> bool {
        self.fetch_live_weather(VERIFY_AREA_CODE, api_key).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = WeatherClient::with_base_url("http://127.0.0.1:9/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn test_blank_key_short_circuits() {
        // Port 9 (discard) is never contacted for a blank key.
        let client = WeatherClient::with_base_url("http://127.0.0.1:9").unwrap();
        let err = client
            .try_fetch_live_weather("440306", "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::MissingApiKey));
        assert!(!client.verify_api_key("").await);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_absent() {
        let client = WeatherClient::with_base_url("http://127.0.0.1:9").unwrap();
        assert!(client.fetch_live_weather("440306", "key").await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_absent() {
        let client = WeatherClient::with_base_url("not a url").unwrap();
        let err = client
            .try_fetch_live_weather("440306", "key")
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::Url(_)));
    }
}
