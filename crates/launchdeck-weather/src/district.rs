//! Offline generation of the bundled region dataset from the AMap
//! administrative-district API. Not used at runtime.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::location::{is_municipality, LocationDirectory, RegionNode};
use crate::provider::{AMAP_BASE_URL, USER_AGENT};
use crate::types::{lenient_string, ApiStatus, WeatherError};

const DISTRICT_PATH: &str = "/v3/config/district";

/// Root keyword covering the whole country.
pub const COUNTRY_KEYWORDS: &str = "中国";

/// One node of the provider's nested district tree.
#[derive(Debug, Clone, Deserialize)]
pub struct DistrictNode {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub adcode: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub level: String,
    #[serde(default)]
    pub districts: Vec<DistrictNode>,
}

#[derive(Debug, Deserialize)]
struct DistrictResponse {
    #[serde(flatten)]
    status: ApiStatus,
    #[serde(default)]
    districts: Vec<DistrictNode>,
}

#[derive(Debug, Clone)]
pub struct DistrictClient {
    client: Arc<Client>,
    base_url: String,
}

impl DistrictClient {
    /// # Errors
    /// Fails if the underlying HTTP client cannot be built.
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_base_url(AMAP_BASE_URL)
    }

    /// # Errors
    /// Fails if the underlying HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, WeatherError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch three levels of subdivisions below `keywords`.
    ///
    /// # Errors
    /// Same taxonomy as weather fetches; an empty result is
    /// [`WeatherError::NoData`].
    #[instrument(skip(self, api_key), level = "info")]
    pub async fn fetch_tree(
        &self,
        keywords: &str,
        api_key: &str,
    ) -> Result<Vec<DistrictNode>, WeatherError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(WeatherError::MissingApiKey);
        }

        let url = Url::parse_with_params(
            &format!("{}{}", self.base_url, DISTRICT_PATH),
            &[
                ("key", api_key),
                ("keywords", keywords),
                ("subdistrict", "3"),
                ("extensions", "base"),
            ],
        )?;

        let response = self.client.get(url).send().await?.error_for_status()?;
        let body: DistrictResponse = response.json().await?;

        if let Some(err) = body.status.error() {
            return Err(err);
        }
        if body.districts.is_empty() {
            return Err(WeatherError::NoData);
        }
        Ok(body.districts)
    }

    /// Fetch the country tree and write it to `output` in the bundled format.
    ///
    /// # Errors
    /// Fails on any fetch error, or if the file cannot be written.
    pub async fn generate_dataset(
        &self,
        keywords: &str,
        api_key: &str,
        output: &Path,
    ) -> Result<LocationDirectory> {
        tracing::info!("Fetching district tree for {}", keywords);
        let tree = self
            .fetch_tree(keywords, api_key)
            .await
            .context("Failed to fetch district data")?;

        let directory = build_directory(&tree);
        let json = directory
            .to_json_pretty()
            .context("Failed to serialize district data")?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(output, json)
            .with_context(|| format!("Failed to write {}", output.display()))?;

        tracing::info!(
            "Wrote {} provinces to {}",
            directory.len(),
            output.display()
        );
        Ok(directory)
    }
}

/// Convert the tree under the first (country) node into a directory.
///
/// Municipalities come back from the provider with one city-level child
/// named e.g. 北京城区; it is renamed after the province so the directory
/// keeps the "municipality contains itself" shape.
pub fn build_directory(tree: &[DistrictNode]) -> LocationDirectory {
    let Some(country) = tree.first() else {
        return LocationDirectory::default();
    };

    let provinces = country
        .districts
        .iter()
        .map(|province| {
            let mut cities: Vec<RegionNode> = province
                .districts
                .iter()
                .map(|city| {
                    let districts = city
                        .districts
                        .iter()
                        .map(|d| RegionNode::new(&d.name, &d.adcode))
                        .collect();
                    RegionNode::new(&city.name, &city.adcode).with_children(districts)
                })
                .collect();

            if is_municipality(&province.name) && cities.len() == 1 {
                cities[0].name = province.name.clone();
            }

            RegionNode::new(&province.name, &province.adcode).with_children(cities)
        })
        .collect();

    LocationDirectory::from_provinces(provinces)
}
