//! Application state and user actions, independent of any window toolkit.
//!
//! The controller owns the loaded [`AppConfig`] and hands it to persistence
//! and rendering explicitly; nothing reads state from ambient globals.

use std::fmt;
use std::path::Path;

use launchdeck_core::{launch_all, paths, AppConfig, ConfigStore, LaunchReport, ProgramEntry, Theme};
use launchdeck_weather::{is_municipality, LocationDirectory, WeatherClient, WeatherError, WeatherSnapshot};
use thiserror::Error;

/// The region whose weather the panel shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherLocation {
    pub province: String,
    pub city: String,
    pub district: Option<String>,
}

impl Default for WeatherLocation {
    fn default() -> Self {
        Self {
            province: "广东省".to_string(),
            city: "深圳市".to_string(),
            district: Some("宝安区".to_string()),
        }
    }
}

impl fmt::Display for WeatherLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.province, self.city)?;
        if let Some(district) = &self.district {
            write!(f, " {}", district)?;
        }
        Ok(())
    }
}

/// Why a location selection was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Unknown province: {0}")]
    UnknownProvince(String),
    #[error("{city} is not a city of {province}")]
    UnknownCity { province: String, city: String },
    #[error("{district} is not a district of {city}")]
    UnknownDistrict { city: String, district: String },
    #[error("A city is required for {0}")]
    CityRequired(String),
}

/// Why a program could not be removed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RemoveError {
    #[error("No program at index {index} ({len} registered)")]
    OutOfRange { index: usize, len: usize },
    #[error("Failed to save configuration, {0} was kept")]
    NotSaved(String),
}

/// Which region dataset backs the location lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    /// `resources/city_data.json`, as written by `generate-dataset`
    Full,
    /// The partial sample shipped in the repository
    Sample,
    /// Nothing loaded; weather lookups all miss
    Missing,
}

/// What the weather panel should display after a refresh.
#[derive(Debug)]
pub enum WeatherStatus {
    Ready(WeatherSnapshot),
    MissingApiKey,
    UnknownLocation,
    Unavailable(WeatherError),
}

impl WeatherStatus {
    /// Inline text for the panel.
    pub fn message(&self) -> String {
        match self {
            WeatherStatus::Ready(snapshot) => snapshot.summary(),
            WeatherStatus::MissingApiKey => WeatherError::MissingApiKey.user_message().to_string(),
            WeatherStatus::UnknownLocation => "无法获取天气信息".to_string(),
            WeatherStatus::Unavailable(e) => e.user_message().to_string(),
        }
    }
}

pub struct LauncherController {
    config: AppConfig,
    store: ConfigStore,
    directory: LocationDirectory,
    dataset: DatasetKind,
    weather: WeatherClient,
    location: WeatherLocation,
}

impl LauncherController {
    /// Build a controller, loading the config from `store`.
    pub fn new(store: ConfigStore, directory: LocationDirectory, weather: WeatherClient) -> Self {
        let config = store.load();
        let dataset = if directory.is_empty() {
            DatasetKind::Missing
        } else {
            DatasetKind::Full
        };
        Self {
            config,
            store,
            directory,
            dataset,
            weather,
            location: WeatherLocation::default(),
        }
    }

    /// Controller over the install directory's config and region dataset.
    ///
    /// A generated full dataset wins over the bundled sample. With neither
    /// readable, weather lookups are empty but the launcher stays usable.
    ///
    /// # Errors
    /// Fails if the install directory or HTTP client cannot be set up.
    pub fn open_default() -> anyhow::Result<Self> {
        let store = ConfigStore::at_default_location()?;
        let (directory, dataset) =
            Self::load_directory(&paths::dataset_path()?, &paths::sample_dataset_path()?);
        let weather = WeatherClient::new()?;
        let mut controller = Self::new(store, directory, weather);
        controller.dataset = dataset;
        Ok(controller)
    }

    fn load_directory(full: &Path, sample: &Path) -> (LocationDirectory, DatasetKind) {
        if full.exists() {
            match LocationDirectory::load(full) {
                Ok(directory) => return (directory, DatasetKind::Full),
                Err(e) => tracing::warn!("Ignoring region dataset: {}", e),
            }
        }
        match LocationDirectory::load(sample) {
            Ok(directory) => {
                tracing::info!("Using the partial sample region dataset");
                (directory, DatasetKind::Sample)
            }
            Err(e) => {
                tracing::warn!("Weather locations unavailable: {}", e);
                (LocationDirectory::default(), DatasetKind::Missing)
            }
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn directory(&self) -> &LocationDirectory {
        &self.directory
    }

    pub fn dataset_kind(&self) -> DatasetKind {
        self.dataset
    }

    pub fn weather_client(&self) -> &WeatherClient {
        &self.weather
    }

    pub fn location(&self) -> &WeatherLocation {
        &self.location
    }

    /// Programs to display: entries whose executable exists, with their
    /// position in the stored list.
    pub fn programs(&self) -> Vec<(usize, &ProgramEntry)> {
        self.config.visible_programs().collect()
    }

    /// Append programs in the given order and persist. Duplicates are kept.
    pub fn add_programs<P: AsRef<Path>>(&mut self, paths: impl IntoIterator<Item = P>) -> bool {
        let before = self.config.programs.len();
        self.config
            .programs
            .extend(paths.into_iter().map(ProgramEntry::from_path));
        tracing::info!(
            "Registered {} program(s)",
            self.config.programs.len() - before
        );
        self.save()
    }

    /// Remove the entry at `index` in the stored list and persist.
    ///
    /// If the save fails the entry is put back, so memory matches disk.
    ///
    /// # Errors
    /// [`RemoveError::OutOfRange`] for a bad index, [`RemoveError::NotSaved`]
    /// when the config could not be written.
    pub fn remove_program(&mut self, index: usize) -> Result<ProgramEntry, RemoveError> {
        let len = self.config.programs.len();
        if index >= len {
            return Err(RemoveError::OutOfRange { index, len });
        }
        let removed = self.config.programs.remove(index);
        if !self.save() {
            let name = removed.name.clone();
            self.config.programs.insert(index, removed);
            return Err(RemoveError::NotSaved(name));
        }
        tracing::info!("Removed program {}", removed.name);
        Ok(removed)
    }

    /// Forget every registered program. Persisted on the next [`save`](Self::save).
    pub fn clear_programs(&mut self) {
        self.config.programs.clear();
    }

    /// Launch every displayed program; failures are reported per entry.
    pub fn launch_all(&self) -> LaunchReport {
        let report = launch_all(self.config.visible_programs().map(|(_, entry)| entry));
        tracing::info!(
            "Launched {} of {} program(s)",
            report.succeeded().count(),
            report.outcomes.len()
        );
        report
    }

    /// Switch theme and persist immediately.
    pub fn set_theme(&mut self, theme: Theme) -> bool {
        if self.config.theme == theme {
            return true;
        }
        self.config.theme = theme;
        self.save()
    }

    /// Show or hide the weather panel and persist immediately.
    pub fn set_weather_visible(&mut self, visible: bool) -> bool {
        self.config.weather_visible = visible;
        self.save()
    }

    /// Store the weather credential and persist immediately. Blank clears it.
    pub fn set_api_key(&mut self, key: Option<&str>) -> bool {
        self.config.weather_api_key = key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        self.save()
    }

    /// Write the whole config document.
    pub fn save(&self) -> bool {
        self.store.save(&self.config)
    }

    /// Change the weather location after checking it against the directory.
    ///
    /// For a municipality the city may be omitted; it is the province itself.
    ///
    /// # Errors
    /// Returns a [`SelectionError`] naming the first unknown segment.
    pub fn select_location(
        &mut self,
        province: &str,
        city: Option<&str>,
        district: Option<&str>,
    ) -> Result<(), SelectionError> {
        if self.directory.province(province).is_none() {
            return Err(SelectionError::UnknownProvince(province.to_string()));
        }

        let city = match city {
            Some(city) => city,
            None if is_municipality(province) => province,
            None => return Err(SelectionError::CityRequired(province.to_string())),
        };
        if self.directory.city(province, city).is_none() {
            return Err(SelectionError::UnknownCity {
                province: province.to_string(),
                city: city.to_string(),
            });
        }

        let district = district.filter(|d| !d.is_empty());
        if let Some(d) = district {
            if self.directory.resolve_area_code(province, city, Some(d)).is_none() {
                return Err(SelectionError::UnknownDistrict {
                    city: city.to_string(),
                    district: d.to_string(),
                });
            }
        }

        self.location = WeatherLocation {
            province: province.to_string(),
            city: city.to_string(),
            district: district.map(str::to_string),
        };
        tracing::info!("Weather location set to {}", self.location);
        Ok(())
    }

    /// District-level code for the selected location, falling back to the
    /// city-level code when the district is unset or unknown.
    pub fn resolve_selected_area_code(&self) -> Option<String> {
        let loc = &self.location;
        loc.district
            .as_deref()
            .and_then(|d| self.directory.resolve_area_code(&loc.province, &loc.city, Some(d)))
            .or_else(|| self.directory.resolve_area_code(&loc.province, &loc.city, None))
    }

    /// Fetch current conditions for the selected location.
    pub async fn refresh_weather(&self) -> WeatherStatus {
        let Some(api_key) = self.config.weather_api_key() else {
            return WeatherStatus::MissingApiKey;
        };
        let Some(area_code) = self.resolve_selected_area_code() else {
            tracing::debug!("No area code for {}", self.location);
            return WeatherStatus::UnknownLocation;
        };

        match self.weather.try_fetch_live_weather(&area_code, api_key).await {
            Ok(snapshot) => WeatherStatus::Ready(snapshot),
            Err(e) => {
                tracing::warn!("Weather refresh failed for {}: {}", self.location, e);
                WeatherStatus::Unavailable(e)
            }
        }
    }
}
