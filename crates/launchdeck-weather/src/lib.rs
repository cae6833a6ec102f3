//! Weather support for Launchdeck
//!
//! Resolves administrative regions to provider area codes from a bundled
//! dataset and fetches live conditions from the AMap weather API.

pub mod dispatch;
pub mod district;
pub mod location;
pub mod provider;
pub mod types;

pub use dispatch::{WeatherDispatcher, WeatherUpdate};
pub use district::{build_directory, DistrictClient, DistrictNode, COUNTRY_KEYWORDS};
pub use location::{is_municipality, LocationDirectory, RegionNode, MUNICIPALITIES};
pub use provider::{WeatherClient, VERIFY_AREA_CODE};
pub use types::*;
