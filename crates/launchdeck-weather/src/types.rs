use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Live conditions for one area code, as reported by the provider.
///
/// Values are kept as the provider's strings; wind power in particular is
/// often a range such as `≤3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub area_code: String,
    pub province: Option<String>,
    pub city: Option<String>,
    /// Degrees Celsius
    pub temperature: String,
    pub wind_direction: String,
    /// Beaufort level
    pub wind_power: String,
    /// Relative humidity, percent
    pub humidity: String,
    /// Textual condition, e.g. 晴 or 多云
    pub condition: String,
    pub report_time: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// One-line text for the weather panel.
    pub fn summary(&self) -> String {
        format!(
            "{}°C  {}风{}级  湿度{}%  {}",
            self.temperature, self.wind_direction, self.wind_power, self.humidity, self.condition
        )
    }
}

/// Envelope shared by every AMap REST response.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiStatus {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub info: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub infocode: String,
}

impl ApiStatus {
    pub(crate) const SUCCESS: &'static str = "1";
    const INVALID_KEY_CODE: &'static str = "10001";
    const INVALID_KEY_INFO: &'static str = "INVALID_USER_KEY";

    /// Map a non-success envelope to an error, or `None` on success.
    pub(crate) fn error(&self) -> Option<WeatherError> {
        if self.status == Self::SUCCESS {
            return None;
        }
        if self.infocode == Self::INVALID_KEY_CODE || self.info == Self::INVALID_KEY_INFO {
            return Some(WeatherError::InvalidApiKey);
        }
        Some(WeatherError::Api(if self.info.is_empty() {
            format!("status {}", self.status)
        } else {
            self.info.clone()
        }))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LiveWeatherResponse {
    #[serde(flatten)]
    pub status: ApiStatus,
    #[serde(default)]
    pub lives: Vec<LiveRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LiveRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub province: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub adcode: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub weather: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub temperature: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub winddirection: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub windpower: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub humidity: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reporttime: String,
}

impl LiveRecord {
    pub(crate) fn into_snapshot(self, requested_area_code: &str) -> WeatherSnapshot {
        let non_empty = |s: String| Some(s).filter(|s| !s.is_empty());
        WeatherSnapshot {
            area_code: non_empty(self.adcode).unwrap_or_else(|| requested_area_code.to_string()),
            province: non_empty(self.province),
            city: non_empty(self.city),
            temperature: self.temperature,
            wind_direction: self.winddirection,
            wind_power: self.windpower,
            humidity: self.humidity,
            condition: self.weather,
            report_time: non_empty(self.reporttime),
            fetched_at: Utc::now(),
        }
    }
}

/// AMap sends `[]` instead of a string for fields it has no value for, and
/// occasionally numbers. Both become strings here.
pub(crate) fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("No API key configured")]
    MissingApiKey,
    #[error("API key rejected by provider")]
    InvalidApiKey,
    #[error("Provider error: {0}")]
    Api(String),
    #[error("Provider returned no live conditions")]
    NoData,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "请先设置 API Key",
            Self::InvalidApiKey => "API Key 无效，请重新设置",
            Self::Api(_) | Self::NoData => "无法获取天气信息",
            Self::Network(_) => "网络错误，请检查网络连接",
            Self::Url(_) => "天气服务地址无效",
        }
    }
}

/// Errors loading the bundled region dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed dataset: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            area_code: "440306".into(),
            province: Some("广东".into()),
            city: Some("宝安区".into()),
            temperature: "28".into(),
            wind_direction: "东南".into(),
            wind_power: "≤3".into(),
            humidity: "76".into(),
            condition: "多云".into(),
            report_time: Some("2024-06-01 10:00:00".into()),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_format() {
        assert_eq!(snapshot().summary(), "28°C  东南风≤3级  湿度76%  多云");
    }

    #[test]
    fn test_status_success() {
        let status: ApiStatus =
            serde_json::from_str(r#"{"status":"1","info":"OK","infocode":"10000"}"#).unwrap();
        assert!(status.error().is_none());
    }

    #[test]
    fn test_status_invalid_key() {
        let status: ApiStatus = serde_json::from_str(
            r#"{"status":"0","info":"INVALID_USER_KEY","infocode":"10001"}"#,
        )
        .unwrap();
        assert!(matches!(status.error(), Some(WeatherError::InvalidApiKey)));
    }

    #[test]
    fn test_status_other_failure_keeps_info() {
        let status: ApiStatus = serde_json::from_str(
            r#"{"status":"0","info":"DAILY_QUERY_OVER_LIMIT","infocode":"10003"}"#,
        )
        .unwrap();
        match status.error() {
            Some(WeatherError::Api(info)) => assert_eq!(info, "DAILY_QUERY_OVER_LIMIT"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_live_record_tolerates_empty_arrays() {
        let record: LiveRecord = serde_json::from_str(
            r#"{"province":"北京","city":[],"adcode":"110100","weather":"晴",
                "temperature":31,"winddirection":"南","windpower":"≤3","humidity":"40"}"#,
        )
        .unwrap();
        let snap = record.into_snapshot("110100");
        assert_eq!(snap.city, None);
        assert_eq!(snap.temperature, "31");
        assert_eq!(snap.report_time, None);
    }

    #[test]
    fn test_snapshot_falls_back_to_requested_code() {
        let record: LiveRecord = serde_json::from_str(r#"{"weather":"雨"}"#).unwrap();
        assert_eq!(record.into_snapshot("440300").area_code, "440300");
    }
}
