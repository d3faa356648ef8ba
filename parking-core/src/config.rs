use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What happens when a history entry cannot be written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    /// Commit first, log afterwards, warn on failure.
    #[default]
    BestEffort,
    /// Log before committing; a rejected log aborts the operation.
    Required,
}

impl HistoryPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best_effort" | "best-effort" => Some(HistoryPolicy::BestEffort),
            "required" => Some(HistoryPolicy::Required),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParkingConfig {
    /// Backend origin, without a trailing slash.
    pub api_base: String,
    pub history_policy: HistoryPolicy,
    pub request_timeout_ms: u32,
    /// Extra attempts after a network failure before going offline.
    pub retry_budget: u32,
    /// Plate reported when detection has to run without a backend.
    pub mock_plate: String,
    pub max_upload_bytes: usize,
    pub start_offline: bool,
}

impl Default for ParkingConfig {
    fn default() -> Self {
        ParkingConfig {
            api_base: "http://localhost:8000".to_string(),
            history_policy: HistoryPolicy::BestEffort,
            request_timeout_ms: 10_000,
            retry_budget: 0,
            mock_plate: "ABC123".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            start_offline: false,
        }
    }
}

impl ParkingConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let mut cfg: ParkingConfig = serde_json::from_str(text)?;
        cfg.api_base = cfg.api_base.trim().trim_end_matches('/').to_string();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base.trim().is_empty() {
            return Err(ConfigError::Invalid("api_base must not be empty"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be positive"));
        }
        if self.mock_plate.trim().is_empty() {
            return Err(ConfigError::Invalid("mock_plate must not be empty"));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max_upload_bytes must be positive"));
        }
        Ok(())
    }

    /// Absolute URL for a backend path such as `/history`.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        assert_eq!(ParkingConfig::from_json("{}").unwrap(), ParkingConfig::default());
    }

    #[test]
    fn partial_json_overrides() {
        let cfg = ParkingConfig::from_json(
            r#"{"api_base":"https://lot.example/api/","history_policy":"required","retry_budget":2}"#,
        )
        .unwrap();
        assert_eq!(cfg.api_base, "https://lot.example/api");
        assert_eq!(cfg.history_policy, HistoryPolicy::Required);
        assert_eq!(cfg.retry_budget, 2);
        assert_eq!(cfg.request_timeout_ms, 10_000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            ParkingConfig::from_json(r#"{"request_timeout_ms":0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ParkingConfig::from_json(r#"{"api_base":"  "}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ParkingConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn endpoint_urls() {
        let cfg = ParkingConfig::default();
        assert_eq!(cfg.endpoint_url("/predict/base64/"), "http://localhost:8000/predict/base64/");
        assert_eq!(cfg.endpoint_url("history"), "http://localhost:8000/history");
    }

    #[test]
    fn policy_names() {
        assert_eq!(HistoryPolicy::parse("Required"), Some(HistoryPolicy::Required));
        assert_eq!(HistoryPolicy::parse("best-effort"), Some(HistoryPolicy::BestEffort));
        assert_eq!(HistoryPolicy::parse("sometimes"), None);
        assert_eq!(HistoryPolicy::parse("require"), None);
        assert_eq!(HistoryPolicy::parse("must"), None);
        assert_eq!(HistoryPolicy::parse("besteffort"), None);
    }
}
