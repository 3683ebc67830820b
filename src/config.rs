use crate::errors::ConfigError;
use std::{env, time::Duration};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TREND_WEEKS: u32 = 13;
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub trend_weeks: u32,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let api_base_url = lookup("KPI_API_BASE_URL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let api_token = lookup("KPI_API_TOKEN").filter(|value| !value.trim().is_empty());

        let trend_weeks = match lookup("KPI_TREND_WEEKS") {
            Some(value) => parse_ranged("KPI_TREND_WEEKS", &value, 1, 52)? as u32,
            None => DEFAULT_TREND_WEEKS,
        };

        let timeout_secs = match lookup("KPI_HTTP_TIMEOUT_SECS") {
            Some(value) => parse_ranged("KPI_HTTP_TIMEOUT_SECS", &value, 1, 600)?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            port,
            api_base_url,
            api_token,
            trend_weeks,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_ranged(key: &'static str, value: &str, min: u64, max: u64) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|parsed| (min..=max).contains(parsed))
        .ok_or_else(|| ConfigError::OutOfRange {
            key,
            value: value.to_string(),
            min,
            max,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.api_base_url, "http://127.0.0.1:8000");
        assert_eq!(config.api_token, None);
        assert_eq!(config.trend_weeks, 13);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn invalid_port_falls_back_to_default() {
        let config = Config::from_lookup(lookup(&[("PORT", "not-a-port")])).unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn blank_token_is_ignored() {
        let config = Config::from_lookup(lookup(&[("KPI_API_TOKEN", "  ")])).unwrap();
        assert_eq!(config.api_token, None);
    }

    #[test]
    fn trend_weeks_out_of_range_is_rejected() {
        let err = Config::from_lookup(lookup(&[("KPI_TREND_WEEKS", "60")])).unwrap_err();
        assert!(err.to_string().contains("KPI_TREND_WEEKS"));
    }
}
