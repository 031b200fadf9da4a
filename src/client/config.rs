use crate::types::{
    DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY_MS,
    RealtimeError, Result, env_vars,
};
use std::time::Duration;
use url::Url;

/// Per-`connect()` configuration. The most recent value is reused by every
/// automatic reconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// `ws://` or `wss://` endpoint
    pub address: String,
    /// Base delay for the exponential reconnect backoff
    pub reconnect_delay: Duration,
    /// Automatic reconnect attempts per failure episode before settling in `Error`
    pub max_reconnect_attempts: u32,
    pub heartbeat_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL_MS),
        }
    }
}

impl ConnectionConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Rejects configurations that could never produce a working connection
    pub fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(RealtimeError::InvalidConfig("address is required".to_string()));
        }

        let url = Url::parse(&self.address)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(RealtimeError::InvalidConfig(format!(
                "unsupported scheme '{}', expected ws or wss",
                url.scheme()
            )));
        }

        if self.reconnect_delay.is_zero() {
            return Err(RealtimeError::InvalidConfig(
                "reconnect delay must be greater than zero".to_string(),
            ));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(RealtimeError::InvalidConfig(
                "heartbeat interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Loads configuration from `REALTIME_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = lookup(env_vars::URL).ok_or_else(|| {
            RealtimeError::InvalidConfig(format!("{} must be set", env_vars::URL))
        })?;

        let mut config = Self::new(address);
        if let Some(ms) = parse_var::<u64>(&lookup, env_vars::RECONNECT_DELAY_MS)? {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, env_vars::MAX_RECONNECT_ATTEMPTS)? {
            config.max_reconnect_attempts = attempts;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, env_vars::HEARTBEAT_INTERVAL_MS)? {
            config.heartbeat_interval = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim().parse::<T>().map(Some).map_err(|_| {
        RealtimeError::InvalidConfig(format!("{key} must be a non-negative integer, got '{raw}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::new("wss://realtime.example.org/socket");
        assert_eq!(config.reconnect_delay, Duration::from_millis(3000));
        assert_eq!(config.max_reconnect_attempts, 10);
        assert_eq!(config.heartbeat_interval, Duration::from_millis(30000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_addresses() {
        assert!(matches!(
            ConnectionConfig::default().validate(),
            Err(RealtimeError::InvalidConfig(_))
        ));
        assert!(matches!(
            ConnectionConfig::new("not a url").validate(),
            Err(RealtimeError::UrlParse(_))
        ));
        assert!(matches!(
            ConnectionConfig::new("https://example.org").validate(),
            Err(RealtimeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_durations() {
        let base = ConnectionConfig::new("ws://localhost:4000");
        assert!(base.clone().with_reconnect_delay(Duration::ZERO).validate().is_err());
        assert!(base.with_heartbeat_interval(Duration::ZERO).validate().is_err());
    }

    #[test]
    fn test_from_lookup_reads_overrides() {
        let config = ConnectionConfig::from_lookup(lookup_from(&[
            ("REALTIME_URL", "ws://localhost:4000/ws"),
            ("REALTIME_RECONNECT_DELAY_MS", "1000"),
            ("REALTIME_MAX_RECONNECT_ATTEMPTS", "3"),
            ("REALTIME_HEARTBEAT_INTERVAL_MS", " 15000 "),
        ]))
        .unwrap();

        assert_eq!(config.address, "ws://localhost:4000/ws");
        assert_eq!(config.reconnect_delay, Duration::from_millis(1000));
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.heartbeat_interval, Duration::from_millis(15000));
    }

    #[test]
    fn test_from_lookup_requires_url() {
        let err = ConnectionConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("REALTIME_URL"));
    }

    #[test]
    fn test_from_lookup_rejects_non_numeric() {
        let err = ConnectionConfig::from_lookup(lookup_from(&[
            ("REALTIME_URL", "ws://localhost:4000/ws"),
            ("REALTIME_MAX_RECONNECT_ATTEMPTS", "lots"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("REALTIME_MAX_RECONNECT_ATTEMPTS"));
    }
}
