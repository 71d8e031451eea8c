use std::time::Duration;

use crate::shared::Distance;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Startup configuration handed to the gateway, pollers and tracker.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    /// Applied to every backend request.
    pub request_timeout: Duration,
    pub live_buses_interval: Duration,
    pub predictions_interval: Duration,
    pub location: LocationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            request_timeout: Duration::from_secs(10),
            live_buses_interval: Duration::from_secs(10),
            predictions_interval: Duration::from_secs(30),
            location: LocationConfig::default(),
        }
    }
}

impl Config {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Update thresholds for the continuous location subscription.
#[derive(Debug, Clone, Copy)]
pub struct LocationConfig {
    pub min_interval: Duration,
    pub min_distance: Distance,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(5),
            min_distance: Distance::from_meters(10.0),
        }
    }
}
