use std::time::Duration;

pub const DEFAULT_REFRESH_MS: u32 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// Choices offered by the refresh-rate selector, in milliseconds. 0 turns
/// automatic polling off.
pub const REFRESH_RATES: &[(u32, &str)] = &[
    (0, "off"),
    (100, "100ms"),
    (500, "500ms"),
    (1000, "1sec"),
    (2000, "2sec"),
    (5000, "5sec"),
    (30000, "30sec"),
    (60000, "1min"),
    (300000, "5min"),
    (1800000, "30min"),
    (3600000, "1h"),
];

/// What to do with a batched read that lands after a newer cycle's read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Apply every response as it arrives; the last one to arrive wins.
    #[default]
    LastArrivalWins,
    /// Drop reads from cycles older than the newest applied one.
    DiscardSuperseded,
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base the endpoints are resolved against. Empty means same origin.
    pub base_url: String,
    pub refresh_ms: u32,
    pub overlap: OverlapPolicy,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            refresh_ms: DEFAULT_REFRESH_MS,
            overlap: OverlapPolicy::default(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_refresh_ms(mut self, refresh_ms: u32) -> Self {
        self.refresh_ms = refresh_ms;
        self
    }

    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }
}

/// Parses a refresh rate from user input. Garbage falls back to the default.
pub fn parse_refresh_ms(value: &str) -> u32 {
    value.trim().parse::<u32>().unwrap_or(DEFAULT_REFRESH_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_rates_parse_with_fallback() {
        assert_eq!(parse_refresh_ms("500"), 500);
        assert_eq!(parse_refresh_ms(" 0 "), 0);
        assert_eq!(parse_refresh_ms("fast"), DEFAULT_REFRESH_MS);
    }

    #[test]
    fn default_refresh_is_offered() {
        assert!(REFRESH_RATES.iter().any(|(ms, _)| *ms == DEFAULT_REFRESH_MS));
    }
}
