use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FEED: &str = "predictions.json";
pub const DEFAULT_POLL_SECS: u64 = 300;
const MIN_POLL_SECS: u64 = 5;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Url(String),
    File(PathBuf),
}

impl FeedSource {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            FeedSource::Url(raw.to_string())
        } else {
            FeedSource::File(PathBuf::from(raw))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FeedSource::Url(url) => url.clone(),
            FeedSource::File(path) => path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub source: FeedSource,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub log_file: Option<PathBuf>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            source: FeedSource::File(PathBuf::from(DEFAULT_FEED)),
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            log_file: None,
        }
    }
}

impl BoardConfig {
    /// Reads `BEACON_*` variables. Call after the dotenv files are loaded.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let source = lookup("BEACON_FEED")
            .filter(|val| !val.trim().is_empty())
            .map(|val| FeedSource::parse(&val))
            .unwrap_or_else(|| FeedSource::File(PathBuf::from(DEFAULT_FEED)));
        let poll_secs = lookup("BEACON_POLL_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_SECS)
            .max(MIN_POLL_SECS);
        let timeout_secs = lookup("BEACON_HTTP_TIMEOUT_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
            .clamp(1, 120);
        let log_file = lookup("BEACON_LOG_FILE")
            .filter(|val| !val.trim().is_empty())
            .map(PathBuf::from);

        Self {
            source,
            poll_interval: Duration::from_secs(poll_secs),
            http_timeout: Duration::from_secs(timeout_secs),
            log_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = BoardConfig::from_lookup(|_| None);
        assert_eq!(cfg.source, FeedSource::File(PathBuf::from("predictions.json")));
        assert_eq!(cfg.poll_interval, Duration::from_secs(300));
        assert_eq!(cfg.http_timeout, Duration::from_secs(10));
        assert!(cfg.log_file.is_none());
    }

    #[test]
    fn url_sources_are_detected() {
        let cfg = BoardConfig::from_lookup(lookup_from(&[(
            "BEACON_FEED",
            "HTTPS://example.org/predictions.json",
        )]));
        assert_eq!(
            cfg.source,
            FeedSource::Url("HTTPS://example.org/predictions.json".to_string())
        );
    }

    #[test]
    fn poll_interval_has_floor_and_bad_values_fall_back() {
        let cfg = BoardConfig::from_lookup(lookup_from(&[("BEACON_POLL_SECS", "1")]));
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        let cfg = BoardConfig::from_lookup(lookup_from(&[
            ("BEACON_POLL_SECS", "soon"),
            ("BEACON_HTTP_TIMEOUT_SECS", "900"),
        ]));
        assert_eq!(cfg.poll_interval, Duration::from_secs(300));
        assert_eq!(cfg.http_timeout, Duration::from_secs(120));
    }
}
