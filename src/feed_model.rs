use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Gauge fill used when `conf` has no leading integer.
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// One prediction entry ("beacon") as produced by the external generator.
///
/// Fields are kept as display text. Numbers and booleans are stringified and
/// `null`/missing fields become empty strings; nothing else is normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PredictionRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub league: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub home: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub away: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fixture_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dc: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ou: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ht: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub stars: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub main: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub conf: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub h2h: Option<String>,
}

impl PredictionRecord {
    /// Card header identifier: the fixture id when present, else the date.
    pub fn identifier(&self) -> &str {
        if self.fixture_id.trim().is_empty() {
            &self.date
        } else {
            &self.fixture_id
        }
    }

    pub fn confidence(&self) -> u8 {
        conf_percent(&self.conf)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEnvelope {
    pub last_updated: Option<String>,
    pub predictions: Vec<PredictionRecord>,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    last_updated: Option<String>,
    #[serde(default)]
    predictions: Option<Vec<PredictionRecord>>,
}

/// Parses a feed body: either the `{ last_updated, predictions }` envelope or
/// the legacy bare array of records.
pub fn parse_feed(raw: &str) -> Result<FeedEnvelope> {
    let value: Value = serde_json::from_str(raw).context("feed is not valid json")?;
    match value {
        Value::Array(_) => {
            let predictions: Vec<PredictionRecord> =
                serde_json::from_value(value).context("invalid prediction list")?;
            Ok(FeedEnvelope {
                last_updated: None,
                predictions,
            })
        }
        Value::Object(_) => {
            let envelope: RawEnvelope =
                serde_json::from_value(value).context("invalid feed envelope")?;
            Ok(FeedEnvelope {
                last_updated: envelope.last_updated.filter(|s| !s.trim().is_empty()),
                predictions: envelope.predictions.unwrap_or_default(),
            })
        }
        other => Err(anyhow!("unexpected feed body: {}", value_kind(&other))),
    }
}

/// Integer percentage read like JS `parseInt`: optional sign, then leading
/// digits. Clamped to 0..=100; no leading digits yields [`DEFAULT_CONFIDENCE`].
pub fn conf_percent(raw: &str) -> u8 {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return DEFAULT_CONFIDENCE;
    }
    if negative {
        return 0;
    }
    // Digit runs too long for u64 are still "more than 100".
    digits
        .parse::<u64>()
        .map(|v| v.min(100) as u8)
        .unwrap_or(100)
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

fn lenient_opt_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        other => Ok(Some(value_to_text(&other))),
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
