use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Placeholder written in place of a source IP that failed validation.
pub const IP_NOT_VALID: &str = "IP Not Valid";

/// One CSV row as read from the input, before any validation.
///
/// `index` is 1-based: the first row of the file is index 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub index: usize,
    pub fields: Vec<String>,
}

impl RawRecord {
    pub fn new(index: usize, fields: Vec<String>) -> Self {
        Self { index, fields }
    }

    pub fn field(&self, pos: usize) -> Option<&str> {
        self.fields.get(pos).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedUrl {
    #[serde(rename = "Scheme")]
    pub scheme: String,
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Opaque")]
    pub opaque: String,
}

/// Source IP column after validation. A valid IP keeps the text exactly as
/// it appeared in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceIp {
    Valid(String),
    NotValid,
}

impl SourceIp {
    /// No trimming: surrounding whitespace makes the literal invalid.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<IpAddr>() {
            Ok(_) => SourceIp::Valid(raw.to_string()),
            Err(_) => SourceIp::NotValid,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, SourceIp::Valid(_))
    }
}

impl fmt::Display for SourceIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceIp::Valid(text) => f.write_str(text),
            SourceIp::NotValid => f.write_str(IP_NOT_VALID),
        }
    }
}

/// Validated fields of one row, ready for enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub timestamp: i64,
    pub source_ip: SourceIp,
    pub url: NormalizedUrl,
    pub size: String,
}

impl ParsedRecord {
    pub fn with_note(self, note: String) -> OutputRecord {
        OutputRecord {
            ts: self.timestamp,
            source_ip: self.source_ip.to_string(),
            url: self.url,
            size: self.size,
            note,
        }
    }
}

/// One line of the NDJSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub ts: i64,
    pub source_ip: String,
    pub url: NormalizedUrl,
    pub size: String,
    pub note: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Row {index}: expected at least 5 fields, found {found}")]
    MissingFields { index: usize, found: usize },
    #[error("Row {index}: invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        index: usize,
        value: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ip_keeps_input_text() {
        for raw in ["0:0:0:0:0:0:0:1", "2001:DB8::1", "10.0.0.5"] {
            let ip = SourceIp::parse(raw);
            assert!(ip.is_valid(), "{} should be valid", raw);
            assert_eq!(ip.to_string(), raw);
        }
    }

    #[test]
    fn test_ip_with_surrounding_whitespace_is_not_valid() {
        assert_eq!(SourceIp::parse(" 10.0.0.5 "), SourceIp::NotValid);
        assert_eq!(SourceIp::parse(" 10.0.0.5 ").to_string(), IP_NOT_VALID);
    }
}
