use crate::url_norm::normalize_url;
use crate::{ParseError, ParsedRecord, RawRecord, SourceIp};
use chrono::DateTime;
use tracing::debug;

pub const TIMESTAMP_FIELD: usize = 1;
pub const IP_FIELD: usize = 2;
pub const URL_FIELD: usize = 3;
pub const SIZE_FIELD: usize = 4;
pub const MIN_FIELDS: usize = 5;

/// Parse and validate one CSV row.
///
/// A bad timestamp or a short row fails the record. An invalid IP only
/// degrades `source_ip` to [`SourceIp::NotValid`], and the URL is always
/// normalized on a best-effort basis.
pub fn parse_record(raw: &RawRecord) -> Result<ParsedRecord, ParseError> {
    if raw.fields.len() < MIN_FIELDS {
        return Err(ParseError::MissingFields {
            index: raw.index,
            found: raw.fields.len(),
        });
    }

    let field = move |pos: usize| raw.field(pos).unwrap_or_default();

    let timestamp = parse_timestamp(raw.index, field(TIMESTAMP_FIELD))?;

    let source_ip = SourceIp::parse(field(IP_FIELD));
    if !source_ip.is_valid() {
        debug!("Row {}: source IP {:?} is not valid", raw.index, field(IP_FIELD));
    }

    Ok(ParsedRecord {
        timestamp,
        source_ip,
        url: normalize_url(field(URL_FIELD)),
        size: field(SIZE_FIELD).to_string(),
    })
}

/// RFC 3339 timestamp to Unix seconds.
///
/// Only the strict `YYYY-MM-DDThh:mm:ss[.frac](Z|±hh:mm)` form is accepted:
/// the date and time must be joined by `T` and nothing may surround them.
pub fn parse_timestamp(index: usize, value: &str) -> Result<i64, ParseError> {
    let invalid = |reason: String| ParseError::InvalidTimestamp {
        index,
        value: value.to_string(),
        reason,
    };

    if value.trim() != value || value.as_bytes().get(10) != Some(&b'T') {
        return Err(invalid("expected YYYY-MM-DDThh:mm:ss with an offset".to_string()));
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp())
        .map_err(|e| invalid(e.to_string()))
}
