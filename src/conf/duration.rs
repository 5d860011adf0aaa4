use std::time::Duration;

use humantime_serde::re::humantime;

use crate::core::ScanError;

/// Parses either a humantime duration (`30d`, `12h 30m`) or an ISO-8601-like
/// one (`P30D`, `PT12H`, `P1DT6H`). Calendar units (years, months) are
/// rejected because their length depends on the anchor date.
pub fn parse_duration(raw: &str) -> Result<Duration, ScanError> {
    let trimmed = raw.trim();
    if trimmed.starts_with(['P', 'p']) {
        return parse_iso_duration(trimmed);
    }
    humantime::parse_duration(trimmed)
        .map_err(|e| ScanError::ConfigParsingError(format!("duration '{}': {}", raw, e)))
}

fn parse_iso_duration(raw: &str) -> Result<Duration, ScanError> {
    let invalid = |why: &str| ScanError::ConfigParsingError(format!("duration '{}': {}", raw, why));

    let mut total: u64 = 0;
    let mut digits = String::new();
    let mut in_time = false;
    let mut seen_unit = false;

    for c in raw[1..].chars() {
        let c = c.to_ascii_uppercase();
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if c == 'T' {
            if in_time || !digits.is_empty() {
                return Err(invalid("misplaced 'T'"));
            }
            in_time = true;
            continue;
        }
        let secs_per_unit = match (in_time, c) {
            (false, 'W') => 7 * 86_400,
            (false, 'D') => 86_400,
            (true, 'H') => 3_600,
            (true, 'M') => 60,
            (true, 'S') => 1,
            (false, 'Y') | (false, 'M') => return Err(invalid("calendar units are not supported")),
            _ => return Err(invalid("unexpected unit")),
        };
        let value: u64 = digits.parse().map_err(|_| invalid("missing amount"))?;
        digits.clear();
        total = value
            .checked_mul(secs_per_unit)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| invalid("overflow"))?;
        seen_unit = true;
    }

    if !digits.is_empty() || !seen_unit {
        return Err(invalid("missing unit"));
    }
    Ok(Duration::from_secs(total))
}

/// Serde adapter for optional durations in either supported notation.
pub mod option {
    use std::time::Duration;

    use humantime_serde::re::humantime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => super::parse_duration(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
