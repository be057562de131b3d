//! Load-time type recovery for JSON config files
//!
//! Strings are classified in a fixed order and the first match wins:
//! integer, float, `true`/`false`, `null`, datetime, date, time, UUID.
//! Anything else stays a string. The order matters: `"2024"` must become an
//! integer before any date pattern gets a chance to look at it.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use ordered_float::OrderedFloat;
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use super::value::{ConfigKey, ConfigMap, ConfigValue};
use crate::error::ConversionError;

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?(0|[1-9][0-9]*)$").unwrap());
static FLOAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?(0|[1-9][0-9]*)\.[0-9]+$").unwrap());
static DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4}-\d{2}-\d{2})[T ](\d{2}:\d{2}(?::\d{2}(?:\.\d{1,9})?)?)(Z|[+-]\d{2}:?\d{2})?$",
    )
    .unwrap()
});
static DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());
static TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2}):(\d{2})(?::(\d{2})(?:\.(\d{1,9}))?)?$").unwrap());
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

/// Classify a single string
pub fn coerce_str(s: &str) -> ConfigValue {
    if INTEGER.is_match(s) {
        // Out of range literals fall through and end up as strings
        if let Ok(i) = s.parse::<i64>() {
            return ConfigValue::Integer(i);
        }
    }
    if FLOAT.is_match(s) {
        if let Ok(f) = s.parse::<f64>() {
            if f.is_finite() {
                return ConfigValue::Float(f);
            }
        }
    }
    match s {
        "true" => return ConfigValue::Bool(true),
        "false" => return ConfigValue::Bool(false),
        "null" => return ConfigValue::Null,
        _ => {}
    }
    if let Some(value) = parse_datetime(s) {
        return value;
    }
    if let Some(date) = parse_date(s) {
        return ConfigValue::Date(date);
    }
    if let Some(time) = parse_time(s) {
        return ConfigValue::Time(time);
    }
    if UUID.is_match(s) {
        if let Ok(uuid) = Uuid::parse_str(s) {
            return ConfigValue::Uuid(uuid);
        }
    }
    ConfigValue::String(s.to_string())
}

/// Classify a JSON object key
pub fn coerce_key(s: &str) -> ConfigKey {
    match coerce_str(s) {
        ConfigValue::Null => ConfigKey::Null,
        ConfigValue::Bool(b) => ConfigKey::Bool(b),
        ConfigValue::Integer(i) => ConfigKey::Integer(i),
        ConfigValue::Float(f) => ConfigKey::Float(OrderedFloat(f)),
        ConfigValue::DateTime(dt) => ConfigKey::DateTime(dt),
        ConfigValue::Timestamp(ts) => ConfigKey::Timestamp(ts),
        ConfigValue::Date(d) => ConfigKey::Date(d),
        ConfigValue::Time(t) => ConfigKey::Time(t),
        ConfigValue::Uuid(u) => ConfigKey::Uuid(u),
        _ => ConfigKey::String(s.to_string()),
    }
}

/// Recursively coerce a decoded JSON value
///
/// Strings are classified, native numbers, booleans and null pass through,
/// lists and mappings are rebuilt with every element coerced.
pub fn coerce_value(value: Value) -> Result<ConfigValue, ConversionError> {
    Ok(match value {
        Value::String(s) => coerce_str(&s),
        Value::Array(items) => ConfigValue::List(
            items
                .into_iter()
                .map(coerce_value)
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(object) => ConfigValue::Map(coerce_object(object)?),
        scalar => ConfigValue::from_json(scalar)?,
    })
}

/// Coerce every key and value of a JSON object
pub fn coerce_object(object: serde_json::Map<String, Value>) -> Result<ConfigMap, ConversionError> {
    let mut map = ConfigMap::new();
    for (raw, value) in object {
        let key = coerce_key(&raw);
        if map.contains_key(&key) {
            return Err(ConversionError::new(
                "key",
                format!("'{raw}' loads as the same key as an earlier entry ('{}')", key.to_wire()),
            ));
        }
        map.insert(key, coerce_value(value)?);
    }
    Ok(map)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let caps = DATE.captures(s)?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let caps = TIME.captures(s)?;
    let hour = caps[1].parse().ok()?;
    let minute = caps[2].parse().ok()?;
    let second = caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;
    let nano = caps.get(4).map_or(Some(0), |m| {
        // Right-pad the fraction to nanoseconds
        format!("{:0<9}", m.as_str()).parse().ok()
    })?;
    NaiveTime::from_hms_nano_opt(hour, minute, second, nano)
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    if s == "Z" {
        return FixedOffset::east_opt(0);
    }
    let sign = if s.starts_with('-') { -1 } else { 1 };
    let digits: String = s[1..].chars().filter(|c| *c != ':').collect();
    let hours: i32 = digits.get(..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..4)?.parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_datetime(s: &str) -> Option<ConfigValue> {
    let caps = DATETIME.captures(s)?;
    let date = parse_date(&caps[1])?;
    let time = parse_time(&caps[2])?;
    let naive = NaiveDateTime::new(date, time);
    match caps.get(3) {
        None => Some(ConfigValue::DateTime(naive)),
        Some(offset) => {
            let offset = parse_offset(offset.as_str())?;
            offset
                .from_local_datetime(&naive)
                .single()
                .map(ConfigValue::Timestamp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_precedence_table() {
        assert_eq!(coerce_str("42"), ConfigValue::Integer(42));
        assert_eq!(coerce_str("-7"), ConfigValue::Integer(-7));
        assert_eq!(coerce_str("2024"), ConfigValue::Integer(2024));
        assert_eq!(coerce_str("3.25"), ConfigValue::Float(3.25));
        assert_eq!(coerce_str("true"), ConfigValue::Bool(true));
        assert_eq!(coerce_str("false"), ConfigValue::Bool(false));
        assert_eq!(coerce_str("null"), ConfigValue::Null);
        assert_eq!(
            coerce_str("2024-01-01"),
            ConfigValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        assert_eq!(
            coerce_str("13:45:10"),
            ConfigValue::Time(NaiveTime::from_hms_opt(13, 45, 10).unwrap())
        );
        assert_eq!(
            coerce_str("3fa85f64-5717-4562-b3fc-2c963f66afa6"),
            ConfigValue::Uuid(Uuid::parse_str("3fa85f64-5717-4562-b3fc-2c963f66afa6").unwrap())
        );
        assert_eq!(coerce_str("hello"), ConfigValue::String("hello".into()));
    }

    #[test]
    fn test_non_canonical_numbers_stay_strings() {
        assert_eq!(coerce_str("007"), ConfigValue::String("007".into()));
        assert_eq!(coerce_str("1.2.3"), ConfigValue::String("1.2.3".into()));
        assert_eq!(coerce_str("1e5"), ConfigValue::String("1e5".into()));
        assert_eq!(
            coerce_str("99999999999999999999"),
            ConfigValue::String("99999999999999999999".into())
        );
        assert_eq!(coerce_str("True"), ConfigValue::String("True".into()));
    }

    #[test]
    fn test_datetimes_with_and_without_offset() {
        let naive = coerce_str("2024-05-06T07:08:09");
        assert_eq!(naive.type_name(), "datetime");

        let aware = coerce_str("2024-05-06T07:08:09+02:00");
        match aware {
            ConfigValue::Timestamp(ts) => {
                assert_eq!(ts.offset().local_minus_utc(), 7200);
                assert_eq!(ts.to_rfc3339(), "2024-05-06T07:08:09+02:00");
            }
            other => panic!("expected timestamp, got {other:?}"),
        }

        assert_eq!(coerce_str("2024-05-06T07:08:09Z").type_name(), "timestamp");
    }

    #[test]
    fn test_invalid_calendar_values_stay_strings() {
        assert_eq!(coerce_str("2024-13-01"), ConfigValue::String("2024-13-01".into()));
        assert_eq!(coerce_str("25:00"), ConfigValue::String("25:00".into()));
    }

    #[test]
    fn test_fractional_time() {
        assert_eq!(
            coerce_str("09:30:00.5"),
            ConfigValue::Time(NaiveTime::from_hms_milli_opt(9, 30, 0, 500).unwrap())
        );
    }

    #[test]
    fn test_nested_keys_and_values_are_coerced() {
        let value = coerce_value(json!({
            "1": {"2024-01-01": "true"},
            "ids": ["3fa85f64-5717-4562-b3fc-2c963f66afa6", 5],
            "native": 1.5
        }))
        .unwrap();

        let map = value.as_map().unwrap();
        let inner = map.get(&ConfigKey::Integer(1)).and_then(ConfigValue::as_map).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(inner.get(&ConfigKey::Date(date)), Some(&ConfigValue::Bool(true)));

        let ids = map
            .get(&ConfigKey::String("ids".into()))
            .and_then(ConfigValue::as_list)
            .unwrap();
        assert_eq!(ids[0].type_name(), "uuid");
        assert_eq!(ids[1], ConfigValue::Integer(5));

        assert_eq!(
            map.get(&ConfigKey::String("native".into())),
            Some(&ConfigValue::Float(1.5))
        );
    }

    #[test]
    fn test_keys_round_trip_through_wire_form() {
        for raw in ["12", "-3", "0.5", "true", "null", "2024-02-29", "08:00:00", "name"] {
            assert_eq!(coerce_key(raw).to_wire(), raw);
        }
    }
}
