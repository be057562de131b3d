//! Tagged values stored in a config category
//!
//! JSON only knows strings, numbers, booleans, null, arrays and objects, so
//! dates, times, timestamps and UUIDs travel as strings and are recovered by
//! [`coerce`](super::coerce) when a file is loaded. Object keys are always
//! strings on the wire; [`ConfigKey::to_wire`] and the coercion pass turn them
//! back into typed keys.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use ordered_float::OrderedFloat;
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::error::ConversionError;

/// Mapping type used for categories and nested mappings
pub type ConfigMap = BTreeMap<ConfigKey, ConfigValue>;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// A scalar usable as a mapping key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKey {
    Null,
    Bool(bool),
    Integer(i64),
    Float(OrderedFloat<f64>),
    String(String),
    /// Date and time without an offset
    DateTime(NaiveDateTime),
    /// Date and time with an explicit UTC offset
    Timestamp(DateTime<FixedOffset>),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
}

/// Any value that can live in a category
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<FixedOffset>),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
    List(Vec<ConfigValue>),
    Map(ConfigMap),
}

impl ConfigKey {
    /// String form written to disk as a JSON object key
    pub fn to_wire(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => float_to_wire(f.0),
            Self::String(s) => s.clone(),
            Self::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
            Self::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            Self::Date(d) => d.format(DATE_FORMAT).to_string(),
            Self::Time(t) => t.format(TIME_FORMAT).to_string(),
            Self::Uuid(u) => u.hyphenated().to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        ConfigValue::from(self.clone()).type_name()
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl From<ConfigKey> for ConfigValue {
    fn from(key: ConfigKey) -> Self {
        match key {
            ConfigKey::Null => Self::Null,
            ConfigKey::Bool(b) => Self::Bool(b),
            ConfigKey::Integer(i) => Self::Integer(i),
            ConfigKey::Float(f) => Self::Float(f.0),
            ConfigKey::String(s) => Self::String(s),
            ConfigKey::DateTime(dt) => Self::DateTime(dt),
            ConfigKey::Timestamp(ts) => Self::Timestamp(ts),
            ConfigKey::Date(d) => Self::Date(d),
            ConfigKey::Time(t) => Self::Time(t),
            ConfigKey::Uuid(u) => Self::Uuid(u),
        }
    }
}

impl TryFrom<ConfigValue> for ConfigKey {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        Ok(match value {
            ConfigValue::Null => Self::Null,
            ConfigValue::Bool(b) => Self::Bool(b),
            ConfigValue::Integer(i) => Self::Integer(i),
            ConfigValue::Float(f) => Self::Float(OrderedFloat(finite(f)?)),
            ConfigValue::String(s) => Self::String(s),
            ConfigValue::DateTime(dt) => Self::DateTime(dt),
            ConfigValue::Timestamp(ts) => Self::Timestamp(ts),
            ConfigValue::Date(d) => Self::Date(d),
            ConfigValue::Time(t) => Self::Time(t),
            ConfigValue::Uuid(u) => Self::Uuid(u),
            ConfigValue::List(_) => {
                return Err(ConversionError::new("list", "lists cannot be used as keys"));
            }
            ConfigValue::Map(_) => {
                return Err(ConversionError::new("mapping", "mappings cannot be used as keys"));
            }
        })
    }
}

impl ConfigValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::DateTime(_) => "datetime",
            Self::Timestamp(_) => "timestamp",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Uuid(_) => "uuid",
            Self::List(_) => "list",
            Self::Map(_) => "mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Build a value from JSON without any string coercion
    pub fn from_json(value: Value) -> Result<Self, ConversionError> {
        Ok(match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => number_to_value(&n)?,
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(
                items
                    .into_iter()
                    .map(Self::from_json)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(object) => {
                let mut map = ConfigMap::new();
                for (key, value) in object {
                    map.insert(ConfigKey::String(key), Self::from_json(value)?);
                }
                Self::Map(map)
            }
        })
    }

    /// JSON form written to disk
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(i) => Value::Number((*i).into()),
            Self::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
            Self::DateTime(_)
            | Self::Timestamp(_)
            | Self::Date(_)
            | Self::Time(_)
            | Self::Uuid(_) => {
                // Scalars share their wire form with keys
                let key = ConfigKey::try_from(self.clone()).map(|k| k.to_wire());
                key.map_or(Value::Null, Value::String)
            }
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => Value::Object(map_to_json(map)),
        }
    }

    /// Reject floats that JSON cannot represent, at any depth
    pub fn validate(&self) -> Result<(), ConversionError> {
        match self {
            Self::Float(f) => finite(*f).map(|_| ()),
            Self::List(items) => items.iter().try_for_each(Self::validate),
            Self::Map(map) => map.iter().try_for_each(|(key, value)| {
                if let ConfigKey::Float(f) = key {
                    finite(f.0)?;
                }
                value.validate()
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Serialize a mapping into a JSON object, stringifying every key
pub fn map_to_json(map: &ConfigMap) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| (key.to_wire(), value.to_json()))
        .collect()
}

/// Wire form shared by two distinct keys, looking into nested mappings too
pub fn find_wire_collision(map: &ConfigMap) -> Option<String> {
    let mut seen = HashSet::new();
    for key in map.keys() {
        let wire = key.to_wire();
        if !seen.insert(wire.clone()) {
            return Some(wire);
        }
    }
    map.values().find_map(nested_wire_collision)
}

fn nested_wire_collision(value: &ConfigValue) -> Option<String> {
    match value {
        ConfigValue::List(items) => items.iter().find_map(nested_wire_collision),
        ConfigValue::Map(map) => find_wire_collision(map),
        _ => None,
    }
}

impl ConfigValue {
    /// Wire key written twice to one JSON object somewhere inside this value
    pub fn wire_collision(&self) -> Option<String> {
        nested_wire_collision(self)
    }
}

fn number_to_value(n: &Number) -> Result<ConfigValue, ConversionError> {
    if let Some(i) = n.as_i64() {
        return Ok(ConfigValue::Integer(i));
    }
    match n.as_f64() {
        Some(f) => Ok(ConfigValue::Float(f)),
        None => Err(ConversionError::new("number", format!("{n} is out of range"))),
    }
}

fn finite(f: f64) -> Result<f64, ConversionError> {
    if f.is_finite() {
        Ok(f)
    } else {
        Err(ConversionError::new(
            "f64",
            format!("{f} cannot be written as JSON"),
        ))
    }
}

/// Floats always carry a decimal point so they reload as floats
fn float_to_wire(f: f64) -> String {
    let s = f.to_string();
    if s.contains('.') || !f.is_finite() {
        s
    } else {
        format!("{s}.0")
    }
}

/// Conversion into a [`ConfigKey`], failing for unsupported types
pub trait IntoConfigKey {
    fn into_config_key(self) -> Result<ConfigKey, ConversionError>;
}

/// Conversion into a [`ConfigValue`], failing for unsupported values
pub trait IntoConfigValue {
    fn into_config_value(self) -> Result<ConfigValue, ConversionError>;
}

impl IntoConfigKey for ConfigKey {
    fn into_config_key(self) -> Result<ConfigKey, ConversionError> {
        if let ConfigKey::Float(f) = &self {
            finite(f.0)?;
        }
        Ok(self)
    }
}

impl IntoConfigKey for &ConfigKey {
    fn into_config_key(self) -> Result<ConfigKey, ConversionError> {
        self.clone().into_config_key()
    }
}

impl IntoConfigValue for ConfigValue {
    fn into_config_value(self) -> Result<ConfigValue, ConversionError> {
        self.validate()?;
        Ok(self)
    }
}

impl IntoConfigKey for ConfigValue {
    fn into_config_key(self) -> Result<ConfigKey, ConversionError> {
        ConfigKey::try_from(self)
    }
}

impl IntoConfigValue for ConfigKey {
    fn into_config_value(self) -> Result<ConfigValue, ConversionError> {
        ConfigValue::from(self).into_config_value()
    }
}

impl IntoConfigValue for Value {
    fn into_config_value(self) -> Result<ConfigValue, ConversionError> {
        ConfigValue::from_json(self)
    }
}

impl IntoConfigKey for Value {
    fn into_config_key(self) -> Result<ConfigKey, ConversionError> {
        ConfigKey::try_from(ConfigValue::from_json(self)?)
    }
}

/// Implements both conversions for scalar types that map onto one variant
macro_rules! scalar_conversions {
    ($($ty:ty => |$v:ident| $key:expr, $value:expr;)*) => {
        $(
            impl IntoConfigKey for $ty {
                fn into_config_key(self) -> Result<ConfigKey, ConversionError> {
                    let $v = self;
                    Ok($key)
                }
            }

            impl IntoConfigValue for $ty {
                fn into_config_value(self) -> Result<ConfigValue, ConversionError> {
                    let $v = self;
                    Ok($value)
                }
            }
        )*
    };
}

scalar_conversions! {
    &str => |v| ConfigKey::String(v.to_string()), ConfigValue::String(v.to_string());
    String => |v| ConfigKey::String(v), ConfigValue::String(v);
    &String => |v| ConfigKey::String(v.clone()), ConfigValue::String(v.clone());
    bool => |v| ConfigKey::Bool(v), ConfigValue::Bool(v);
    () => |_v| ConfigKey::Null, ConfigValue::Null;
    i64 => |v| ConfigKey::Integer(v), ConfigValue::Integer(v);
    i32 => |v| ConfigKey::Integer(v.into()), ConfigValue::Integer(v.into());
    u32 => |v| ConfigKey::Integer(v.into()), ConfigValue::Integer(v.into());
    i16 => |v| ConfigKey::Integer(v.into()), ConfigValue::Integer(v.into());
    u16 => |v| ConfigKey::Integer(v.into()), ConfigValue::Integer(v.into());
    u8 => |v| ConfigKey::Integer(v.into()), ConfigValue::Integer(v.into());
    NaiveDateTime => |v| ConfigKey::DateTime(v), ConfigValue::DateTime(v);
    DateTime<FixedOffset> => |v| ConfigKey::Timestamp(v), ConfigValue::Timestamp(v);
    DateTime<Utc> => |v| ConfigKey::Timestamp(v.fixed_offset()), ConfigValue::Timestamp(v.fixed_offset());
    NaiveDate => |v| ConfigKey::Date(v), ConfigValue::Date(v);
    NaiveTime => |v| ConfigKey::Time(v), ConfigValue::Time(v);
    Uuid => |v| ConfigKey::Uuid(v), ConfigValue::Uuid(v);
}

fn checked_i64<T>(v: T, type_name: &str) -> Result<i64, ConversionError>
where
    T: TryInto<i64> + fmt::Display + Copy,
{
    v.try_into()
        .map_err(|_| ConversionError::new(type_name, format!("{v} does not fit in a 64-bit signed integer")))
}

impl IntoConfigKey for u64 {
    fn into_config_key(self) -> Result<ConfigKey, ConversionError> {
        checked_i64(self, "u64").map(ConfigKey::Integer)
    }
}

impl IntoConfigValue for u64 {
    fn into_config_value(self) -> Result<ConfigValue, ConversionError> {
        checked_i64(self, "u64").map(ConfigValue::Integer)
    }
}

impl IntoConfigKey for usize {
    fn into_config_key(self) -> Result<ConfigKey, ConversionError> {
        checked_i64(self, "usize").map(ConfigKey::Integer)
    }
}

impl IntoConfigValue for usize {
    fn into_config_value(self) -> Result<ConfigValue, ConversionError> {
        checked_i64(self, "usize").map(ConfigValue::Integer)
    }
}

impl IntoConfigKey for f64 {
    fn into_config_key(self) -> Result<ConfigKey, ConversionError> {
        finite(self).map(|f| ConfigKey::Float(OrderedFloat(f)))
    }
}

impl IntoConfigValue for f64 {
    fn into_config_value(self) -> Result<ConfigValue, ConversionError> {
        finite(self).map(ConfigValue::Float)
    }
}

impl IntoConfigValue for f32 {
    fn into_config_value(self) -> Result<ConfigValue, ConversionError> {
        f64::from(self).into_config_value()
    }
}

impl<T: IntoConfigValue> IntoConfigValue for Option<T> {
    fn into_config_value(self) -> Result<ConfigValue, ConversionError> {
        match self {
            Some(v) => v.into_config_value(),
            None => Ok(ConfigValue::Null),
        }
    }
}

impl<T: IntoConfigKey> IntoConfigKey for Option<T> {
    fn into_config_key(self) -> Result<ConfigKey, ConversionError> {
        match self {
            Some(v) => v.into_config_key(),
            None => Ok(ConfigKey::Null),
        }
    }
}

impl<T: IntoConfigValue> IntoConfigValue for Vec<T> {
    fn into_config_value(self) -> Result<ConfigValue, ConversionError> {
        self.into_iter()
            .map(IntoConfigValue::into_config_value)
            .collect::<Result<Vec<_>, _>>()
            .map(ConfigValue::List)
    }
}

impl<K: IntoConfigKey, V: IntoConfigValue> IntoConfigValue for BTreeMap<K, V> {
    fn into_config_value(self) -> Result<ConfigValue, ConversionError> {
        let mut map = ConfigMap::new();
        for (key, value) in self {
            map.insert(key.into_config_key()?, value.into_config_value()?);
        }
        Ok(ConfigValue::Map(map))
    }
}
