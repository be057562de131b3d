use super::store::ConfigStore;
use super::value::ConfigValue;
use crate::error::{CoreError, Result};

pub const GENERAL: &str = "GENERAL";

pub const TOKEN: &str = "TOKEN";
pub const ERROR_WEBHOOK_URL: &str = "ERROR_WEBHOOK_URL";
pub const EMBED_COLOR: &str = "EMBED_COLOR";
pub const OWNER_GUILD_IDS: &str = "OWNER_GUILD_IDS";
pub const MEMBERS_INTENT: &str = "MEMBERS_INTENT";
pub const PRESENCE_INTENT: &str = "PRESENCE_INTENT";
pub const MESSAGE_CONTENT_INTENT: &str = "MESSAGE_CONTENT_INTENT";
pub const DEFAULT_STATUS: &str = "DEFAULT_STATUS";

/// Blurple, used when no colour is configured
pub const DEFAULT_EMBED_COLOR: u32 = 0x5865F2;

/// Typed view of the `GENERAL` category
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralSettings {
    pub token: String,
    pub error_webhook_url: Option<String>,
    pub embed_color: u32,
    pub owner_guild_ids: Vec<u64>,
    pub members_intent: bool,
    pub presence_intent: bool,
    pub message_content_intent: bool,
    pub default_status: Option<String>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            error_webhook_url: None,
            embed_color: DEFAULT_EMBED_COLOR,
            owner_guild_ids: Vec::new(),
            members_intent: false,
            presence_intent: false,
            message_content_intent: false,
            default_status: None,
        }
    }
}

impl GeneralSettings {
    /// Read the settings, falling back to defaults for missing keys
    ///
    /// A missing `GENERAL` category yields the defaults. Keys that are present
    /// with the wrong shape are reported rather than ignored.
    pub fn from_store(store: &ConfigStore) -> Result<Self> {
        let defaults = Self::default();
        let Some(category) = store.get(GENERAL) else {
            return Ok(defaults);
        };
        let get = |key: &str| category.get(key).filter(|v| !v.is_null());

        Ok(Self {
            token: optional_string(get(TOKEN), TOKEN)?.unwrap_or_default(),
            error_webhook_url: optional_string(get(ERROR_WEBHOOK_URL), ERROR_WEBHOOK_URL)?,
            embed_color: match get(EMBED_COLOR) {
                Some(value) => parse_color(value)?,
                None => defaults.embed_color,
            },
            owner_guild_ids: match get(OWNER_GUILD_IDS) {
                Some(value) => parse_ids(value)?,
                None => defaults.owner_guild_ids,
            },
            members_intent: flag(get(MEMBERS_INTENT), MEMBERS_INTENT)?,
            presence_intent: flag(get(PRESENCE_INTENT), PRESENCE_INTENT)?,
            message_content_intent: flag(get(MESSAGE_CONTENT_INTENT), MESSAGE_CONTENT_INTENT)?,
            default_status: optional_string(get(DEFAULT_STATUS), DEFAULT_STATUS)?,
        })
    }
}

/// Empty strings count as unset
fn optional_string(value: Option<&ConfigValue>, key: &str) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(ConfigValue::String(s)) if s.trim().is_empty() => Ok(None),
        Some(ConfigValue::String(s)) => Ok(Some(s.trim().to_string())),
        Some(other) => Err(CoreError::invalid_setting(GENERAL, key, "a string", other.type_name())),
    }
}

fn flag(value: Option<&ConfigValue>, key: &str) -> Result<bool> {
    match value {
        None => Ok(false),
        Some(ConfigValue::Bool(b)) => Ok(*b),
        Some(other) => Err(CoreError::invalid_setting(GENERAL, key, "true or false", other.type_name())),
    }
}

/// Accepts `#rrggbb` or a decimal integer
///
/// A bare `rrggbb` is refused: digit-only hex like `112233` is coerced to a
/// decimal integer on load and would silently pick the wrong colour.
fn parse_color(value: &ConfigValue) -> Result<u32> {
    let invalid = |found: &dyn std::fmt::Display| {
        CoreError::invalid_setting(GENERAL, EMBED_COLOR, "a colour like #5865f2", found)
    };

    match value {
        ConfigValue::Integer(i) => u32::try_from(*i)
            .ok()
            .filter(|c| *c <= 0xFF_FFFF)
            .ok_or_else(|| invalid(i)),
        ConfigValue::String(s) => {
            let Some(hex) = s.trim().strip_prefix('#') else {
                return Err(invalid(s));
            };
            if hex.len() != 6 {
                return Err(invalid(s));
            }
            u32::from_str_radix(hex, 16).map_err(|_| invalid(s))
        }
        other => Err(invalid(&other.type_name())),
    }
}

fn parse_ids(value: &ConfigValue) -> Result<Vec<u64>> {
    let items = value.as_list().ok_or_else(|| {
        CoreError::invalid_setting(GENERAL, OWNER_GUILD_IDS, "a list of guild ids", value.type_name())
    })?;

    items
        .iter()
        .map(|item| {
            item.as_i64()
                .and_then(|id| u64::try_from(id).ok())
                .filter(|id| *id > 0)
                .ok_or_else(|| {
                    CoreError::invalid_setting(GENERAL, OWNER_GUILD_IDS, "a positive guild id", item)
                })
        })
        .collect()
}
