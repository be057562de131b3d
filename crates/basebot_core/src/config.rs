//! JSON backed configuration
//!
//! Every category lives in `<root>/<NAME>.json`. The files in
//! `<root>/default/` decide which categories exist and provide the keys a
//! live file is missing. Live values always win over defaults.

mod category;
mod coerce;
mod settings;
mod store;
mod value;

pub use category::{Category, category_path, validate_name};
pub use coerce::{coerce_key, coerce_object, coerce_str, coerce_value};
pub use settings::*;
pub use store::{ConfigStore, DEFAULTS_DIR, SaveGuard, SharedConfig};
pub use value::{
    ConfigKey, ConfigMap, ConfigValue, IntoConfigKey, IntoConfigValue, find_wire_collision,
    map_to_json,
};
