use miette::Diagnostic;
use thiserror::Error;

/// Why a Rust value could not be turned into a config key or value
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{type_name} is not supported: {reason}")]
pub struct ConversionError {
    pub type_name: String,
    pub reason: String,
}

impl ConversionError {
    pub fn new(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("Failed to {operation} config file")]
    #[diagnostic(
        code(basebot_core::config_io),
        help("Check that {path} exists and is readable and writable")
    )]
    ConfigIo {
        path: String,
        operation: &'static str,
        #[source]
        cause: std::io::Error,
    },

    #[error("Config file is not valid JSON")]
    #[diagnostic(
        code(basebot_core::config_parse),
        help("Fix the JSON syntax in {path} or delete it to have it recreated")
    )]
    ConfigParse {
        path: String,
        #[source]
        cause: serde_json::Error,
    },

    #[error("Config file must contain a JSON object")]
    #[diagnostic(
        code(basebot_core::config_not_a_mapping),
        help("{path} contains {found} at the top level; wrap the settings in {{ }}")
    )]
    NotAMapping { path: String, found: String },

    #[error("Unsupported key type for category '{category}'")]
    #[diagnostic(
        code(basebot_core::unsupported_key),
        help(
            "Keys must be strings, integers, floats, booleans, null, dates, times, timestamps or UUIDs"
        )
    )]
    UnsupportedKey {
        category: String,
        #[source]
        cause: ConversionError,
    },

    #[error("Unsupported value for key '{key}' in category '{category}'")]
    #[diagnostic(
        code(basebot_core::unsupported_value),
        help("Values must be scalars, lists or mappings that can be written as JSON")
    )]
    UnsupportedValue {
        category: String,
        key: String,
        #[source]
        cause: ConversionError,
    },

    #[error("Key '{key}' in category '{category}' is written by more than one entry")]
    #[diagnostic(
        code(basebot_core::key_collision),
        help("Keys are stored as strings, so \"1\" and 1 would overwrite each other on save")
    )]
    KeyCollision { category: String, key: String },

    #[error("Invalid category name '{name}'")]
    #[diagnostic(code(basebot_core::invalid_category_name), help("{reason}"))]
    InvalidCategoryName { name: String, reason: String },

    #[error("Category '{name}' not found")]
    #[diagnostic(
        code(basebot_core::category_not_found),
        help("Known categories: {}", available.join(", "))
    )]
    CategoryNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("Invalid setting {category}.{key}")]
    #[diagnostic(
        code(basebot_core::invalid_setting),
        help("Expected {expected}, found {found}")
    )]
    InvalidSetting {
        category: String,
        key: String,
        expected: String,
        found: String,
    },

    #[error("No bot token configured")]
    #[diagnostic(
        code(basebot_core::missing_token),
        help("Pass the token as the first argument, set BASEBOT_TOKEN, or enter it when prompted")
    )]
    MissingToken,

    #[error("Token prompt failed")]
    #[diagnostic(code(basebot_core::token_prompt_failed))]
    TokenPromptFailed {
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Module '{name}' not found")]
    #[diagnostic(
        code(basebot_core::module_not_found),
        help("Available modules: {}", available.join(", "))
    )]
    ModuleNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("Module '{name}' is already loaded")]
    #[diagnostic(
        code(basebot_core::module_already_loaded),
        help("Use reload to replace a loaded module")
    )]
    ModuleAlreadyLoaded { name: String },

    #[error("Module '{name}' is not loaded")]
    #[diagnostic(code(basebot_core::module_not_loaded))]
    ModuleNotLoaded { name: String },

    #[error("Module '{name}' failed to set up")]
    #[diagnostic(code(basebot_core::module_setup_failed))]
    ModuleSetupFailed {
        name: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Command '{command}' is declared by both '{existing_module}' and '{module}'")]
    #[diagnostic(
        code(basebot_core::duplicate_command),
        help("Rename one of the commands or unload '{existing_module}' first")
    )]
    DuplicateCommand {
        command: String,
        module: String,
        existing_module: String,
    },

    #[error("Error report could not be delivered")]
    #[diagnostic(
        code(basebot_core::report_failed),
        help("Check the ERROR_WEBHOOK_URL setting for sink '{sink}'")
    )]
    ReportFailed {
        sink: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn config_io(path: &std::path::Path, operation: &'static str, cause: std::io::Error) -> Self {
        Self::ConfigIo {
            path: path.display().to_string(),
            operation,
            cause,
        }
    }

    pub fn invalid_setting(
        category: impl Into<String>,
        key: impl Into<String>,
        expected: impl Into<String>,
        found: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidSetting {
            category: category.into(),
            key: key.into(),
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    /// Short variant name, used when reporting failures back to the owner
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigIo { .. } => "ConfigIo",
            Self::ConfigParse { .. } => "ConfigParse",
            Self::NotAMapping { .. } => "NotAMapping",
            Self::UnsupportedKey { .. } => "UnsupportedKey",
            Self::UnsupportedValue { .. } => "UnsupportedValue",
            Self::KeyCollision { .. } => "KeyCollision",
            Self::InvalidCategoryName { .. } => "InvalidCategoryName",
            Self::CategoryNotFound { .. } => "CategoryNotFound",
            Self::InvalidSetting { .. } => "InvalidSetting",
            Self::MissingToken => "MissingToken",
            Self::TokenPromptFailed { .. } => "TokenPromptFailed",
            Self::ModuleNotFound { .. } => "ModuleNotFound",
            Self::ModuleAlreadyLoaded { .. } => "ModuleAlreadyLoaded",
            Self::ModuleNotLoaded { .. } => "ModuleNotLoaded",
            Self::ModuleSetupFailed { .. } => "ModuleSetupFailed",
            Self::DuplicateCommand { .. } => "DuplicateCommand",
            Self::ReportFailed { .. } => "ReportFailed",
        }
    }
}
