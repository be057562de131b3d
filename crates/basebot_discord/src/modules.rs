//! Built-in command modules

pub mod example;
pub mod ping;

use basebot_core::ModuleRegistry;

/// Every module this binary ships with
pub fn registry() -> ModuleRegistry {
    ModuleRegistry::new()
        .with(ping::NAME, ping::construct)
        .with(example::NAME, example::construct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_template_is_registered_but_not_available() {
        let registry = registry();
        assert!(registry.contains(example::NAME));
        assert_eq!(registry.available(), vec!["ping".to_string()]);
    }
}
