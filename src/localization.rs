use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::sync::LazyLock;
use unic_langid::LanguageIdentifier;

/// Locale of every message the bot sends
pub const DEFAULT_LOCALE: &str = "ru";

const RU_RESOURCE: &str = include_str!("../locales/ru/main.ftl");

/// Localization manager for the school helper bot
pub struct LocalizationManager {
    bundle: FluentBundle<FluentResource>,
    parse_errors: usize,
}

impl LocalizationManager {
    /// Create a localization manager from a Fluent source
    pub fn from_source(locale: &str, source: &str) -> Self {
        let langid: LanguageIdentifier = locale.parse().unwrap_or_default();
        let mut bundle = FluentBundle::new_concurrent(vec![langid]);
        // Telegram renders the isolation marks as visible garbage
        bundle.set_use_isolating(false);

        let (resource, mut parse_errors) = match FluentResource::try_new(source.to_string()) {
            Ok(resource) => (resource, 0),
            Err((resource, errors)) => {
                tracing::error!(locale, errors = ?errors, "Fluent resource has syntax errors");
                (resource, errors.len())
            }
        };

        if let Err(errors) = bundle.add_resource(resource) {
            tracing::error!(locale, errors = ?errors, "Failed to add Fluent resource");
            parse_errors += errors.len();
        }

        Self {
            bundle,
            parse_errors,
        }
    }

    /// Get a localized message
    pub fn get_message(&self, key: &str, args: Option<&FluentArgs>) -> String {
        let msg = match self.bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {key}"),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {key}"),
        };

        let mut errors = vec![];
        let value = self.bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            tracing::warn!(key, errors = ?errors, "Errors while formatting message");
        }
        value.into_owned()
    }

    /// Get a localized message with simple string arguments
    pub fn get_message_with_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        let fluent_args = FluentArgs::from_iter(
            args.iter()
                .map(|(k, v)| (*k, FluentValue::from(v.to_string()))),
        );
        self.get_message(key, Some(&fluent_args))
    }

    pub fn has_message(&self, key: &str) -> bool {
        self.bundle.has_message(key)
    }
}

static LOCALIZATION_MANAGER: LazyLock<LocalizationManager> =
    LazyLock::new(|| LocalizationManager::from_source(DEFAULT_LOCALE, RU_RESOURCE));

/// Load the bundled messages, failing if the resource does not parse cleanly
pub fn init_localization() -> Result<()> {
    let manager = get_localization_manager();
    if manager.parse_errors > 0 {
        return Err(anyhow!(
            "{} errors in the {DEFAULT_LOCALE} message resource",
            manager.parse_errors
        ));
    }
    Ok(())
}

/// Get the global localization manager
pub fn get_localization_manager() -> &'static LocalizationManager {
    &LOCALIZATION_MANAGER
}

/// Convenience function to get a localized message
pub fn t(key: &str) -> String {
    get_localization_manager().get_message(key, None)
}

/// Convenience function to get a localized message with arguments
pub fn t_args(key: &str, args: &[(&str, &str)]) -> String {
    get_localization_manager().get_message_with_args(key, args)
}
