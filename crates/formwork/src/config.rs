//! Library-wide configuration.
//!
//! Forms capture a [`FormConfig`] at construction. A process-wide
//! default instance exists for convenience; changing it never affects
//! forms that were already built.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{OnceLock, RwLock};

/// Configuration captured by each form at construction time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormConfig {
    /// Prefix for generated form/field identifiers.
    pub id_prefix: String,
    /// BCP 47 locale tag handed to formatting collaborators.
    pub locale: String,
    /// Whether consumers should suppress native HTML validation.
    pub disable_html_validation: bool,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            id_prefix: "fw".to_owned(),
            locale: "en-US".to_owned(),
            disable_html_validation: false,
        }
    }
}

fn default_config() -> &'static RwLock<FormConfig> {
    static DEFAULT: OnceLock<RwLock<FormConfig>> = OnceLock::new();
    DEFAULT.get_or_init(|| RwLock::new(FormConfig::default()))
}

/// Overwrite the process-wide default config (last writer wins).
pub fn configure(config: FormConfig) {
    *default_config()
        .write()
        .unwrap_or_else(|e| e.into_inner()) = config;
}

/// Clone the process-wide default config.
pub fn get_config() -> FormConfig {
    default_config()
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// Generate a process-unique id with the given prefix.
pub(crate) fn next_id(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("{}-{}", prefix, COUNTER.fetch_add(1, Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FormConfig::default();
        assert_eq!(config.id_prefix, "fw");
        assert!(!config.disable_html_validation);
    }

    #[test]
    fn test_next_id_unique() {
        let a = next_id("fw");
        let b = next_id("fw");
        assert_ne!(a, b);
        assert!(a.starts_with("fw-"));
    }

    #[test]
    fn test_configure_overwrites() {
        // Other tests read the default concurrently, so assert via a
        // distinct prefix rather than exact global state.
        let mut config = get_config();
        config.locale = "de-DE".to_owned();
        configure(config);
        assert_eq!(get_config().locale, "de-DE");
        configure(FormConfig::default());
    }
}
