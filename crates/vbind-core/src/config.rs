#![forbid(unsafe_code)]

//! Process-wide binding configuration.
//!
//! Defaults match what markup normally expects; override with the builder
//! setters or, with the `config` feature, from a TOML document:
//!
//! ```toml
//! flush_pass_cap = 200
//! default_state = "Normal"
//! language = "en"
//! platform = "desktop"
//! default_dictionary = "Theme"
//! log_retryable_failures = true
//! ```

/// Default cap on change-handler flush passes before the driver gives up.
pub const DEFAULT_FLUSH_PASS_CAP: usize = 1000;

/// Name of the implicit state every owner starts in.
pub const DEFAULT_STATE: &str = "Default";

/// Runtime knobs shared by every view of a binding context.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct BindingConfig {
    /// Maximum number of change-handler flush passes per propagation.
    pub flush_pass_cap: usize,
    /// State name whose values are snapshotted on default-state writes.
    pub default_state: String,
    /// Active resource language; `None` matches only wildcard resources.
    pub language: Option<String>,
    /// Active resource platform; `None` matches only wildcard resources.
    pub platform: Option<String>,
    /// Dictionary consulted by `{@key}` references without a dictionary.
    pub default_dictionary: String,
    /// Report retryable path failures at `warn` instead of `debug`.
    pub log_retryable_failures: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            flush_pass_cap: DEFAULT_FLUSH_PASS_CAP,
            default_state: DEFAULT_STATE.to_owned(),
            language: None,
            platform: None,
            default_dictionary: String::new(),
            log_retryable_failures: false,
        }
    }
}

impl BindingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_flush_pass_cap(mut self, cap: usize) -> Self {
        self.flush_pass_cap = cap.max(1);
        self
    }

    #[must_use]
    pub fn with_default_state(mut self, name: impl Into<String>) -> Self {
        self.default_state = name.into();
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    #[must_use]
    pub fn with_default_dictionary(mut self, name: impl Into<String>) -> Self {
        self.default_dictionary = name.into();
        self
    }

    #[must_use]
    pub fn with_retryable_logging(mut self, enabled: bool) -> Self {
        self.log_retryable_failures = enabled;
        self
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text)?;
        if config.flush_pass_cap == 0 {
            return Err(ConfigError::ZeroPassCap);
        }
        if config.default_state.trim().is_empty() {
            return Err(ConfigError::EmptyDefaultState);
        }
        config.default_state = config.default_state.trim().to_owned();
        Ok(config)
    }
}

/// Failure loading a [`BindingConfig`].
#[cfg(feature = "config")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid binding config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("flush_pass_cap must be at least 1")]
    ZeroPassCap,
    #[error("default_state must not be empty")]
    EmptyDefaultState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BindingConfig::default();
        assert_eq!(config.flush_pass_cap, 1000);
        assert_eq!(config.default_state, "Default");
        assert!(config.language.is_none());
        assert!(!config.log_retryable_failures);
    }

    #[test]
    fn builder_clamps_pass_cap() {
        let config = BindingConfig::new()
            .with_flush_pass_cap(0)
            .with_language("de")
            .with_default_dictionary("Theme");
        assert_eq!(config.flush_pass_cap, 1);
        assert_eq!(config.language.as_deref(), Some("de"));
        assert_eq!(config.default_dictionary, "Theme");
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_overrides_selected_keys() {
        let config = BindingConfig::from_toml_str(
            r#"
            flush_pass_cap = 50
            platform = "desktop"
            "#,
        )
        .unwrap();
        assert_eq!(config.flush_pass_cap, 50);
        assert_eq!(config.platform.as_deref(), Some("desktop"));
        assert_eq!(config.default_state, "Default");
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_rejects_bad_values() {
        assert!(matches!(
            BindingConfig::from_toml_str("flush_pass_cap = 0"),
            Err(ConfigError::ZeroPassCap)
        ));
        assert!(matches!(
            BindingConfig::from_toml_str("unknown = 1"),
            Err(ConfigError::Toml(_))
        ));
    }
}
