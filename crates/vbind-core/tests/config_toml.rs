#![cfg(feature = "config")]

use vbind_core::{BindingConfig, ConfigError};

#[test]
fn full_document_round_trips_every_key() {
    let config = BindingConfig::from_toml_str(
        r#"
        flush_pass_cap = 200
        default_state = " Normal "
        language = "en"
        platform = "desktop"
        default_dictionary = "Theme"
        log_retryable_failures = true
        "#,
    )
    .unwrap();
    assert_eq!(
        config,
        BindingConfig::new()
            .with_flush_pass_cap(200)
            .with_default_state("Normal")
            .with_language("en")
            .with_platform("desktop")
            .with_default_dictionary("Theme")
            .with_retryable_logging(true)
    );
}

#[test]
fn empty_document_is_the_default() {
    assert_eq!(BindingConfig::from_toml_str("").unwrap(), BindingConfig::default());
}

#[test]
fn unknown_keys_are_rejected() {
    let err = BindingConfig::from_toml_str("flush_cap = 3").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn blank_default_state_is_rejected() {
    let err = BindingConfig::from_toml_str("default_state = \"  \"").unwrap_err();
    assert!(matches!(err, ConfigError::EmptyDefaultState));
}
