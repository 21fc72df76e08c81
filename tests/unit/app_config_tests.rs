/*!
 * Tests for application configuration functionality
 */

use std::collections::HashMap;

use doclingo::app_config::{Config, LogLevel};

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoFile_shouldHaveCorrectDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let config = Config::load(dir.path().join("missing.yaml"));

    assert_eq!(config.general.max_tokens, 8000);
    assert_eq!(config.general.max_workers, 4);
    assert_eq!(config.general.source_language, "ru");
    assert_eq!(config.general.log_level, LogLevel::Info);
    assert_eq!(config.api.get_model(), "gpt-4o-mini");
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_withPartialFile_shouldKeepDefaultsForMissingFields() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "config.yaml",
        "general:\n  max_workers: 9\nlanguages:\n  de:\n    system_prompt: Übersetze bitte.\n",
    )
    .unwrap();

    let config = Config::load(&path);

    assert_eq!(config.general.max_workers, 9);
    assert_eq!(config.general.max_tokens, 8000);
    assert_eq!(config.get_system_prompt("de"), "Übersetze bitte.");
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_withMalformedFile_shouldFallBackToDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "config.yaml", "general: [1, 2").unwrap();
    let config = Config::load(&path);
    assert_eq!(config.general.max_workers, 4);
}

#[test]
fn test_applyEnv_withFileValues_shouldPreferFile() {
    let mut config = Config::from_yaml_str("api:\n  model_name: from-file\n").unwrap();
    let env: HashMap<&str, &str> = [("MODEL_NAME", "from-env"), ("OPENAI_API_KEY", "sk-env")].into();

    config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

    assert_eq!(config.api.model_name, "from-file");
    assert_eq!(config.api.api_key, "sk-env");
}

#[test]
fn test_validate_withZeroWorkersOrBadUrl_shouldFail() {
    let mut config = Config::default();
    config.general.max_workers = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.api.base_url = "not a url".to_string();
    assert!(config.validate().is_err());
}
