/*!
 * Common test utilities for the doclingo test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use doclingo::app_config::Config;

/// Routes library log output through the test harness; safe to call repeatedly
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file, and any missing parent directories, under `dir`
pub fn create_test_file(dir: &Path, relative: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(relative);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Configuration that keeps hint files inside `dir`
pub fn test_config(dir: &Path, max_tokens: usize) -> Config {
    let mut config = Config::default();
    config.general.max_tokens = max_tokens;
    config.general.max_workers = 2;
    config.general.hints_dir = dir.join("hints");
    config
}

/// Owned language list
pub fn languages(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

/// Section body of `len` copies of `fill` under a level-one heading
pub fn section(title: &str, fill: &str, len: usize) -> String {
    format!("# {}\n\n{}", title, fill.repeat(len))
}
