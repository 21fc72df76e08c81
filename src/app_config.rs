/*!
 * Application configuration module.
 *
 * This module handles loading the YAML configuration file, applying
 * environment and command line overrides, and validating the result.
 */

use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::default::Default;
use std::path::{Path, PathBuf};
use url::Url;

use crate::language_utils;

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// General run settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Text-generation service settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Per-language overrides keyed by language code
    #[serde(default)]
    pub languages: BTreeMap<String, LanguageConfig>,
}

/// General run settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeneralConfig {
    /// Segment budget in cost units
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Size of the worker pool
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Language the source documents are written in
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Directory holding the per-language improvement hint files
    #[serde(default = "default_hints_dir")]
    pub hints_dir: PathBuf,

    /// Path to the glossary file
    #[serde(default = "default_glossary_path")]
    pub glossary_path: PathBuf,

    /// Log level used when none is given on the command line
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            max_workers: default_max_workers(),
            source_language: default_source_language(),
            hints_dir: default_hints_dir(),
            glossary_path: default_glossary_path(),
            log_level: LogLevel::default(),
        }
    }
}

/// Text-generation service settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiConfig {
    // @field: Service URL (OpenAI-compatible)
    #[serde(default = "String::new")]
    pub base_url: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model_name: String,

    // @field: API key, usually supplied through the environment
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    // @field: Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            model_name: String::new(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl ApiConfig {
    /// Get the endpoint, falling back to the public OpenAI API
    pub fn get_base_url(&self) -> String {
        if self.base_url.is_empty() {
            default_base_url()
        } else {
            self.base_url.clone()
        }
    }

    /// Get the model, falling back to the default model
    pub fn get_model(&self) -> String {
        if self.model_name.is_empty() {
            default_model_name()
        } else {
            self.model_name.clone()
        }
    }
}

/// Per-language overrides
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LanguageConfig {
    /// Translation instruction for this language
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Instruction for the validation pass
    #[serde(default)]
    pub validation_prompt: Option<String>,

    /// Destination root relative to the repository in changeset mode
    #[serde(default)]
    pub destination: Option<String>,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to the log crate's filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Languages translated when `--language all` is given
pub const DEFAULT_TARGET_LANGUAGES: [&str; 3] = ["en", "es", "zh"];

/// Source directory in changeset mode, relative to the repository root
pub const DEFAULT_SOURCE_SUBDIR: &str = "i18n/ru/docusaurus-plugin-content-docs/current";

fn default_max_tokens() -> usize {
    8000
}

fn default_max_workers() -> usize {
    4
}

fn default_source_language() -> String {
    "ru".to_string()
}

fn default_hints_dir() -> PathBuf {
    PathBuf::from("prompt_improvements")
}

fn default_glossary_path() -> PathBuf {
    PathBuf::from("glossary.yaml")
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model_name() -> String {
    "gpt-4o-mini".to_string()
}

const EN_SYSTEM_PROMPT: &str = "Translate the following markdown text from Russian to English.
Preserve all markdown formatting, code blocks, and structure.
Keep technical terms consistent throughout the translation.
Do not translate code snippets, variable names, or commands inside code blocks.

IMPORTANT: Return ONLY the translated text without any explanations, comments, or additional information.
Do not include the original Russian text in your response.
Do not add any explanations about your translation process.";

const ES_SYSTEM_PROMPT: &str = "Traduce el siguiente texto markdown del ruso al español.
Conserva todo el formato markdown, bloques de código y estructura.
Mantén los términos técnicos consistentes a lo largo de la traducción.
No traduzcas fragmentos de código, nombres de variables o comandos dentro de bloques de código.

IMPORTANTE: Devuelve SOLO el texto traducido sin explicaciones, comentarios o información adicional.
No incluyas el texto original en ruso en tu respuesta.
No agregues explicaciones sobre tu proceso de traducción.";

const ZH_SYSTEM_PROMPT: &str = "将以下markdown文本从俄语翻译成中文。
保留所有markdown格式、代码块和结构。
在整个翻译过程中保持技术术语的一致性。
不要翻译代码块中的代码片段、变量名或命令。

重要提示：仅返回翻译后的文本，不要添加任何解释、评论或额外信息。
不要在回复中包含原始俄语文本。
不要添加关于您翻译过程的解释。";

const GENERIC_SYSTEM_PROMPT: &str = "Translate the following markdown text from {source_language} to {target_language}.
Preserve all markdown formatting, code blocks, and structure.
Keep technical terms consistent throughout the translation.
Do not translate code snippets, variable names, or commands inside code blocks.

IMPORTANT: Return ONLY the translated text without any explanations, comments, or additional information.
Do not include the original text in your response.
Do not add any explanations about your translation process.";

const VALIDATION_PROMPT: &str = "You are an expert reviewer of translations from {source_language} to {target_language}.

Find ONLY SERIOUS translation errors and ignore stylistic variation.

Check:
1. Glossary terms: flag only terms that CLEARLY contradict the glossary.
2. Preservation of markdown formatting.
3. Accuracy of meaning.
4. Preservation of code and technical elements.

Do NOT flag:
- Stylistic variations
- Glossary terms that were translated correctly
- Minor punctuation differences
- Different ways of expressing the same idea

Return ONLY JSON with an array `issues`, each element containing:
- file_path: path to the file
- original: the fragment of the original containing the error
- translated: the corresponding fragment of the translation
- reason: a short explanation (1 sentence)

If there are no errors, return an empty array: {\"issues\": []}.";

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// A missing or malformed file is not fatal: defaults are used and a
    /// warning is logged.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config from {}: {:#}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load configuration from a YAML file, failing on any error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Fill empty API settings from environment variables
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Fill empty API settings using the given variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.api.api_key.is_empty() {
            if let Some(key) = non_empty("OPENAI_API_KEY") {
                self.api.api_key = key;
            }
        }
        if self.api.base_url.is_empty() {
            if let Some(url) = non_empty("OPENAI_BASE_URL") {
                self.api.base_url = url;
            }
        }
        if self.api.model_name.is_empty() {
            if let Some(model) = non_empty("MODEL_NAME") {
                self.api.model_name = model;
            }
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.general.max_tokens == 0 {
            return Err(anyhow!("general.max_tokens must be greater than zero"));
        }
        if self.general.max_workers == 0 {
            return Err(anyhow!("general.max_workers must be greater than zero"));
        }

        let base_url = self.api.get_base_url();
        Url::parse(&base_url)
            .with_context(|| format!("api.base_url is not a valid URL: {}", base_url))?;

        language_utils::validate_language_code(&self.general.source_language)?;
        for code in self.languages.keys() {
            language_utils::validate_language_code(code)
                .with_context(|| format!("Invalid language section: languages.{}", code))?;
        }

        Ok(())
    }

    /// Get the per-language configuration, if any
    pub fn language_config(&self, target_language: &str) -> Option<&LanguageConfig> {
        self.languages.get(target_language)
    }

    /// Get the translation instruction for a target language
    pub fn get_system_prompt(&self, target_language: &str) -> String {
        let configured = self
            .language_config(target_language)
            .and_then(|l| l.system_prompt.as_deref())
            .filter(|p| !p.trim().is_empty());

        if let Some(prompt) = configured {
            return prompt.trim().to_string();
        }

        let builtin_for_russian = self.general.source_language == "ru";
        match target_language {
            "en" if builtin_for_russian => EN_SYSTEM_PROMPT.to_string(),
            "es" if builtin_for_russian => ES_SYSTEM_PROMPT.to_string(),
            "zh" if builtin_for_russian => ZH_SYSTEM_PROMPT.to_string(),
            _ => self.render_template(GENERIC_SYSTEM_PROMPT, target_language),
        }
    }

    /// Get the validation instruction for a target language
    pub fn get_validation_prompt(&self, target_language: &str) -> String {
        self.language_config(target_language)
            .and_then(|l| l.validation_prompt.as_deref())
            .filter(|p| !p.trim().is_empty())
            .map(|p| p.trim().to_string())
            .unwrap_or_else(|| self.render_template(VALIDATION_PROMPT, target_language))
    }

    /// Get the changeset destination root for a target language
    pub fn get_destination(&self, target_language: &str) -> Option<String> {
        if let Some(dest) = self
            .language_config(target_language)
            .and_then(|l| l.destination.clone())
        {
            return Some(dest);
        }

        match target_language {
            "en" => Some("docs".to_string()),
            "es" => Some("i18n/es/docusaurus-plugin-content-docs/current".to_string()),
            "zh" => Some("i18n/zh/docusaurus-plugin-content-docs/current".to_string()),
            _ => None,
        }
    }

    fn render_template(&self, template: &str, target_language: &str) -> String {
        let source_name = language_utils::get_language_name(&self.general.source_language)
            .unwrap_or_else(|_| self.general.source_language.clone());
        let target_name = language_utils::get_language_name(target_language)
            .unwrap_or_else(|_| target_language.to_string());
        template
            .replace("{source_language}", &source_name)
            .replace("{target_language}", &target_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fromYamlStr_partialFile_shouldFillDefaults() {
        let config = Config::from_yaml_str("general:\n  max_workers: 8\n").unwrap();
        assert_eq!(config.general.max_workers, 8);
        assert_eq!(config.general.max_tokens, 8000);
        assert_eq!(config.api.get_model(), "gpt-4o-mini");
    }

    #[test]
    fn test_load_missingFile_shouldFallBackToDefaults() {
        let config = Config::load("definitely/not/here/config.yaml");
        assert_eq!(config.general.max_tokens, 8000);
        assert_eq!(config.general.max_workers, 4);
    }

    #[test]
    fn test_getSystemPrompt_configuredOverride_shouldWin() {
        let yaml = "languages:\n  en:\n    system_prompt: \"  Custom prompt  \"\n";
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.get_system_prompt("en"), "Custom prompt");
    }

    #[test]
    fn test_getSystemPrompt_unknownLanguage_shouldRenderLanguageNames() {
        let config = Config::default();
        let prompt = config.get_system_prompt("fr");
        assert!(prompt.contains("from Russian to French"));
    }

    #[test]
    fn test_applyEnvFrom_emptyFields_shouldUseEnvironment() {
        let mut config = Config::default();
        config.api.model_name = "configured-model".to_string();
        config.apply_env_from(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "MODEL_NAME" => Some("env-model".to_string()),
            _ => None,
        });
        assert_eq!(config.api.api_key, "sk-test");
        assert_eq!(config.api.model_name, "configured-model");
    }

    #[test]
    fn test_validate_zeroWorkers_shouldFail() {
        let mut config = Config::default();
        config.general.max_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_badBaseUrl_shouldFail() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_getDestination_builtinLanguages_shouldResolve() {
        let config = Config::default();
        assert_eq!(config.get_destination("en").as_deref(), Some("docs"));
        assert!(config.get_destination("de").is_none());
    }
}
