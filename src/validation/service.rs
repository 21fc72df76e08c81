/*!
 * Validation service.
 *
 * Each translated document under `<output>/<lang>` that has a matching
 * original is checked with one JSON-mode request. Files are validated
 * concurrently; issues are reported in file order.
 */

use anyhow::{Context, Result, anyhow};
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::errors::ProviderError;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::providers::{CompletionRequest, Provider};
use crate::translation::core::TokenUsageStats;
use crate::translation::glossary::Glossary;
use crate::translation::hints::{AppendOutcome, HintStore, ImprovementHint};
use crate::translation::prompts::{PromptTemplate, glossary_section, validation_user_message};

/// Completion budget of a validation request
pub const VALIDATION_MAX_TOKENS: u32 = 2000;

/// Fragments shorter than this are not actionable
const MIN_FRAGMENT_CHARS: usize = 3;

/// Reason wording that marks a complaint about glossary terminology.
/// "term" must be a whole word; the others may start a longer word.
static GLOSSARY_REASON_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(glossar|terminolog|terms?\b|глоссари|словар|термин)").unwrap()
});

/// A translation problem reported by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub translated: String,
    #[serde(default)]
    pub reason: String,
}

impl ValidationIssue {
    fn from_value(value: &Value) -> Self {
        let field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string()
        };
        Self {
            file_path: field("file_path"),
            original: field("original"),
            translated: field("translated"),
            reason: field("reason"),
        }
    }

    /// Missing fields or fragments too short to act on
    pub fn is_incomplete(&self) -> bool {
        self.reason.is_empty()
            || self.original.chars().count() < MIN_FRAGMENT_CHARS
            || self.translated.chars().count() < MIN_FRAGMENT_CHARS
    }

    /// A complaint about a glossary term that was in fact rendered as the glossary says
    pub fn is_glossary_false_positive(&self, glossary: &Glossary, language: &str) -> bool {
        if !GLOSSARY_REASON_REGEX.is_match(&self.reason) {
            return false;
        }

        let original = self.original.to_lowercase();
        let translated = self.translated.to_lowercase();

        glossary.entries_for(language).any(|(source, rendering)| {
            !source.is_empty()
                && original.contains(&source.to_lowercase())
                && translated.contains(&rendering.to_lowercase())
        })
    }

    fn to_hint(&self) -> ImprovementHint {
        ImprovementHint::new(&self.original, &self.translated, &self.reason)
    }
}

/// Parse a service answer of the form `{"issues": [...]}`
pub fn parse_issues(text: &str) -> Result<Vec<ValidationIssue>, ProviderError> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| ProviderError::ParseError(format!("Validation response is not JSON: {}", e)))?;

    Ok(value
        .get("issues")
        .and_then(Value::as_array)
        .map(|issues| issues.iter().map(ValidationIssue::from_value).collect())
        .unwrap_or_default())
}

/// Drop glossary false positives and incomplete issues
pub fn filter_issues(issues: Vec<ValidationIssue>, glossary: &Glossary, language: &str) -> Vec<ValidationIssue> {
    issues
        .into_iter()
        .filter(|issue| {
            if issue.is_incomplete() {
                debug!("Dropping incomplete issue: {:?}", issue);
                return false;
            }
            if issue.is_glossary_false_positive(glossary, language) {
                info!("Filtered glossary false positive: '{}' -> '{}'", issue.original, issue.translated);
                return false;
            }
            true
        })
        .collect()
}

/// Per-language validation report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub language: String,
    pub total_files: usize,
    pub total_issues: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new(language: &str, total_files: usize, issues: Vec<ValidationIssue>) -> Self {
        Self {
            language: language.to_string(),
            total_files,
            total_issues: issues.len(),
            issues,
        }
    }

    /// `validation_report_<lang>.json` in the working directory
    pub fn default_path(language: &str) -> PathBuf {
        PathBuf::from(format!("validation_report_{}.json", language))
    }

    /// Write the report as pretty-printed JSON
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize validation report")?;
        FileManager::write_to_file(&path, &json)?;
        info!("Validation report saved to {:?} ({} issues)", path.as_ref(), self.total_issues);
        Ok(())
    }
}

/// A translated document and its original
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPair {
    pub original: PathBuf,
    pub translated: PathBuf,
}

/// Checks finished translations and learns improvement hints from them
#[derive(Debug)]
pub struct Validator {
    provider: Arc<dyn Provider>,
    glossary: Arc<Glossary>,
    hints: Arc<HintStore>,
    config: Config,
    usage: TokenUsageStats,
}

impl Validator {
    pub fn new(provider: Arc<dyn Provider>, glossary: Arc<Glossary>, hints: Arc<HintStore>, config: Config) -> Self {
        Self {
            provider,
            glossary,
            hints,
            config,
            usage: TokenUsageStats::new(),
        }
    }

    pub fn usage(&self) -> &TokenUsageStats {
        &self.usage
    }

    fn language_names(&self, language: &str) -> (String, String) {
        let source = &self.config.general.source_language;
        (
            language_utils::get_language_name(source).unwrap_or_else(|_| source.clone()),
            language_utils::get_language_name(language).unwrap_or_else(|_| language.to_string()),
        )
    }

    /// Instruction for validating translations into `language`
    pub fn system_prompt(&self, language: &str) -> String {
        let (source_name, target_name) = self.language_names(language);
        format!(
            "{}\n{}\n\n{}",
            self.config.get_validation_prompt(language),
            glossary_section(self.glossary.entries_for(language), &source_name, &target_name),
            PromptTemplate::VALIDATION_REMINDER
        )
    }

    /// Translated documents under `<output_dir>/<language>` with an original in `input_dir`
    pub fn pairs(input_dir: &Path, output_dir: &Path, language: &str) -> Result<Vec<ValidationPair>> {
        let translated_root = output_dir.join(language);
        if !FileManager::dir_exists(&translated_root) {
            return Err(anyhow!("Translated directory does not exist: {:?}", translated_root));
        }

        let pairs = FileManager::list_relative_files(&translated_root)?
            .into_iter()
            .filter(|relative| FileManager::is_document_file(relative))
            .filter_map(|relative| {
                let original = input_dir.join(&relative);
                if FileManager::file_exists(&original) {
                    Some(ValidationPair {
                        original,
                        translated: translated_root.join(&relative),
                    })
                } else {
                    debug!("No original for {:?}, skipping", relative);
                    None
                }
            })
            .collect();
        Ok(pairs)
    }

    /// Validate one original/translation pair and return the accepted issues
    pub async fn validate_text(
        &self,
        original: &str,
        translated: &str,
        language: &str,
        file_path: &str,
    ) -> Result<Vec<ValidationIssue>, ProviderError> {
        let (source_name, target_name) = self.language_names(language);
        let request = CompletionRequest::new(
            self.system_prompt(language),
            validation_user_message(original, translated, &source_name, &target_name, file_path),
        )
        .json()
        .max_tokens(VALIDATION_MAX_TOKENS);

        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                self.usage.record_failure();
                return Err(e);
            }
        };
        self.usage.record(&response.usage);
        debug!("Validation of {} used {} tokens", file_path, response.usage.total());

        let issues = filter_issues(parse_issues(&response.text)?, &self.glossary, language);
        Ok(issues
            .into_iter()
            .map(|issue| ValidationIssue {
                file_path: file_path.to_string(),
                ..issue
            })
            .collect())
    }

    async fn validate_pair(&self, pair: &ValidationPair, language: &str) -> Result<Vec<ValidationIssue>> {
        let original = FileManager::read_to_string(&pair.original)?;
        let translated = FileManager::read_to_string(&pair.translated)?;
        let file_path = pair.translated.display().to_string();
        info!("[{}] Validating {}", language, file_path);
        Ok(self.validate_text(&original, &translated, language, &file_path).await?)
    }

    /// Validate every translated document of one language.
    ///
    /// Files whose validation fails are logged and left out of the report.
    /// Accepted issues are appended to the hint store.
    pub async fn validate_language(&self, input_dir: &Path, output_dir: &Path, language: &str) -> Result<ValidationReport> {
        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Original directory does not exist: {:?}", input_dir));
        }
        let pairs = Self::pairs(input_dir, output_dir, language)?;
        info!("[{}] Validating {} documents", language, pairs.len());

        let workers = self.config.general.max_workers.max(1);
        let mut results: Vec<(usize, Result<Vec<ValidationIssue>>)> = stream::iter(pairs.iter().enumerate())
            .map(|(index, pair)| async move { (index, self.validate_pair(pair, language).await) })
            .buffer_unordered(workers)
            .collect()
            .await;
        results.sort_by_key(|(index, _)| *index);

        let mut validated = 0;
        let mut issues = Vec::new();
        for (index, result) in results {
            match result {
                Ok(found) => {
                    validated += 1;
                    issues.extend(found);
                }
                Err(e) => error!("[{}] Validation of {:?} failed: {:#}", language, pairs[index].translated, e),
            }
        }

        let mut added = 0;
        for issue in &issues {
            match self.hints.append(language, issue.to_hint()) {
                Ok(AppendOutcome::Added) => added += 1,
                Ok(_) => {}
                Err(e) => warn!("[{}] Failed to store improvement hint: {:#}", language, e),
            }
        }

        info!(
            "[{}] Validated {} files, {} issues, {} new hints, {}",
            language,
            validated,
            issues.len(),
            added,
            self.usage.summary()
        );
        Ok(ValidationReport::new(language, validated, issues))
    }
}
