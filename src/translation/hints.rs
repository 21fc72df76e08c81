/*!
 * Improvement hints learned from validation.
 *
 * Issues accepted by the validator are stored per target language in
 * `<hints_dir>/prompt_improvements_<lang>.json` and the most recent ones
 * are appended to the translation instruction of later runs.
 */

use anyhow::{Context, Result};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::file_utils::FileManager;
use crate::translation::similarity::similarity;

/// Number of hints included in an instruction
pub const RECENT_HINTS: usize = 10;

const REASON_SIMILARITY_THRESHOLD: f64 = 0.7;
const TEXT_SIMILARITY_THRESHOLD: f64 = 0.6;

/// A past translation mistake to avoid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImprovementHint {
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub translated: String,
    #[serde(default)]
    pub reason: String,
}

impl ImprovementHint {
    pub fn new(original: &str, translated: &str, reason: &str) -> Self {
        Self {
            original: original.trim().to_string(),
            translated: translated.trim().to_string(),
            reason: reason.trim().to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.original.trim().is_empty()
            && !self.translated.trim().is_empty()
            && !self.reason.trim().is_empty()
    }

    /// Whether this hint restates `other`
    fn duplicates(&self, other: &ImprovementHint) -> bool {
        if self.original == other.original.trim() && self.translated == other.translated.trim() {
            return true;
        }

        let reason = similarity(&self.reason.to_lowercase(), &other.reason.trim().to_lowercase());
        if reason <= REASON_SIMILARITY_THRESHOLD {
            return false;
        }
        let original = similarity(&self.original.to_lowercase(), &other.original.trim().to_lowercase());
        let translated = similarity(&self.translated.to_lowercase(), &other.translated.trim().to_lowercase());
        original > TEXT_SIMILARITY_THRESHOLD || translated > TEXT_SIMILARITY_THRESHOLD
    }
}

/// Result of offering a hint to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Added,
    Duplicate,
    Incomplete,
}

/// File-backed hint store, one JSON array per language
#[derive(Debug)]
pub struct HintStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles between concurrent validators
    write_lock: Mutex<()>,
}

impl HintStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path_for(&self, language: &str) -> PathBuf {
        self.dir.join(format!("prompt_improvements_{}.json", language))
    }

    /// All stored hints for a language; a missing or unreadable file yields none
    pub fn load(&self, language: &str) -> Vec<ImprovementHint> {
        let path = self.path_for(language);
        if !FileManager::file_exists(&path) {
            debug!("No improvement hints at {}", path.display());
            return Vec::new();
        }

        match self.read(&path) {
            Ok(hints) => hints,
            Err(e) => {
                warn!("Ignoring improvement hints: {:#}", e);
                Vec::new()
            }
        }
    }

    fn read(&self, path: &Path) -> Result<Vec<ImprovementHint>> {
        let content = FileManager::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Malformed hint file: {}", path.display()))
    }

    /// The most recent complete hints, oldest first
    pub fn recent(&self, language: &str, limit: usize) -> Vec<ImprovementHint> {
        let hints = self.load(language);
        let start = hints.len().saturating_sub(limit);
        hints
            .into_iter()
            .skip(start)
            .filter(ImprovementHint::is_complete)
            .collect()
    }

    /// Instruction text listing recent hints, empty when there are none
    pub fn prompt_section(&self, language: &str) -> String {
        let hints = self.recent(language, RECENT_HINTS);
        if hints.is_empty() {
            return String::new();
        }
        info!("Applying {} improvement hints for '{}'", hints.len(), language);
        render_hints(&hints)
    }

    /// Store a hint unless it is incomplete or restates an existing one
    pub fn append(&self, language: &str, hint: ImprovementHint) -> Result<AppendOutcome> {
        let hint = ImprovementHint::new(&hint.original, &hint.translated, &hint.reason);
        if !hint.is_complete() {
            return Ok(AppendOutcome::Incomplete);
        }

        let _guard = self.write_lock.lock();
        let path = self.path_for(language);
        let mut hints = if FileManager::file_exists(&path) {
            self.read(&path)?
        } else {
            Vec::new()
        };

        if hints.iter().any(|existing| hint.duplicates(existing)) {
            debug!("Skipping duplicate improvement hint for '{}'", language);
            return Ok(AppendOutcome::Duplicate);
        }

        hints.push(hint);
        let json = serde_json::to_string_pretty(&hints)?;
        FileManager::write_to_file(&path, &json)?;
        info!("Added improvement hint for '{}'", language);

        Ok(AppendOutcome::Added)
    }
}

/// Render hints as a numbered instruction section
pub fn render_hints(hints: &[ImprovementHint]) -> String {
    let mut section =
        String::from("\n\nBased on previous translation issues, pay special attention to these cases:\n");
    for (idx, hint) in hints.iter().enumerate() {
        section.push_str(&format!("{}. Issue: {}\n", idx + 1, hint.reason));
        section.push_str(&format!("   Original: {}\n", hint.original));
        section.push_str(&format!("   Incorrect translation: {}\n", hint.translated));
        section.push_str("   Avoid this mistake.\n\n");
    }
    section
}
