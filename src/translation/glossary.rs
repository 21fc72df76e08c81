/*!
 * Static term glossary.
 *
 * The glossary maps a source-language term to its rendering in each target
 * language. It is loaded once per run and shared read-only by every job.
 *
 * File format:
 *
 * ```yaml
 * terms:
 *   узел:
 *     en: node
 *     es: nodo
 * ```
 */

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Term map: `source_term -> { language_code -> translated_term }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Glossary {
    #[serde(default)]
    terms: BTreeMap<String, BTreeMap<String, String>>,
}

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the rendering of a term for one language
    pub fn insert(&mut self, source: impl Into<String>, language: impl Into<String>, target: impl Into<String>) {
        self.terms
            .entry(source.into())
            .or_default()
            .insert(language.into(), target.into());
    }

    /// Builder variant of `insert`
    pub fn with_term(mut self, source: &str, language: &str, target: &str) -> Self {
        self.insert(source, language, target);
        self
    }

    /// Parse a glossary from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a glossary file, falling back to an empty glossary with a warning
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let loaded = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open glossary: {}", path.display()))
            .and_then(|content| {
                Self::from_yaml_str(&content)
                    .with_context(|| format!("Failed to parse glossary: {}", path.display()))
            });

        match loaded {
            Ok(glossary) => {
                info!("Loaded glossary with {} terms from {}", glossary.len(), path.display());
                glossary
            }
            Err(e) => {
                warn!("{:#}. Continuing without a glossary.", e);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Rendering of one term in a language
    pub fn rendering(&self, term: &str, language: &str) -> Option<&str> {
        self.terms
            .get(term)
            .and_then(|t| t.get(language))
            .map(String::as_str)
    }

    /// Every `(source, rendering)` pair known for a language
    pub fn entries_for<'a>(&'a self, language: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.terms.iter().filter_map(move |(source, renderings)| {
            renderings
                .get(language)
                .map(|target| (source.as_str(), target.as_str()))
        })
    }

    /// Pairs whose source term occurs in `text`
    pub fn terms_in<'a>(&'a self, text: &'a str, language: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.entries_for(language)
            .filter(move |(source, _)| !source.is_empty() && text.contains(source))
    }
}
