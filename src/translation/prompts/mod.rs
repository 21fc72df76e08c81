/*!
 * Prompt engineering for document translation.
 *
 * This module provides:
 * - Instruction templates for segments, metadata fields and validation
 * - `TranslationPromptBuilder`, which assembles the effective instruction
 *   from the base prompt, glossary, per-document terms and learned hints
 */

pub mod templates;

// Re-export main types
pub use templates::{
    PromptTemplate, glossary_section, seen_terms_section, validation_user_message,
};

/// Builder for the effective translation instruction.
///
/// Sections are appended in a fixed order: base prompt, glossary excerpt,
/// renderings already used in this document, then improvement hints.
#[derive(Debug, Clone, Default)]
pub struct TranslationPromptBuilder {
    base_prompt: String,
    glossary: String,
    seen_terms: String,
    hints: String,
}

impl TranslationPromptBuilder {
    /// Create a new prompt builder.
    pub fn new(base_prompt: &str) -> Self {
        Self {
            base_prompt: base_prompt.to_string(),
            ..Self::default()
        }
    }

    /// Set the glossary excerpt.
    pub fn with_glossary(mut self, section: &str) -> Self {
        self.glossary = section.to_string();
        self
    }

    /// Set the renderings already used in this document.
    pub fn with_seen_terms(mut self, seen: &[(String, String)]) -> Self {
        self.seen_terms = seen_terms_section(seen);
        self
    }

    /// Set the improvement hints section.
    pub fn with_hints(mut self, hints: &str) -> Self {
        self.hints = hints.to_string();
        self
    }

    /// Assemble the instruction.
    pub fn build(&self) -> String {
        let mut prompt = String::with_capacity(
            self.base_prompt.len() + self.glossary.len() + self.seen_terms.len() + self.hints.len(),
        );
        prompt.push_str(&self.base_prompt);
        prompt.push_str(&self.glossary);
        prompt.push_str(&self.seen_terms);
        prompt.push_str(&self.hints);
        prompt
    }
}
