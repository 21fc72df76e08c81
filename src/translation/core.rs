/*!
 * Core translation unit.
 *
 * A `Translator` is bound to one target language. It issues exactly one
 * service call per segment or metadata field, assembles the instruction from
 * the base prompt, glossary, per-document terms and improvement hints, and
 * accounts for the tokens spent. Jobs for the same language run
 * concurrently, so the counters are atomic.
 */

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{CompletionRequest, Provider, TokenUsage};
use crate::translation::context::ConsistencyContext;
use crate::translation::formatting::clean_response;
use crate::translation::frontmatter::FieldTranslator;
use crate::translation::glossary::Glossary;
use crate::translation::prompts::{PromptTemplate, TranslationPromptBuilder, glossary_section};

/// Token usage statistics for tracking API consumption
#[derive(Debug)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    prompt_tokens: AtomicU64,

    /// Number of completion tokens
    completion_tokens: AtomicU64,

    /// Number of successful requests
    requests: AtomicU64,

    /// Number of failed requests
    failures: AtomicU64,

    /// Start time of token tracking
    start_time: Instant,
}

/// Point-in-time copy of `TokenUsageStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsageSnapshot {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub requests: u64,
    pub failures: u64,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenUsageStats {
    /// Create a new empty token usage stats instance
    pub fn new() -> Self {
        Self {
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Add the usage of one successful request
    pub fn record(&self, usage: &TokenUsage) {
        self.prompt_tokens.fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens.fetch_add(usage.completion_tokens, Ordering::Relaxed);
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one failed request
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TokenUsageSnapshot {
        let prompt_tokens = self.prompt_tokens.load(Ordering::Relaxed);
        let completion_tokens = self.completion_tokens.load(Ordering::Relaxed);
        TokenUsageSnapshot {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            requests: self.requests.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Calculate tokens per minute since tracking started
    pub fn tokens_per_minute(&self) -> f64 {
        let minutes = self.start_time.elapsed().as_secs_f64() / 60.0;
        if minutes > 0.0 {
            self.snapshot().total_tokens as f64 / minutes
        } else {
            0.0
        }
    }

    /// Generate a one-line summary of token usage
    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "{} tokens ({} prompt, {} completion) over {} requests, {} failed, {:.0} tokens/min",
            s.total_tokens,
            s.prompt_tokens,
            s.completion_tokens,
            s.requests,
            s.failures,
            self.tokens_per_minute()
        )
    }
}

/// Result of translating one segment
#[derive(Debug)]
pub enum SegmentOutcome {
    /// The service answered; `text` is the cleaned response
    Translated { text: String, tokens: u64 },
    /// The service failed; the original text should be shipped instead
    Failed { original: String, cause: ProviderError },
}

impl SegmentOutcome {
    /// Text to write: the translation, or the original on failure
    pub fn text(&self) -> &str {
        match self {
            SegmentOutcome::Translated { text, .. } => text,
            SegmentOutcome::Failed { original, .. } => original,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            SegmentOutcome::Translated { text, .. } => text,
            SegmentOutcome::Failed { original, .. } => original,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SegmentOutcome::Failed { .. })
    }
}

/// Translation unit for one target language
#[derive(Debug)]
pub struct Translator {
    provider: Arc<dyn Provider>,
    glossary: Arc<Glossary>,
    target_language: String,
    source_language_name: String,
    target_language_name: String,
    /// Glossary excerpt for the target language, built once
    glossary_section: String,
    /// Improvement hints captured when the translator was created
    hints_section: String,
    usage: TokenUsageStats,
}

impl Translator {
    /// Create a translator for one target language
    pub fn new(
        provider: Arc<dyn Provider>,
        glossary: Arc<Glossary>,
        source_language: &str,
        target_language: &str,
    ) -> Self {
        let source_language_name = language_utils::get_language_name(source_language)
            .unwrap_or_else(|_| source_language.to_string());
        let target_language_name = language_utils::get_language_name(target_language)
            .unwrap_or_else(|_| target_language.to_string());
        let glossary_section = glossary_section(
            glossary.entries_for(target_language),
            &source_language_name,
            &target_language_name,
        );

        Self {
            provider,
            glossary,
            target_language: target_language.to_string(),
            source_language_name,
            target_language_name,
            glossary_section,
            hints_section: String::new(),
            usage: TokenUsageStats::new(),
        }
    }

    /// Attach the improvement hints section
    pub fn with_hints(mut self, hints_section: String) -> Self {
        self.hints_section = hints_section;
        self
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub fn usage(&self) -> &TokenUsageStats {
        &self.usage
    }

    /// Assemble the instruction for a segment of the current document
    pub fn effective_prompt(&self, base_prompt: &str, context: &ConsistencyContext) -> String {
        TranslationPromptBuilder::new(base_prompt)
            .with_glossary(&self.glossary_section)
            .with_seen_terms(context.seen_terms())
            .with_hints(&self.hints_section)
            .build()
    }

    async fn call(&self, instruction: String, text: &str) -> Result<(String, TokenUsage), ProviderError> {
        let request = CompletionRequest::new(instruction, text);
        match self.provider.complete(request).await {
            Ok(response) => {
                self.usage.record(&response.usage);
                Ok((clean_response(text, &response.text), response.usage))
            }
            Err(e) => {
                self.usage.record_failure();
                Err(e)
            }
        }
    }

    /// Translate one segment of a document.
    ///
    /// Glossary terms found in the segment are recorded in `context` so later
    /// segments repeat the same renderings.
    pub async fn translate_segment(
        &self,
        text: &str,
        base_prompt: &str,
        context: &mut ConsistencyContext,
    ) -> SegmentOutcome {
        let instruction = self.effective_prompt(base_prompt, context);
        debug!(
            "[{}] Translating segment {} ({} chars)",
            self.target_language,
            context.segment_index + 1,
            text.chars().count()
        );

        match self.call(instruction, text).await {
            Ok((translated, usage)) => {
                for (source, rendering) in self.glossary.terms_in(text, &self.target_language) {
                    context.record_term(source, rendering);
                }
                context.advance(usage.total());
                SegmentOutcome::Translated {
                    text: translated,
                    tokens: usage.total(),
                }
            }
            Err(cause) => {
                context.advance(0);
                SegmentOutcome::Failed {
                    original: text.to_string(),
                    cause,
                }
            }
        }
    }

    /// Instruction used for metadata fields
    pub fn field_prompt(&self) -> String {
        let base = PromptTemplate::field_translator()
            .render(&self.source_language_name, &self.target_language_name);
        TranslationPromptBuilder::new(&base)
            .with_glossary(&self.glossary_section)
            .with_hints(&self.hints_section)
            .build()
    }
}

#[async_trait]
impl FieldTranslator for Translator {
    async fn translate_field(&self, value: &str) -> Result<String, ProviderError> {
        self.call(self.field_prompt(), value).await.map(|(text, _)| text)
    }
}
