/*!
 * Document metadata (frontmatter) handling.
 *
 * A document may open with a YAML block delimited by `---` lines. The block
 * is split off before segmentation, translated value by value, and put back
 * in front of the translated body. Local-only regions are removed before any
 * of this happens.
 */

use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::errors::{DocumentError, ProviderError};
use crate::translation::formatting::clean_field_value;

const MARKER: &str = "---";

/// `{/* LOCAL TEXT START */}` ... `{/* LOCAL TEXT END */}`, possibly spanning lines
static LOCAL_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\{\s*/\*\s*LOCAL TEXT START\s*\*/\s*\}(.*?)\{\s*/\*\s*LOCAL TEXT END\s*\*/\s*\}")
        .unwrap()
});

/// A document split into its metadata block and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Input text after local-only regions were removed
    pub raw_text: String,
    /// Metadata block including both `---` markers
    pub frontmatter: Option<String>,
    /// Everything after the metadata block, trimmed
    pub body: String,
}

impl Document {
    pub fn has_frontmatter(&self) -> bool {
        self.frontmatter.is_some()
    }
}

/// Remove local-only regions
pub fn strip_local_blocks(text: &str) -> String {
    LOCAL_BLOCK_REGEX.replace_all(text, "").into_owned()
}

/// Split a document into metadata block and body.
///
/// The block runs from the leading `---` up to and including the next `---`.
/// Without both markers the whole text is the body.
pub fn extract(text: &str) -> Document {
    if let Some(rest) = text.strip_prefix(MARKER) {
        if let Some(pos) = rest.find(MARKER) {
            let end = MARKER.len() + pos + MARKER.len();
            return Document {
                raw_text: text.to_string(),
                frontmatter: Some(text[..end].to_string()),
                body: text[end..].trim().to_string(),
            };
        }
    }

    Document {
        raw_text: text.to_string(),
        frontmatter: None,
        body: text.to_string(),
    }
}

/// Put a metadata block back in front of a body
pub fn restore(frontmatter: Option<&str>, body: &str) -> String {
    match frontmatter {
        Some(block) => format!("{}\n\n{}", block, body),
        None => body.to_string(),
    }
}

/// Translates a single metadata value
#[async_trait]
pub trait FieldTranslator: Send + Sync {
    async fn translate_field(&self, value: &str) -> Result<String, ProviderError>;
}

/// A metadata value that kept its original text because translation failed
#[derive(Debug)]
pub struct FieldError {
    pub key: String,
    pub cause: ProviderError,
}

/// Result of translating a metadata block
#[derive(Debug)]
pub struct MetadataOutcome {
    /// Block to write, including markers
    pub block: String,
    /// Fields that could not be translated
    pub field_errors: Vec<FieldError>,
    /// Set when the block was returned unmodified because it could not be parsed
    pub structural_error: Option<DocumentError>,
}

impl MetadataOutcome {
    fn unchanged(block: &str, error: DocumentError) -> Self {
        Self {
            block: block.to_string(),
            field_errors: Vec::new(),
            structural_error: Some(error),
        }
    }
}

fn parse_block(block: &str) -> Result<Mapping, DocumentError> {
    let inner = block
        .trim()
        .strip_prefix(MARKER)
        .and_then(|s| s.strip_suffix(MARKER))
        .unwrap_or(block);

    let value: Value = serde_yaml::from_str(inner)
        .map_err(|e| DocumentError::MalformedMetadata(e.to_string()))?;

    match value {
        Value::Mapping(mapping) if !mapping.is_empty() => Ok(mapping),
        _ => Err(DocumentError::NotAMapping),
    }
}

fn key_label(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Translate every non-empty string value of a metadata block.
///
/// Keys, key order and non-string values are kept. Each value is translated
/// by its own call; a failing value keeps its original text. A block that is
/// not a YAML mapping is returned unmodified.
pub async fn translate_metadata<T>(block: &str, translator: &T) -> MetadataOutcome
where
    T: FieldTranslator + ?Sized,
{
    let mapping = match parse_block(block) {
        Ok(mapping) => mapping,
        Err(e) => {
            warn!("Leaving metadata block unchanged: {}", e);
            return MetadataOutcome::unchanged(block, e);
        }
    };

    let mut translated = Mapping::with_capacity(mapping.len());
    let mut field_errors = Vec::new();

    for (key, value) in mapping {
        let new_value = match &value {
            Value::String(text) if !text.trim().is_empty() => {
                debug!("Translating metadata field: {}", key_label(&key));
                match translator.translate_field(text).await {
                    Ok(result) => Value::String(clean_field_value(&result)),
                    Err(cause) => {
                        field_errors.push(FieldError {
                            key: key_label(&key),
                            cause,
                        });
                        value.clone()
                    }
                }
            }
            _ => value.clone(),
        };
        translated.insert(key, new_value);
    }

    match serde_yaml::to_string(&translated) {
        Ok(yaml) => MetadataOutcome {
            block: format!("{}\n{}{}", MARKER, yaml, MARKER),
            field_errors,
            structural_error: None,
        },
        Err(e) => MetadataOutcome::unchanged(block, DocumentError::Serialization(e.to_string())),
    }
}
