/*!
 * Prompt templates for document translation and validation.
 */

/// Instruction template with language placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// Instruction for translating one metadata field.
    pub const FIELD_TRANSLATOR: &'static str = "Translate the following short text from {source_language} to {target_language}.
IMPORTANT: The text is a single field in a YAML frontmatter, so the translation MUST be a SINGLE LINE.
DO NOT add any explanations, quotes, or multiple lines.
DO NOT include the original {source_language} text in your response.
JUST translate the text as concisely as possible.";

    /// Reminder appended to every validation instruction.
    pub const VALIDATION_REMINDER: &'static str = "IMPORTANT: Respond ONLY in JSON format with an `issues` field. Report ONLY serious translation errors. Do NOT report glossary terms that were translated correctly. If there are no errors, return an empty array: {\"issues\": []}.";

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the metadata field template.
    pub fn field_translator() -> Self {
        Self::new(Self::FIELD_TRANSLATOR)
    }

    /// Render the template with the given language names.
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}

/// Glossary excerpt listing every rendering for the target language
pub fn glossary_section<'a, I>(entries: I, source_language: &str, target_language: &str) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut section = format!(
        "\nGlossary of terms ({} -> {}):\n",
        source_language, target_language
    );
    for (source, target) in entries {
        section.push_str(&format!("'{}' -> '{}'\n", source, target));
    }
    section
}

/// Renderings already used earlier in the same document
pub fn seen_terms_section(seen: &[(String, String)]) -> String {
    if seen.is_empty() {
        return String::new();
    }
    let mut section = String::from("\nPrevious term translations in this document:\n");
    for (source, target) in seen {
        section.push_str(&format!("'{}' -> '{}'\n", source, target));
    }
    section
}

/// User message for the validation pass
pub fn validation_user_message(
    original: &str,
    translated: &str,
    source_language: &str,
    target_language: &str,
    file_path: &str,
) -> String {
    format!(
        r#"ORIGINAL TEXT ({source}):
{original}

TRANSLATED TEXT ({target}):
{translated}

Analyze the quality of the translation and find ONLY REAL errors, ignoring stylistic differences.
Return the result STRICTLY in the following JSON format:
{{
  "issues": [
    {{
      "file_path": "{file_path}",
      "original": "the problematic fragment of the original text",
      "translated": "the problematic fragment of the translation",
      "reason": "short reason (at most 1 sentence)"
    }}
  ]
}}

If there are no errors, return:
{{
  "issues": []
}}"#,
        source = source_language,
        target = target_language,
        original = original,
        translated = translated,
        file_path = file_path,
    )
}
