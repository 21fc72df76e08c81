/*!
 * Document translation using a text-generation service.
 *
 * This module contains the per-document pipeline pieces. It is split into
 * several submodules:
 *
 * - `segmenter`: Structure-aware splitting of bodies into bounded segments
 * - `frontmatter`: Metadata block extraction, translation and restoration
 * - `glossary`: Static term glossary
 * - `context`: Per-document term consistency state
 * - `core`: The per-language `Translator` and token accounting
 * - `formatting`: Cleanup of service responses
 * - `prompts`: Instruction templates and builders
 * - `hints`: Improvement hints learned from validation
 * - `similarity`: Fuzzy text similarity for hint deduplication
 */

// Re-export main types for easier usage
pub use self::context::ConsistencyContext;
pub use self::core::{SegmentOutcome, TokenUsageSnapshot, TokenUsageStats, Translator};
pub use self::frontmatter::{Document, FieldTranslator, MetadataOutcome};
pub use self::glossary::Glossary;
pub use self::hints::{HintStore, ImprovementHint};
pub use self::segmenter::{CharRatioEstimator, CostEstimator, Segment, Segmenter};

// Submodules
pub mod context;
pub mod core;
pub mod formatting;
pub mod frontmatter;
pub mod glossary;
pub mod hints;
pub mod prompts;
pub mod segmenter;
pub mod similarity;
