/*!
 * Secondary validation of finished translations.
 *
 * Original/translation pairs are sent back to the text-generation service,
 * which reports serious mistakes as JSON. Reported issues are filtered for
 * glossary false positives and fragments too short to be useful, written to
 * a per-language report, and stored as improvement hints for later runs.
 *
 * # Architecture
 *
 * - `service`: Issue parsing, filtering and the `Validator` itself
 */

pub mod service;

// Re-export main types
pub use service::{ValidationIssue, ValidationReport, Validator};
