/*!
 * Per-document term consistency state.
 *
 * A fresh context is created for every document and threaded through its
 * segment translations in order. Terms rendered in earlier segments are
 * repeated in the instruction for later ones.
 */

/// State carried from one segment of a document to the next
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyContext {
    /// `(source_term, rendering)` pairs in first-seen order
    seen_terms: Vec<(String, String)>,
    /// Number of segments processed so far
    pub segment_index: usize,
    /// Service tokens spent on this document
    pub cumulative_cost: u64,
}

impl ConsistencyContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rendering unless the term was already seen
    pub fn record_term(&mut self, source: &str, rendering: &str) {
        if !self.seen_terms.iter().any(|(s, _)| s == source) {
            self.seen_terms.push((source.to_string(), rendering.to_string()));
        }
    }

    pub fn seen_terms(&self) -> &[(String, String)] {
        &self.seen_terms
    }

    pub fn rendering_of(&self, source: &str) -> Option<&str> {
        self.seen_terms
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, r)| r.as_str())
    }

    /// Account for one processed segment
    pub fn advance(&mut self, tokens: u64) {
        self.segment_index += 1;
        self.cumulative_cost += tokens;
    }
}
