/*!
 * Structure-aware splitting of markdown bodies into size-bounded segments.
 *
 * The service accepts a limited amount of text per request, so a document
 * body is cut into segments that each fit a cost budget. Cuts are placed
 * between markdown sections where possible, and never inside a fenced code
 * block or a table. Lists are kept whole unless a list alone is over budget.
 *
 * Line scanning is driven by `BlockState`:
 *
 * | state     | trigger                                   | next state |
 * |-----------|-------------------------------------------|------------|
 * | any       | trimmed line starts with ```` ``` ````    | `InFence` (or `Plain` when leaving a fence) |
 * | `Plain`, `InList` | table line (`|` ... `|`)          | `InTable`  |
 * | `Plain`, `InList` | list item line                    | `InList`   |
 * | `InTable` | blank line                                | `Plain`    |
 * | `InList`  | blank line not followed by a list item    | `Plain`    |
 *
 * Headings are only evaluated for lines scanned entirely in `Plain`.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Debug;
use std::sync::Arc;

/// Separator placed between packed sections and between translated segments
pub const SEGMENT_SEPARATOR: &str = "\n\n";

/// Default segment budget in cost units
pub const DEFAULT_BUDGET: usize = 8000;

static HEADING_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());

static LIST_ITEM_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([-*+]|\d+[.)])\s").unwrap());

/// Estimates how much of the service's request budget a text uses
pub trait CostEstimator: Send + Sync + Debug {
    fn cost(&self, text: &str) -> usize;
}

/// Character-count proxy: one cost unit per `chars_per_unit` characters, rounded up
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    pub chars_per_unit: usize,
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self { chars_per_unit: 4 }
    }
}

impl CostEstimator for CharRatioEstimator {
    fn cost(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_unit.max(1))
    }
}

/// A slice of a document body submitted as one translation unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub cost: usize,
}

/// Scanner state for one line of markdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Plain,
    InFence,
    InTable,
    InList,
}

impl BlockState {
    /// State after consuming `line`; `next` is the following line, if any
    pub fn step(self, line: &str, next: Option<&str>) -> BlockState {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            return if self == BlockState::InFence {
                BlockState::Plain
            } else {
                BlockState::InFence
            };
        }

        match self {
            BlockState::InFence => BlockState::InFence,
            BlockState::InTable => {
                if trimmed.is_empty() {
                    BlockState::Plain
                } else {
                    BlockState::InTable
                }
            }
            BlockState::Plain | BlockState::InList => {
                if is_table_line(line) {
                    BlockState::InTable
                } else if is_list_line(line) {
                    BlockState::InList
                } else if self == BlockState::InList {
                    if !trimmed.is_empty() || next.is_some_and(is_list_line) {
                        BlockState::InList
                    } else {
                        BlockState::Plain
                    }
                } else {
                    BlockState::Plain
                }
            }
        }
    }
}

fn is_table_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed[1..].contains('|')
}

fn is_list_line(line: &str) -> bool {
    LIST_ITEM_REGEX.is_match(line)
}

/// Heading level (1-6) of a markdown ATX heading line
pub fn heading_level(line: &str) -> Option<usize> {
    HEADING_REGEX
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().len())
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Join translated segments back into a body
pub fn join_segments<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(SEGMENT_SEPARATOR)
}

/// Splits document bodies into segments that fit a cost budget
#[derive(Debug, Clone)]
pub struct Segmenter {
    budget: usize,
    estimator: Arc<dyn CostEstimator>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET)
    }
}

impl Segmenter {
    /// Create a segmenter using the character-ratio estimator
    pub fn new(budget: usize) -> Self {
        Self::with_estimator(budget, Arc::new(CharRatioEstimator::default()))
    }

    /// Create a segmenter with a custom cost estimator
    pub fn with_estimator(budget: usize, estimator: Arc<dyn CostEstimator>) -> Self {
        Self { budget, estimator }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn cost(&self, text: &str) -> usize {
        self.estimator.cost(text)
    }

    /// Split a body into ordered segments.
    ///
    /// Each segment costs at most the budget, unless it is a single block that
    /// cannot be divided further (a code fence, a table, or one paragraph).
    pub fn split(&self, body: &str) -> Vec<Segment> {
        if body.is_empty() {
            return Vec::new();
        }
        if self.cost(body) <= self.budget {
            return vec![self.segment(body.to_string())];
        }

        let mut segments = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for section in self.sections(body) {
            if self.cost(&section) <= self.budget {
                pending.push(section);
                continue;
            }

            self.pack(std::mem::take(&mut pending), &mut segments);

            let mut units = Vec::new();
            for unit in split_units(&section, true) {
                if self.cost(&unit) > self.budget {
                    units.extend(split_units(&unit, false));
                } else {
                    units.push(unit);
                }
            }
            self.pack(units, &mut segments);
        }
        self.pack(pending, &mut segments);

        debug!(
            "Split body into {} segments (budget {}): {:?}",
            segments.len(),
            self.budget,
            segments.iter().map(|s| s.cost).collect::<Vec<_>>()
        );

        segments
    }

    fn segment(&self, text: String) -> Segment {
        let cost = self.cost(&text);
        Segment { text, cost }
    }

    /// Cut a body into heading-delimited sections
    fn sections(&self, body: &str) -> Vec<String> {
        let lines: Vec<&str> = body.split('\n').collect();
        let mut sections = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut level = 0;
        let mut state = BlockState::Plain;

        for (i, line) in lines.iter().enumerate() {
            let previous = state;
            state = previous.step(line, lines.get(i + 1).copied());

            if previous == BlockState::Plain && state == BlockState::Plain {
                if let Some(heading) = heading_level(line) {
                    let has_content = current.iter().any(|l| !is_blank(l));
                    if has_content && (level == 0 || heading <= level) {
                        close_section(&mut current, &mut sections);
                    }
                    level = heading;
                }
            }

            current.push(line);
        }
        close_section(&mut current, &mut sections);

        sections
    }

    /// Greedily pack pieces into segments joined by the separator
    fn pack(&self, pieces: Vec<String>, out: &mut Vec<Segment>) {
        let mut current: Option<String> = None;

        for piece in pieces {
            current = Some(match current.take() {
                None => piece,
                Some(acc) => {
                    let candidate = format!("{}{}{}", acc, SEGMENT_SEPARATOR, piece);
                    if self.cost(&candidate) > self.budget {
                        out.push(self.segment(acc));
                        piece
                    } else {
                        candidate
                    }
                }
            });
        }

        if let Some(acc) = current {
            out.push(self.segment(acc));
        }
    }
}

fn close_section(current: &mut Vec<&str>, sections: &mut Vec<String>) {
    while current.last().is_some_and(|l| is_blank(l)) {
        current.pop();
    }
    if !current.is_empty() {
        sections.push(current.join("\n"));
    }
    current.clear();
}

/// Cut text at blank lines outside fences (and outside lists when `keep_lists`)
fn split_units(text: &str, keep_lists: bool) -> Vec<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut units = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut state = BlockState::Plain;

    for (i, line) in lines.iter().enumerate() {
        state = state.step(line, lines.get(i + 1).copied());

        let splittable = match state {
            BlockState::Plain => true,
            BlockState::InList => !keep_lists,
            BlockState::InFence | BlockState::InTable => false,
        };

        if is_blank(line) && splittable {
            if !current.is_empty() {
                units.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        units.push(current.join("\n"));
    }

    units
}
