/*!
 * Property tests for body segmentation
 */

use proptest::prelude::*;

use doclingo::translation::segmenter::{Segmenter, join_segments};

/// A short run of lowercase words
fn words() -> impl Strategy<Value = String> {
    "[a-z]{1,8}( [a-z]{1,8}){0,4}"
}

/// One markdown block: heading, paragraph, list, code fence or table
fn block() -> impl Strategy<Value = String> {
    prop_oneof![
        words().prop_map(|w| format!("# {}", w)),
        words(),
        prop::collection::vec(words(), 1..4).prop_map(|items| {
            items
                .iter()
                .map(|item| format!("- {}", item))
                .collect::<Vec<_>>()
                .join("\n\n")
        }),
        (words(), words()).prop_map(|(a, b)| format!("```\n{}\n\n# {}\n```", a, b)),
        (words(), words()).prop_map(|(a, b)| format!("| {} | {} |\n|---|---|\n| {} | {} |", a, b, b, a)),
    ]
}

fn document() -> impl Strategy<Value = (Vec<String>, String)> {
    prop::collection::vec(block(), 1..30).prop_map(|blocks| {
        let body = blocks.join("\n\n");
        (blocks, body)
    })
}

fn is_atomic(block: &str) -> bool {
    block.starts_with("```") || block.starts_with('|')
}

proptest! {
    #[test]
    fn segments_fit_budget_when_every_block_fits((_, body) in document(), budget in 60usize..300) {
        let segmenter = Segmenter::new(budget);
        for segment in segmenter.split(&body) {
            prop_assert!(segment.cost <= budget, "cost {} over budget {}: {:?}", segment.cost, budget, segment.text);
            prop_assert_eq!(segment.cost, segmenter.cost(&segment.text));
        }
    }

    #[test]
    fn fences_and_tables_are_never_split((blocks, body) in document(), budget in 60usize..300) {
        let segments = Segmenter::new(budget).split(&body);
        for block in blocks.iter().filter(|b| is_atomic(b)) {
            prop_assert!(
                segments.iter().any(|s| s.text.contains(block.as_str())),
                "block split across segments: {:?}", block
            );
        }
        for segment in &segments {
            prop_assert_eq!(segment.text.matches("```").count() % 2, 0);
        }
    }

    #[test]
    fn identity_translation_reassembles_body((_, body) in document(), budget in 60usize..300) {
        let segments = Segmenter::new(budget).split(&body);
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        prop_assert_eq!(join_segments(&texts), body);
    }
}

#[test]
fn test_split_singleOversizedParagraph_shouldBeOneSegment() {
    let body = "x".repeat(1000);
    let segments = Segmenter::new(50).split(&body);
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].cost, 250);
}

#[test]
fn test_split_oversizedListOfItems_shouldSplitBetweenItems() {
    let body = (0..10)
        .map(|i| format!("- item {} {}", i, "l".repeat(30)))
        .collect::<Vec<_>>()
        .join("\n\n");
    let segments = Segmenter::new(25).split(&body);

    assert!(segments.len() > 1);
    for segment in &segments {
        assert!(segment.cost <= 25);
        assert!(segment.text.starts_with("- item"));
    }
}
