/*!
 * Tests for metadata block extraction and restoration
 */

use proptest::prelude::*;

use doclingo::translation::frontmatter::{extract, restore, strip_local_blocks};

fn metadata_block() -> impl Strategy<Value = String> {
    prop::collection::vec(("[a-z]{1,8}", "[a-zA-Z][a-zA-Z ]{0,20}[a-zA-Z]"), 1..6).prop_map(|fields| {
        let lines: Vec<String> = fields
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect();
        format!("---\n{}\n---", lines.join("\n"))
    })
}

fn body() -> impl Strategy<Value = String> {
    "[a-zA-Z#][a-zA-Z0-9 .,\n]{0,200}[a-zA-Z0-9.]"
}

proptest! {
    #[test]
    fn restore_then_extract_returns_same_parts(block in metadata_block(), body in body()) {
        let text = restore(Some(&block), &body);
        let document = extract(&text);
        prop_assert_eq!(document.frontmatter.as_deref(), Some(block.as_str()));
        prop_assert_eq!(document.body, body);
    }

    #[test]
    fn extract_without_frontmatter_keeps_text(body in body()) {
        let document = extract(&body);
        prop_assert!(!document.has_frontmatter());
        prop_assert_eq!(document.body, body);
    }
}

#[test]
fn test_stripLocalBlocks_withSeveralRegions_shouldRemoveAll() {
    let text = "a{/* LOCAL TEXT START */}x{/* LOCAL TEXT END */}b{/*Local Text Start*/}\ny\n{/*Local Text End*/}c";
    assert_eq!(strip_local_blocks(text), "abc");
}

#[test]
fn test_extract_afterStripping_shouldNotSeeLocalContent() {
    let text = "---\ntitle: T\n---\n\n{/* LOCAL TEXT START */}\nonly here\n{/* LOCAL TEXT END */}\n\nBody";
    let document = extract(&strip_local_blocks(text));
    assert_eq!(document.body, "Body");
    assert!(!document.raw_text.contains("only here"));
}
