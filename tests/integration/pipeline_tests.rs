/*!
 * End-to-end tests of the document pipeline against a scripted service
 */

use std::fs;
use std::sync::Arc;

use serde_yaml::{Mapping, Value};

use doclingo::app_controller::Controller;
use doclingo::providers::mock::MockProvider;
use doclingo::translation::Glossary;
use doclingo::translation::frontmatter::extract;

use crate::common;

fn metadata(text: &str) -> Mapping {
    let block = extract(text).frontmatter.expect("output should keep its frontmatter");
    let inner = block.trim_start_matches("---").trim_end_matches("---");
    serde_yaml::from_str(inner).unwrap()
}

#[tokio::test]
async fn test_runTree_withFrontmatter_shouldTranslateFieldsAndBody() {
    common::init_test_logger();
    let dir = common::create_temp_dir().unwrap();
    let input = dir.path().join("input");
    common::create_test_file(&input, "guide/intro.md", "---\ntitle: \"Заголовок\"\ncount: 3\n---\n\n# Body").unwrap();

    let provider = MockProvider::uppercase();
    let controller = Controller::with_parts(
        common::test_config(dir.path(), 8000),
        Arc::new(provider.clone()),
        Glossary::new(),
    );

    let summary = controller
        .run_tree(&input, &dir.path().join("output"), &common::languages(&["en"]))
        .await
        .unwrap();

    assert!(!summary.any_failed());
    assert_eq!(provider.call_count(), 2);

    let written = fs::read_to_string(dir.path().join("output/en/guide/intro.md")).unwrap();
    let fields = metadata(&written);
    let keys: Vec<&str> = fields.keys().filter_map(Value::as_str).collect();
    assert_eq!(keys, vec!["title", "count"]);
    assert_eq!(fields.get("title"), Some(&Value::String("ЗАГОЛОВОК".to_string())));
    assert_eq!(fields.get("count"), Some(&Value::Number(3u64.into())));
    assert!(written.ends_with("---\n\n# BODY"));
}

#[tokio::test]
async fn test_runTree_withFailingSecondSegment_shouldShipItsOriginalText() {
    common::init_test_logger();
    let dir = common::create_temp_dir().unwrap();
    let input = dir.path().join("input");
    let first = common::section("A", "а", 40);
    let second = common::section("B", "б", 40);
    let third = common::section("C", "в", 40);
    common::create_test_file(&input, "page.md", &format!("{}\n\n{}\n\n{}", first, second, third)).unwrap();

    let provider = MockProvider::fail_on_call(2);
    let controller = Controller::with_parts(
        common::test_config(dir.path(), 20),
        Arc::new(provider.clone()),
        Glossary::new(),
    );

    let summary = controller
        .run_tree(&input, &dir.path().join("output"), &common::languages(&["en"]))
        .await
        .unwrap();

    assert_eq!(provider.call_count(), 3);
    let written = fs::read_to_string(dir.path().join("output/en/page.md")).unwrap();
    assert_eq!(
        written,
        format!("{}\n\n{}\n\n{}", first.to_uppercase(), second, third.to_uppercase())
    );

    let report = summary.report("en").unwrap();
    assert!(!summary.any_failed());
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.degraded.len(), 1);
    assert_eq!(report.usage.failures, 1);
}

#[tokio::test]
async fn test_runTree_glossaryTerm_shouldReachLaterSegmentPrompts() {
    common::init_test_logger();
    let dir = common::create_temp_dir().unwrap();
    let input = dir.path().join("input");
    let sections = [
        common::section("A", "о", 40),
        format!("{} кластер", common::section("B", "п", 40)),
        common::section("C", "р", 40),
        common::section("D", "с", 40),
    ];
    common::create_test_file(&input, "page.md", &sections.join("\n\n")).unwrap();

    let provider = MockProvider::uppercase();
    let glossary = Glossary::new().with_term("кластер", "en", "cluster");
    let controller = Controller::with_parts(
        common::test_config(dir.path(), 20),
        Arc::new(provider.clone()),
        glossary,
    );

    controller
        .run_tree(&input, &dir.path().join("output"), &common::languages(&["en"]))
        .await
        .unwrap();

    let requests = provider.requests();
    assert_eq!(requests.len(), 4);
    let seen = "Previous term translations in this document:\n'кластер' -> 'cluster'";
    for request in &requests {
        assert!(request.system_text().contains("'кластер' -> 'cluster'"));
    }
    assert!(!requests[0].system_text().contains(seen));
    assert!(!requests[1].system_text().contains(seen));
    assert!(requests[2].system_text().contains(seen));
    assert!(requests[3].system_text().contains(seen));
}

#[tokio::test]
async fn test_runTree_binaryAndOtherFiles_shouldBeCopiedUnchanged() {
    common::init_test_logger();
    let dir = common::create_temp_dir().unwrap();
    let input = dir.path().join("input");
    fs::create_dir_all(input.join("img")).unwrap();
    let image = [0x89u8, 0x50, 0x4E, 0x47, 0xFF, 0xFE, 0x00, 0x01];
    fs::write(input.join("img/logo.png"), image).unwrap();
    fs::write(input.join("broken.md"), [0xFFu8, 0xFE, 0xFD]).unwrap();
    common::create_test_file(&input, "_category_.json", "{\"label\": \"Раздел\"}").unwrap();

    let provider = MockProvider::uppercase();
    let controller = Controller::with_parts(
        common::test_config(dir.path(), 8000),
        Arc::new(provider.clone()),
        Glossary::new(),
    );

    let summary = controller
        .run_tree(&input, &dir.path().join("output"), &common::languages(&["en", "es"]))
        .await
        .unwrap();

    assert_eq!(provider.call_count(), 0);
    assert!(!summary.any_failed());
    for language in ["en", "es"] {
        let out = dir.path().join("output").join(language);
        assert_eq!(fs::read(out.join("img/logo.png")).unwrap(), image);
        assert_eq!(fs::read(out.join("broken.md")).unwrap(), vec![0xFFu8, 0xFE, 0xFD]);
        assert_eq!(fs::read_to_string(out.join("_category_.json")).unwrap(), "{\"label\": \"Раздел\"}");
    }
}

#[tokio::test]
async fn test_runTree_unreadableDocument_shouldFailOnlyThatJob() {
    common::init_test_logger();
    let dir = common::create_temp_dir().unwrap();
    let input = dir.path().join("input");
    let mut bad = "a".repeat(2000).into_bytes();
    bad.push(0xFF);
    fs::create_dir_all(&input).unwrap();
    fs::write(input.join("bad.md"), bad).unwrap();
    common::create_test_file(&input, "good.md", "Текст").unwrap();

    let controller = Controller::with_parts(
        common::test_config(dir.path(), 8000),
        Arc::new(MockProvider::uppercase()),
        Glossary::new(),
    );

    let summary = controller
        .run_tree(&input, &dir.path().join("output"), &common::languages(&["en"]))
        .await
        .unwrap();

    let report = summary.report("en").unwrap();
    assert!(summary.any_failed());
    assert_eq!(report.total, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.to_string_lossy(), "bad.md");
    assert_eq!(
        fs::read_to_string(dir.path().join("output/en/good.md")).unwrap(),
        "ТЕКСТ"
    );
}

#[tokio::test]
async fn test_runTree_localBlocks_shouldNotReachServiceOrOutput() {
    common::init_test_logger();
    let dir = common::create_temp_dir().unwrap();
    let input = dir.path().join("input");
    common::create_test_file(
        &input,
        "page.mdx",
        "Общий текст\n\n{/* LOCAL TEXT START */}\nТолько для русской версии\n{/* LOCAL TEXT END */}",
    )
    .unwrap();

    let provider = MockProvider::uppercase();
    let controller = Controller::with_parts(
        common::test_config(dir.path(), 8000),
        Arc::new(provider.clone()),
        Glossary::new(),
    );

    controller
        .run_tree(&input, &dir.path().join("output"), &common::languages(&["zh"]))
        .await
        .unwrap();

    assert!(provider.requests().iter().all(|r| !r.user_text().contains("Только")));
    let written = fs::read_to_string(dir.path().join("output/zh/page.mdx")).unwrap();
    assert_eq!(written.trim_end(), "ОБЩИЙ ТЕКСТ");
}

#[tokio::test]
async fn test_runTree_manyFilesAndLanguages_shouldUseOneTranslatorPerLanguage() {
    common::init_test_logger();
    let dir = common::create_temp_dir().unwrap();
    let input = dir.path().join("input");
    for i in 0..5 {
        common::create_test_file(&input, &format!("doc{}.md", i), &format!("Текст {}", i)).unwrap();
    }

    let provider = MockProvider::uppercase();
    let controller = Controller::with_parts(
        common::test_config(dir.path(), 8000),
        Arc::new(provider.clone()),
        Glossary::new(),
    );

    let summary = controller
        .run_tree(&input, &dir.path().join("output"), &common::languages(&["en", "es", "zh"]))
        .await
        .unwrap();

    assert_eq!(provider.call_count(), 15);
    for language in ["en", "es", "zh"] {
        let report = summary.report(language).unwrap();
        assert_eq!(report.succeeded, 5);
        assert_eq!(report.usage.requests, 5);
    }
}
