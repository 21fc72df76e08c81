/*!
 * Tests for the validation pass and the hints it feeds back into prompts
 */

use std::fs;
use std::sync::Arc;

use doclingo::app_controller::Controller;
use doclingo::providers::mock::MockProvider;
use doclingo::translation::Glossary;
use doclingo::translation::hints::{AppendOutcome, ImprovementHint};
use doclingo::validation::{ValidationReport, Validator};

use crate::common;

const ISSUE_RESPONSE: &str = r#"{"issues": [
    {"file_path": "x", "original": "Запустите сервер", "translated": "Run the serving", "reason": "Wrong verb meaning"},
    {"file_path": "x", "original": "ок", "translated": "ok", "reason": "Too short to matter"},
    {"file_path": "x", "original": "узел", "translated": "node", "reason": "Glossary term узел looks mistranslated"}
]}"#;

fn validator_for(controller: &Controller) -> Validator {
    Validator::new(
        controller.provider(),
        controller.glossary(),
        controller.hints(),
        controller.config().clone(),
    )
}

#[tokio::test]
async fn test_validateLanguage_shouldWriteReportAndFeedHintsIntoPrompts() {
    common::init_test_logger();
    let dir = common::create_temp_dir().unwrap();
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    common::create_test_file(&input, "guide/start.md", "Запустите сервер").unwrap();
    common::create_test_file(&output, "en/guide/start.md", "Run the serving").unwrap();

    let provider = MockProvider::responder(|_| Ok(ISSUE_RESPONSE.to_string()));
    let controller = Controller::with_parts(
        common::test_config(dir.path(), 8000),
        Arc::new(provider.clone()),
        Glossary::new().with_term("узел", "en", "node"),
    );
    let validator = validator_for(&controller);

    let report = validator.validate_language(&input, &output, "en").await.unwrap();
    assert_eq!(report.total_files, 1);
    assert_eq!(report.total_issues, 1);
    assert_eq!(report.issues[0].reason, "Wrong verb meaning");
    assert!(report.issues[0].file_path.ends_with("start.md"));

    let report_path = dir.path().join("validation_report_en.json");
    report.write(&report_path).unwrap();
    let reloaded: ValidationReport = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(reloaded, report);

    let hints_file = dir.path().join("hints/prompt_improvements_en.json");
    assert!(hints_file.exists());
    assert_eq!(controller.hints().load("en").len(), 1);

    let worker = controller.worker_for("en");
    let prompt = worker.translator.field_prompt();
    assert!(prompt.contains("Based on previous translation issues"));
    assert!(prompt.contains("Run the serving"));
}

#[tokio::test]
async fn test_hintStore_nearDuplicate_shouldNotBeAppended() {
    common::init_test_logger();
    let dir = common::create_temp_dir().unwrap();
    let controller = Controller::with_parts(
        common::test_config(dir.path(), 8000),
        Arc::new(MockProvider::uppercase()),
        Glossary::new(),
    );
    let hints = controller.hints();

    let first = hints
        .append("en", ImprovementHint::new("Запустите сервер", "Run the serving", "Wrong verb meaning"))
        .unwrap();
    let second = hints
        .append("en", ImprovementHint::new("Запустите сервер.", "Run the serving.", "Wrong verb meaning"))
        .unwrap();

    assert_eq!(first, AppendOutcome::Added);
    assert_eq!(second, AppendOutcome::Duplicate);
    assert_eq!(hints.load("en").len(), 1);
}

#[tokio::test]
async fn test_validateLanguage_missingTranslations_shouldFail() {
    common::init_test_logger();
    let dir = common::create_temp_dir().unwrap();
    let input = dir.path().join("input");
    common::create_test_file(&input, "a.md", "Текст").unwrap();

    let provider = MockProvider::uppercase();
    let controller = Controller::with_parts(
        common::test_config(dir.path(), 8000),
        Arc::new(provider.clone()),
        Glossary::new(),
    );

    let result = validator_for(&controller)
        .validate_language(&input, &dir.path().join("output"), "en")
        .await;

    assert!(result.is_err());
    assert_eq!(provider.call_count(), 0);
}
