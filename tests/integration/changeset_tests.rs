/*!
 * Tests for git changeset discovery and sync runs
 */

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use doclingo::app_config::DEFAULT_SOURCE_SUBDIR;
use doclingo::app_controller::Controller;
use doclingo::providers::mock::MockProvider;
use doclingo::translation::Glossary;

use crate::common;

fn git(repo: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .args(["-c", "user.name=doclingo", "-c", "user.email=doclingo@example.com"])
        .args(args)
        .current_dir(repo)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A fresh repository, or `None` when git is unavailable
fn init_repo(dir: &Path) -> Option<()> {
    if git(dir, &["init", "-q"]) { Some(()) } else { None }
}

#[tokio::test]
async fn test_runChangeset_shouldTranslateChangedFilesIntoDestinations() {
    common::init_test_logger();
    let dir = common::create_temp_dir().unwrap();
    let repo = dir.path();
    if init_repo(repo).is_none() {
        return;
    }
    let source = repo.join(DEFAULT_SOURCE_SUBDIR);
    common::create_test_file(&source, "old.md", "Старый").unwrap();
    common::create_test_file(&source, "gone.md", "Удалённый").unwrap();
    assert!(git(repo, &["add", "."]));
    assert!(git(repo, &["commit", "-q", "-m", "initial"]));

    common::create_test_file(&source, "guide/новый.md", "Новый").unwrap();
    fs::write(source.join("logo.png"), [0u8, 159, 146, 150]).unwrap();
    fs::remove_file(source.join("gone.md")).unwrap();
    common::create_test_file(repo, "README.md", "outside").unwrap();

    let provider = MockProvider::uppercase();
    let controller = Controller::with_parts(
        common::test_config(repo, 8000),
        Arc::new(provider.clone()),
        Glossary::new(),
    );

    let jobs = controller
        .plan_changeset(repo, &common::languages(&["en", "es"]))
        .unwrap();
    let relative: Vec<String> = jobs
        .iter()
        .filter(|j| j.language == "en")
        .map(|j| j.relative.to_string_lossy().to_string())
        .collect();
    assert_eq!(relative, vec!["guide/новый.md", "logo.png"]);

    let summary = controller
        .run_changeset(repo, &common::languages(&["en", "es"]))
        .await
        .unwrap();

    assert!(!summary.any_failed());
    assert_eq!(provider.call_count(), 2);
    assert_eq!(fs::read_to_string(repo.join("docs/guide/новый.md")).unwrap(), "НОВЫЙ");
    assert_eq!(
        fs::read_to_string(repo.join("i18n/es/docusaurus-plugin-content-docs/current/guide/новый.md")).unwrap(),
        "НОВЫЙ"
    );
    assert!(repo.join("docs/logo.png").exists());
    assert!(!repo.join("docs/old.md").exists());
}

#[tokio::test]
async fn test_runChangeset_outsideRepository_shouldAbort() {
    common::init_test_logger();
    let dir = common::create_temp_dir().unwrap();
    if Command::new("git").arg("--version").output().is_err() {
        return;
    }
    let controller = Controller::with_parts(
        common::test_config(dir.path(), 8000),
        Arc::new(MockProvider::uppercase()),
        Glossary::new(),
    );

    let result = controller
        .run_changeset(&dir.path().join("missing"), &common::languages(&["en"]))
        .await;

    assert!(result.is_err());
}
