use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::errors::DiscoveryError;

// @module: Changeset discovery through git

/// Run git with the given arguments inside `repo`
fn run_git(repo: &Path, args: &[&str]) -> Result<Output, DiscoveryError> {
    debug!("Running git {} in {:?}", args.join(" "), repo);
    Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => DiscoveryError::GitNotFound(e.to_string()),
            _ => DiscoveryError::GitFailed {
                status: "not started".to_string(),
                stderr: e.to_string(),
            },
        })
}

/// Check that `repo` lies inside a git working tree
pub fn ensure_repository(repo: &Path) -> Result<(), DiscoveryError> {
    if !repo.is_dir() {
        return Err(DiscoveryError::NotARepository(repo.display().to_string()));
    }

    let output = run_git(repo, &["rev-parse", "--is-inside-work-tree"])?;
    if output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "true" {
        Ok(())
    } else {
        Err(DiscoveryError::NotARepository(repo.display().to_string()))
    }
}

/// List files changed, added, renamed or untracked under `subdir` of `repo`.
///
/// Paths are relative to `subdir`, sorted and unique. A missing `subdir`
/// yields an empty list.
pub fn changed_files_in_dir(repo: &Path, subdir: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let subdir = subdir.trim_matches('/');
    let target = repo.join(subdir);
    if !target.is_dir() {
        warn!("Changeset directory does not exist: {:?}", target);
        return Ok(Vec::new());
    }

    let output = run_git(
        repo,
        &["status", "--porcelain=v1", "-z", "--untracked-files=all", "--", subdir],
    )?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.to_lowercase().contains("not a git repository") {
            return Err(DiscoveryError::NotARepository(repo.display().to_string()));
        }
        return Err(DiscoveryError::GitFailed {
            status: output.status.to_string(),
            stderr,
        });
    }

    let root_name = repo
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_default();

    let files = parse_porcelain(&String::from_utf8_lossy(&output.stdout), &root_name, subdir);
    if files.is_empty() {
        info!("No changed files in '{}'", subdir);
    } else {
        info!("Found {} changed files in '{}'", files.len(), subdir);
    }
    Ok(files)
}

/// Parse `git status --porcelain=v1 -z` output into paths relative to `subdir`.
///
/// Entries are NUL-terminated: a two-character status, a space, and the
/// path verbatim. Renames and copies are followed by one more field holding
/// the old path; only the destination is kept.
pub fn parse_porcelain(output: &str, repo_root_name: &str, subdir: &str) -> Vec<PathBuf> {
    let subdir = subdir.trim_matches('/');
    let subdir_prefix = format!("{}/", subdir);
    let root_prefix = format!("{}/", repo_root_name);
    let mut files = BTreeSet::new();

    let mut fields = output.split('\0');
    while let Some(entry) = fields.next() {
        let (Some(status), Some(path)) = (entry.get(..2), entry.get(3..)) else {
            continue;
        };
        if status.contains('R') || status.contains('C') {
            // Old path of the rename
            fields.next();
        }
        if path.is_empty() {
            continue;
        }

        let path = match path.strip_prefix(&root_prefix) {
            Some(rest) if !repo_root_name.is_empty() => rest,
            _ => path,
        };

        if let Some(relative) = path.strip_prefix(&subdir_prefix) {
            if !relative.is_empty() {
                files.insert(relative.to_string());
            }
        }
    }

    files.into_iter().map(PathBuf::from).collect()
}
