use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::app_config::{Config, DEFAULT_SOURCE_SUBDIR};
use crate::file_utils::FileManager;
use crate::git_utils;
use crate::providers::Provider;
use crate::translation::core::{SegmentOutcome, TokenUsageSnapshot, Translator};
use crate::translation::frontmatter;
use crate::translation::segmenter::{Segmenter, join_segments};
use crate::translation::{ConsistencyContext, Glossary, HintStore};

// @module: Application controller for document translation runs

/// One (file, target language) unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Absolute or working-directory-relative source file
    pub source: PathBuf,
    /// Path relative to the source root
    pub relative: PathBuf,
    /// Target language code
    pub language: String,
    /// File to write
    pub destination: PathBuf,
}

/// What a finished job did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    /// The file was copied unchanged
    Copied,
    /// The file went through the translation pipeline
    Translated {
        segments: usize,
        /// Segments shipped in the source language after a service failure
        degraded: usize,
        /// Metadata fields left untranslated
        field_errors: usize,
    },
}

impl JobAction {
    pub fn is_degraded(&self) -> bool {
        matches!(self, JobAction::Translated { degraded, field_errors, .. } if *degraded > 0 || *field_errors > 0)
    }
}

/// Result of one job
#[derive(Debug)]
pub struct JobOutcome {
    pub language: String,
    pub relative: PathBuf,
    pub result: Result<JobAction>,
}

/// Per-language totals of a run
#[derive(Debug, Clone, Default)]
pub struct LanguageReport {
    pub language: String,
    pub total: usize,
    pub succeeded: usize,
    /// Failed files with the error message
    pub failed: Vec<(PathBuf, String)>,
    /// Documents written with at least one untranslated segment or field
    pub degraded: Vec<PathBuf>,
    pub usage: TokenUsageSnapshot,
}

/// Totals of a whole run, one report per target language
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub languages: Vec<LanguageReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn any_failed(&self) -> bool {
        self.languages.iter().any(|l| !l.failed.is_empty())
    }

    pub fn total_failed(&self) -> usize {
        self.languages.iter().map(|l| l.failed.len()).sum()
    }

    pub fn total_tokens(&self) -> u64 {
        self.languages.iter().map(|l| l.usage.total_tokens).sum()
    }

    pub fn report(&self, language: &str) -> Option<&LanguageReport> {
        self.languages.iter().find(|l| l.language == language)
    }

    /// Write the end-of-run summary to the log
    pub fn log(&self) {
        for report in &self.languages {
            info!(
                "[{}] {}/{} files processed, ~{} tokens",
                report.language, report.succeeded, report.total, report.usage.total_tokens
            );
            for (path, message) in &report.failed {
                error!("[{}] Failed: {} ({})", report.language, path.display(), message);
            }
            for path in &report.degraded {
                warn!("[{}] Partially untranslated: {}", report.language, path.display());
            }
        }
        info!(
            "Run finished in {}: {} failed jobs, ~{} tokens in total",
            Controller::format_duration(self.elapsed),
            self.total_failed(),
            self.total_tokens()
        );
    }
}

/// Everything a job needs to translate into one language
#[derive(Debug)]
pub struct LanguageWorker {
    pub translator: Translator,
    pub base_prompt: String,
}

/// Locale directory of a Docusaurus site for a language
pub fn docusaurus_locale_dir(language: &str) -> String {
    format!("i18n/{}/docusaurus-plugin-content-docs/current", language)
}

/// Main application controller for document translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Shared text-generation client
    provider: Arc<dyn Provider>,
    // @field: Read-only term glossary
    glossary: Arc<Glossary>,
    // @field: Improvement hints from earlier validation runs
    hints: Arc<HintStore>,
}

impl Controller {
    /// Create a controller, loading the glossary and hint store named in the configuration
    pub fn with_config(config: Config, provider: Arc<dyn Provider>) -> Self {
        let glossary = Glossary::load(&config.general.glossary_path);
        Self::with_parts(config, provider, glossary)
    }

    /// Create a controller with an explicit glossary
    pub fn with_parts(config: Config, provider: Arc<dyn Provider>, glossary: Glossary) -> Self {
        let hints = HintStore::new(&config.general.hints_dir);
        Self {
            config,
            provider,
            glossary: Arc::new(glossary),
            hints: Arc::new(hints),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> Arc<dyn Provider> {
        self.provider.clone()
    }

    pub fn glossary(&self) -> Arc<Glossary> {
        self.glossary.clone()
    }

    pub fn hints(&self) -> Arc<HintStore> {
        self.hints.clone()
    }

    /// Build the translator and instruction for one target language
    pub fn worker_for(&self, language: &str) -> LanguageWorker {
        let translator = Translator::new(
            self.provider.clone(),
            self.glossary.clone(),
            &self.config.general.source_language,
            language,
        )
        .with_hints(self.hints.prompt_section(language));

        LanguageWorker {
            translator,
            base_prompt: self.config.get_system_prompt(language),
        }
    }

    /// Jobs for every file under `input_dir`, written to `<output_dir>/<lang>/<rel>`
    pub fn plan_tree(&self, input_dir: &Path, output_dir: &Path, languages: &[String]) -> Result<Vec<Job>> {
        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let files = FileManager::list_relative_files(input_dir)?;
        info!("Found {} files in {:?}", files.len(), input_dir);

        let mut jobs = Vec::with_capacity(files.len() * languages.len());
        for language in languages {
            for relative in &files {
                jobs.push(Job {
                    source: input_dir.join(relative),
                    relative: relative.clone(),
                    language: language.clone(),
                    destination: output_dir.join(language).join(relative),
                });
            }
        }
        Ok(jobs)
    }

    /// Source subdirectory of the repository in changeset mode
    pub fn source_subdir(&self) -> String {
        let source = &self.config.general.source_language;
        self.config
            .language_config(source)
            .and_then(|l| l.destination.clone())
            .unwrap_or_else(|| match source.as_str() {
                "ru" => DEFAULT_SOURCE_SUBDIR.to_string(),
                other => docusaurus_locale_dir(other),
            })
    }

    /// Jobs for the files git reports as changed in the source subdirectory.
    ///
    /// Changed paths whose source no longer exists are skipped.
    pub fn plan_changeset(&self, repo: &Path, languages: &[String]) -> Result<Vec<Job>> {
        git_utils::ensure_repository(repo)?;
        let subdir = self.source_subdir();
        info!("Looking for changed files in '{}'", subdir);

        let changed = git_utils::changed_files_in_dir(repo, &subdir)?;
        let source_root = repo.join(&subdir);

        let mut jobs = Vec::new();
        for language in languages {
            let destination_root = repo.join(
                self.config
                    .get_destination(language)
                    .unwrap_or_else(|| docusaurus_locale_dir(language)),
            );
            for relative in &changed {
                let source = source_root.join(relative);
                if !FileManager::file_exists(&source) {
                    warn!("[{}] Source file no longer exists, skipping: {:?}", language, source);
                    continue;
                }
                jobs.push(Job {
                    source,
                    relative: relative.clone(),
                    language: language.clone(),
                    destination: destination_root.join(relative),
                });
            }
        }
        Ok(jobs)
    }

    /// Translate a whole directory tree
    pub async fn run_tree(&self, input_dir: &Path, output_dir: &Path, languages: &[String]) -> Result<RunSummary> {
        let jobs = self.plan_tree(input_dir, output_dir, languages)?;
        Ok(self.run_jobs(jobs, languages).await)
    }

    /// Translate the files changed in a git repository
    pub async fn run_changeset(&self, repo: &Path, languages: &[String]) -> Result<RunSummary> {
        let jobs = self.plan_changeset(repo, languages)?;
        if jobs.is_empty() {
            info!("Nothing to translate");
        }
        Ok(self.run_jobs(jobs, languages).await)
    }

    /// Run jobs on one bounded worker pool shared by all languages
    pub async fn run_jobs(&self, jobs: Vec<Job>, languages: &[String]) -> RunSummary {
        let start_time = Instant::now();
        let workers: HashMap<String, Arc<LanguageWorker>> = languages
            .iter()
            .map(|language| (language.clone(), Arc::new(self.worker_for(language))))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.config.general.max_workers.max(1)));
        let segmenter = Segmenter::new(self.config.general.max_tokens);
        let progress = Self::progress_bar(jobs.len() as u64);

        info!(
            "Processing {} jobs for {} with {} workers",
            jobs.len(),
            languages.join(", "),
            self.config.general.max_workers
        );

        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let Some(worker) = workers.get(&job.language).cloned() else {
                warn!("[{}] No translator configured, skipping {:?}", job.language, job.relative);
                continue;
            };
            let semaphore = semaphore.clone();
            let segmenter = segmenter.clone();
            let progress = progress.clone();
            let key = (job.language.clone(), job.relative.clone());

            let handle = tokio::spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => process_file(&job, &worker, &segmenter).await,
                    Err(e) => Err(anyhow!("Worker pool closed: {}", e)),
                };
                if let Err(e) = &result {
                    error!("[{}] Failed to process {}: {:#}", job.language, job.relative.display(), e);
                }
                progress.inc(1);
                result
            });
            handles.push((key, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for ((language, relative), handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(anyhow!("Job task aborted: {}", e)),
            };
            outcomes.push(JobOutcome { language, relative, result });
        }
        progress.finish_and_clear();

        let mut summary = summarize(languages, &workers, outcomes);
        summary.elapsed = start_time.elapsed();
        summary
    }

    fn progress_bar(len: u64) -> ProgressBar {
        if !std::io::stderr().is_terminal() {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new(len);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%)"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style.progress_chars("█▓▒░"));
        progress
    }

    /// Format a duration in a human-readable way
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

fn summarize(
    languages: &[String],
    workers: &HashMap<String, Arc<LanguageWorker>>,
    outcomes: Vec<JobOutcome>,
) -> RunSummary {
    let mut reports: Vec<LanguageReport> = languages
        .iter()
        .map(|language| LanguageReport {
            language: language.clone(),
            usage: workers
                .get(language)
                .map(|w| w.translator.usage().snapshot())
                .unwrap_or_default(),
            ..LanguageReport::default()
        })
        .collect();

    for outcome in outcomes {
        let Some(report) = reports.iter_mut().find(|r| r.language == outcome.language) else {
            continue;
        };
        report.total += 1;
        match outcome.result {
            Ok(action) => {
                report.succeeded += 1;
                if action.is_degraded() {
                    report.degraded.push(outcome.relative);
                }
            }
            Err(e) => report.failed.push((outcome.relative, format!("{:#}", e))),
        }
    }

    for report in &mut reports {
        report.failed.sort();
        report.degraded.sort();
    }

    RunSummary {
        languages: reports,
        elapsed: Duration::ZERO,
    }
}

/// Process one job: copy the file, or run it through the translation pipeline.
///
/// Segments are translated strictly in order so the consistency context sees
/// every earlier segment. Service failures degrade a segment to its original
/// text; I/O errors fail the job.
pub async fn process_file(job: &Job, worker: &LanguageWorker, segmenter: &Segmenter) -> Result<JobAction> {
    let language = &job.language;
    let relative = job.relative.display();

    let translate = FileManager::is_document_file(&job.source)
        && !FileManager::is_binary_file(&job.source)
            .with_context(|| format!("Failed to inspect {:?}", job.source))?;

    if !translate {
        info!("[{}] Copying {}", language, relative);
        FileManager::copy_file(&job.source, &job.destination)?;
        return Ok(JobAction::Copied);
    }

    info!("[{}] Translating {}", language, relative);
    let raw = FileManager::read_to_string(&job.source)?;
    let document = frontmatter::extract(&frontmatter::strip_local_blocks(&raw));

    let mut field_errors = 0;
    let block = match document.frontmatter.as_deref() {
        Some(block) => {
            debug!("[{}] Translating metadata of {}", language, relative);
            let outcome = frontmatter::translate_metadata(block, &worker.translator).await;
            if let Some(e) = &outcome.structural_error {
                warn!("[{}] Metadata of {} left unchanged: {}", language, relative, e);
            }
            for field in &outcome.field_errors {
                warn!("[{}] Metadata field '{}' of {} left untranslated: {}", language, field.key, relative, field.cause);
            }
            field_errors = outcome.field_errors.len();
            Some(outcome.block)
        }
        None => None,
    };

    let segments = segmenter.split(&document.body);
    let mut context = ConsistencyContext::new();
    let mut parts = Vec::with_capacity(segments.len());
    let mut degraded = 0;

    for (index, segment) in segments.iter().enumerate() {
        debug!("[{}] Segment {}/{} of {} ({} units)", language, index + 1, segments.len(), relative, segment.cost);
        let outcome = worker
            .translator
            .translate_segment(&segment.text, &worker.base_prompt, &mut context)
            .await;
        if let SegmentOutcome::Failed { cause, .. } = &outcome {
            degraded += 1;
            error!(
                "[{}] Segment {}/{} of {} left untranslated: {}",
                language,
                index + 1,
                segments.len(),
                relative,
                cause
            );
        }
        parts.push(outcome.into_text());
    }

    let content = frontmatter::restore(block.as_deref(), &join_segments(&parts));
    FileManager::write_to_file(&job.destination, &content)?;
    info!(
        "[{}] Saved {} ({} segments, ~{} tokens)",
        language,
        job.destination.display(),
        segments.len(),
        context.cumulative_cost
    );

    Ok(JobAction::Translated {
        segments: segments.len(),
        degraded,
        field_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use std::fs;
    use tempfile::TempDir;

    fn controller(provider: MockProvider, dir: &Path) -> Controller {
        let mut config = Config::default();
        config.general.hints_dir = dir.join("hints");
        config.general.max_workers = 2;
        Controller::with_parts(config, Arc::new(provider), Glossary::new())
    }

    #[test]
    fn test_formatDuration_shouldPickLargestUnit() {
        assert_eq!(Controller::format_duration(Duration::from_millis(1500)), "1.500s");
        assert_eq!(Controller::format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(Controller::format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn test_planTree_shouldCreateOneJobPerFileAndLanguage() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        fs::create_dir_all(input.join("sub")).unwrap();
        fs::write(input.join("a.md"), "# A").unwrap();
        fs::write(input.join("sub/b.png"), [0u8]).unwrap();

        let controller = controller(MockProvider::uppercase(), dir.path());
        let languages = vec!["en".to_string(), "es".to_string()];
        let jobs = controller.plan_tree(&input, &dir.path().join("out"), &languages).unwrap();

        assert_eq!(jobs.len(), 4);
        assert_eq!(jobs[0].destination, dir.path().join("out/en/a.md"));
        assert_eq!(jobs[3].destination, dir.path().join("out/es/sub/b.png"));
    }

    #[test]
    fn test_planTree_missingInput_shouldFail() {
        let dir = TempDir::new().unwrap();
        let controller = controller(MockProvider::uppercase(), dir.path());
        assert!(controller.plan_tree(&dir.path().join("nope"), dir.path(), &["en".to_string()]).is_err());
    }

    #[test]
    fn test_sourceSubdir_default_shouldBeRussianLocale() {
        let dir = TempDir::new().unwrap();
        let controller = controller(MockProvider::uppercase(), dir.path());
        assert_eq!(controller.source_subdir(), DEFAULT_SOURCE_SUBDIR);
    }

    #[tokio::test]
    async fn test_processFile_document_shouldTranslateMetadataAndBody() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("page.md");
        fs::write(&source, "---\ntitle: Привет\n---\n\n# Заголовок\n\nТекст").unwrap();

        let controller = controller(MockProvider::uppercase(), dir.path());
        let worker = controller.worker_for("en");
        let job = Job {
            source,
            relative: PathBuf::from("page.md"),
            language: "en".to_string(),
            destination: dir.path().join("out/page.md"),
        };

        let action = process_file(&job, &worker, &Segmenter::default()).await.unwrap();

        assert_eq!(action, JobAction::Translated { segments: 1, degraded: 0, field_errors: 0 });
        let written = fs::read_to_string(&job.destination).unwrap();
        assert!(written.starts_with("---\ntitle: "));
        assert!(written.contains("ПРИВЕТ"));
        assert!(written.ends_with("---\n\n# ЗАГОЛОВОК\n\nТЕКСТ"));
    }

    #[tokio::test]
    async fn test_processFile_failingService_shouldShipOriginalText() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("page.mdx");
        fs::write(&source, "Текст").unwrap();

        let controller = controller(MockProvider::failing(), dir.path());
        let worker = controller.worker_for("en");
        let job = Job {
            source,
            relative: PathBuf::from("page.mdx"),
            language: "en".to_string(),
            destination: dir.path().join("out/page.mdx"),
        };

        let action = process_file(&job, &worker, &Segmenter::default()).await.unwrap();

        assert!(action.is_degraded());
        assert_eq!(fs::read_to_string(&job.destination).unwrap(), "Текст");
    }

    #[tokio::test]
    async fn test_processFile_bodyEndingWithFence_shouldKeepFencesBalanced() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("run.md");
        let body = "# Title\n\nRun this:\n\n```bash\nls -la\n```";
        fs::write(&source, body).unwrap();

        let controller = controller(MockProvider::echo(""), dir.path());
        let worker = controller.worker_for("en");
        let job = Job {
            source,
            relative: PathBuf::from("run.md"),
            language: "en".to_string(),
            destination: dir.path().join("out/run.md"),
        };

        process_file(&job, &worker, &Segmenter::default()).await.unwrap();

        let written = fs::read_to_string(&job.destination).unwrap();
        assert_eq!(written, body);
        assert_eq!(written.matches("```").count(), 2);
    }

    #[tokio::test]
    async fn test_processFile_bodyStartingWithFence_shouldKeepOpeningLine() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("start.md");
        let body = "```bash\nls -la\n```\n\nAfter";
        fs::write(&source, body).unwrap();

        let controller = controller(MockProvider::echo(""), dir.path());
        let worker = controller.worker_for("en");
        let job = Job {
            source,
            relative: PathBuf::from("start.md"),
            language: "en".to_string(),
            destination: dir.path().join("out/start.md"),
        };

        process_file(&job, &worker, &Segmenter::default()).await.unwrap();

        assert_eq!(fs::read_to_string(&job.destination).unwrap(), body);
    }

    #[tokio::test]
    async fn test_runJobs_missingSource_shouldRecordFailure() {
        let dir = TempDir::new().unwrap();
        let controller = controller(MockProvider::uppercase(), dir.path());
        let languages = vec!["en".to_string()];
        let jobs = vec![Job {
            source: dir.path().join("missing.md"),
            relative: PathBuf::from("missing.md"),
            language: "en".to_string(),
            destination: dir.path().join("out/missing.md"),
        }];

        let summary = controller.run_jobs(jobs, &languages).await;

        assert!(summary.any_failed());
        let report = summary.report("en").unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.failed[0].0, PathBuf::from("missing.md"));
    }
}
