// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use doclingo::app_config::{self, Config};
use doclingo::app_controller::{Controller, RunSummary};
use doclingo::language_utils;
use doclingo::providers::Provider;
use doclingo::providers::openai::OpenAI;
use doclingo::validation::{ValidationReport, Validator};

/// Exit code of a run in which at least one job failed
const EXIT_JOBS_FAILED: i32 = 2;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    #[value(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Options shared by every command that talks to the service
#[derive(Args, Debug)]
struct CommonArgs {
    /// Target language code, a comma-separated list, or 'all'
    #[arg(long, default_value = "all")]
    language: String,

    /// Configuration file path
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Set logging level
    #[arg(long = "log_level", alias = "log-level", value_enum, ignore_case = true)]
    log_level: Option<CliLogLevel>,

    /// Also append log lines to this file
    #[arg(long = "log_file", alias = "log-file")]
    log_file: Option<PathBuf>,

    /// Number of concurrent jobs (overrides general.max_workers)
    #[arg(long = "max_workers", alias = "max-workers")]
    max_workers: Option<usize>,

    /// Segment budget in cost units (overrides general.max_tokens)
    #[arg(long = "max_tokens", alias = "max-tokens")]
    max_tokens: Option<usize>,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Directory with the source documents
    #[arg(long = "input_dir", alias = "input-dir", default_value = "input")]
    input_dir: PathBuf,

    /// Directory receiving one subdirectory per target language
    #[arg(long = "output_dir", alias = "output-dir", default_value = "output")]
    output_dir: PathBuf,
}

#[derive(Args, Debug)]
struct SyncArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Root of the documentation git repository
    #[arg(long, env = "BOOK_PATH")]
    repo: PathBuf,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Directory with the source documents
    #[arg(long = "input_dir", alias = "input-dir", default_value = "input")]
    input_dir: PathBuf,

    /// Directory holding the translations, one subdirectory per language
    #[arg(long = "output_dir", alias = "output-dir", default_value = "output")]
    output_dir: PathBuf,

    /// Report file (default: validation_report_<lang>.json)
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate every file of a directory tree
    Translate(TranslateArgs),

    /// Translate the files changed in a git repository
    Sync(SyncArgs),

    /// Check finished translations and learn improvement hints
    Validate(ValidateArgs),

    /// Generate shell completions for doclingo
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// doclingo - Markdown documentation translator
#[derive(Parser, Debug)]
#[command(name = "doclingo")]
#[command(version)]
#[command(about = "Structure-preserving translation of Markdown documentation")]
#[command(long_about = "doclingo translates Markdown/MDX documentation trees with an OpenAI-compatible service.

EXAMPLES:
    doclingo translate --input_dir docs_ru --output_dir out        # All default languages
    doclingo translate --language en --max_workers 8               # One language, more workers
    doclingo sync --repo ~/book --language es,zh                   # Only files changed in git
    doclingo validate --language en --report report_en.json        # Validate translations
    doclingo completions bash > doclingo.bash                      # Generate bash completions

CONFIGURATION:
    Settings are read from config.yaml (see --config). OPENAI_API_KEY, OPENAI_BASE_URL,
    MODEL_NAME and BOOK_PATH are read from the environment or a .env file.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    file: Option<Mutex<File>>,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
        let file = match log_file {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open log file: {:?}", path))?;
                Some(Mutex::new(file))
            }
            None => None,
        };

        Self::install(CustomLogger { file }, level)
            .map_err(|e| anyhow!("Failed to install logger: {}", e))
    }

    fn install(logger: CustomLogger, level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(logger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = chrono::Local::now();
        let mut stderr = std::io::stderr();
        let _ = writeln!(
            stderr,
            "{}{} {:<5} {}\x1B[0m",
            Self::color_for_level(record.level()),
            now.format("%H:%M:%S%.3f"),
            record.level(),
            record.args()
        );

        if let Some(file) = &self.file {
            let _ = writeln!(
                file.lock(),
                "[{}] {}: {}",
                now.format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        if let Some(file) = &self.file {
            let _ = file.lock().flush();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before parsing so BOOK_PATH from .env reaches clap
    dotenv::dotenv().ok();

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "doclingo", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => {
            let (config, languages) = prepare(&args.common)?;
            let provider = build_provider(&config);
            let controller = Controller::with_config(config, provider);
            let summary = controller
                .run_tree(&args.input_dir, &args.output_dir, &languages)
                .await?;
            finish(summary)
        }
        Commands::Sync(args) => {
            let (config, languages) = prepare(&args.common)?;
            let repo = args
                .repo
                .canonicalize()
                .with_context(|| format!("Repository path does not exist: {:?}", args.repo))?;
            info!("Using repository {:?}", repo);
            let provider = build_provider(&config);
            let controller = Controller::with_config(config, provider);
            let summary = controller.run_changeset(&repo, &languages).await?;
            finish(summary)
        }
        Commands::Validate(args) => run_validate(args).await,
    }
}

/// Install logging, load and validate the configuration, resolve target languages
fn prepare(common: &CommonArgs) -> Result<(Config, Vec<String>)> {
    let cli_level = common.log_level.map(|l| app_config::LogLevel::from(l).to_level_filter());
    CustomLogger::init(cli_level.unwrap_or(LevelFilter::Info), common.log_file.as_deref())?;

    let mut config = Config::load(&common.config);
    config.apply_env();

    if let Some(max_workers) = common.max_workers {
        config.general.max_workers = max_workers;
    }
    if let Some(max_tokens) = common.max_tokens {
        config.general.max_tokens = max_tokens;
    }
    if let Some(level) = common.log_level {
        config.general.log_level = level.into();
    }
    if cli_level.is_none() {
        log::set_max_level(config.general.log_level.to_level_filter());
    }

    config.validate().context("Configuration validation failed")?;

    let languages = language_utils::resolve_target_languages(&common.language, &config.general.source_language)?;
    info!("Target languages: {}", languages.join(", "));
    info!(
        "Segment budget: {}, workers: {}, model: {}",
        config.general.max_tokens,
        config.general.max_workers,
        config.api.get_model()
    );

    Ok((config, languages))
}

fn build_provider(config: &Config) -> Arc<dyn Provider> {
    if config.api.api_key.is_empty() {
        warn!("No API key configured; set OPENAI_API_KEY or api.api_key");
    }
    Arc::new(OpenAI::from_config(&config.api))
}

/// Log the run summary and turn job failures into a non-zero exit code
fn finish(summary: RunSummary) -> Result<()> {
    summary.log();
    if summary.any_failed() {
        error!("{} jobs failed", summary.total_failed());
        log::logger().flush();
        std::process::exit(EXIT_JOBS_FAILED);
    }
    Ok(())
}

/// Report path for a language: `--report` as given for a single language,
/// with the language appended to the file stem when several are validated
fn report_path(report: Option<&Path>, language: &str, language_count: usize) -> PathBuf {
    match report {
        Some(path) if language_count == 1 => path.to_path_buf(),
        Some(path) => {
            let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
            let name = match path.extension() {
                Some(ext) => format!("{}_{}.{}", stem, language, ext.to_string_lossy()),
                None => format!("{}_{}", stem, language),
            };
            path.with_file_name(name)
        }
        None => ValidationReport::default_path(language),
    }
}

async fn run_validate(args: ValidateArgs) -> Result<()> {
    let (config, languages) = prepare(&args.common)?;
    let provider = build_provider(&config);
    let controller = Controller::with_config(config.clone(), provider);
    let validator = Validator::new(controller.provider(), controller.glossary(), controller.hints(), config);

    let mut failed = false;
    for language in &languages {
        match validator
            .validate_language(&args.input_dir, &args.output_dir, language)
            .await
        {
            Ok(report) => {
                report.write(report_path(args.report.as_deref(), language, languages.len()))?;
            }
            Err(e) => {
                error!("[{}] Validation failed: {:#}", language, e);
                failed = true;
            }
        }
    }

    info!("Validation finished: {}", validator.usage().summary());
    if failed {
        log::logger().flush();
        std::process::exit(EXIT_JOBS_FAILED);
    }
    Ok(())
}
