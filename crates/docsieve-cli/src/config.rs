//! Run configuration
//!
//! Layers, lowest priority first: mode defaults, the YAML config file,
//! `DOCSIEVE__*` environment variables, then command-line flags.
//! e.g. `DOCSIEVE__RETRY__MAX_ATTEMPTS=3` or `DOCSIEVE__EXTENSIONS=pdf,docx`.

use crate::harvest::HarvestConfig;
use crate::input::ExtensionFilter;
use crate::{Command, RunArgs};
use anyhow::{bail, Context, Result};
use docsieve_classifiers::{ClassifierChoice, ClassifierSettings};
use docsieve_pipeline::{BackoffPolicy, RetryConfig, SchedulerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file used when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "docsieve.yaml";

/// What a run does with each item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Download each document and scan it for keywords
    Keywords,
    /// Ask a language model about each URL string
    Ai,
}

impl Mode {
    fn default_output(&self) -> &'static str {
        match self {
            Self::Keywords => "sorted-keywords.txt",
            Self::Ai => "suggestion.txt",
        }
    }

    fn default_write_mode(&self) -> WriteMode {
        match self {
            Self::Keywords => WriteMode::Overwrite,
            Self::Ai => WriteMode::Append,
        }
    }

    fn default_concurrency(&self) -> usize {
        match self {
            Self::Keywords => 5,
            Self::Ai => 1,
        }
    }

    fn default_pacing(&self) -> Duration {
        match self {
            Self::Keywords => Duration::ZERO,
            Self::Ai => Duration::from_millis(500),
        }
    }

    fn default_filter(&self) -> Option<ExtensionFilter> {
        match self {
            Self::Keywords => ExtensionFilter::new(["pdf"]),
            Self::Ai => None,
        }
    }

    fn classifier_choice(&self) -> ClassifierChoice {
        match self {
            Self::Keywords => ClassifierChoice::Keywords,
            Self::Ai => ClassifierChoice::Llm,
        }
    }
}

/// How the output file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Truncate, then write
    Overwrite,
    /// Add to the end of an existing file
    Append,
}

/// Layered configuration as read from file and environment
///
/// Unset fields fall back to the defaults of the chosen mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Maximum in-flight items
    pub concurrency: Option<usize>,

    /// Delay between item admissions, in milliseconds
    pub pacing_ms: Option<u64>,

    /// Output file
    pub output: Option<PathBuf>,

    /// Output write mode
    pub write_mode: Option<WriteMode>,

    /// Extension filter for input lines; an empty list disables filtering
    pub extensions: Option<Vec<String>>,

    /// Retry policy
    pub retry: RetryConfig,

    /// Classifier settings
    pub classifier: ClassifierSettings,

    /// `harvest` command settings
    pub harvest: HarvestConfig,
}

impl RunConfig {
    /// Load configuration from file and process environment
    ///
    /// An explicitly named file must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, None)
    }

    /// Load configuration with an explicit environment map (for tests)
    pub fn load_from(path: Option<&Path>, env: Option<config::Map<String, String>>) -> Result<Self> {
        let (file, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };

        let environment = config::Environment::with_prefix("DOCSIEVE")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("extensions")
            .with_list_parse_key("classifier.keywords")
            .source(env);

        let settings = config::Config::builder()
            .add_source(
                config::File::from(file)
                    .format(config::FileFormat::Yaml)
                    .required(required),
            )
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to load configuration from {}", file.display()))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub mode: Mode,
    pub input: PathBuf,
    pub output: PathBuf,
    pub write_mode: WriteMode,
    pub scheduler: SchedulerConfig,
    pub policy: BackoffPolicy,
    pub filter: Option<ExtensionFilter>,
    pub choice: ClassifierChoice,
    pub classifier: ClassifierSettings,
    pub summary_json: Option<PathBuf>,
}

impl RunSettings {
    /// Apply mode defaults and command-line overrides, then validate
    pub fn resolve(config: RunConfig, command: &Command) -> Result<Self> {
        let (mode, args) = match command {
            Command::Keywords { run, .. } => (Mode::Keywords, run),
            Command::Ai { run, .. } => (Mode::Ai, run),
            Command::Harvest(_) => bail!("harvest does not classify items"),
        };

        let mut classifier = config.classifier;
        match command {
            Command::Keywords { keywords_file, .. } => {
                if let Some(path) = keywords_file {
                    classifier.keywords_file = Some(path.clone());
                }
            }
            Command::Ai {
                provider,
                model,
                endpoint,
                ..
            } => {
                if let Some(provider) = provider {
                    classifier.llm.provider = *provider;
                }
                if let Some(model) = model {
                    classifier.llm.model = Some(model.clone());
                }
                if let Some(endpoint) = endpoint {
                    classifier.llm.endpoint = Some(endpoint.clone());
                }
            }
            Command::Harvest(_) => {}
        }

        let concurrency = if args.sequential {
            1
        } else {
            args.concurrency
                .or(config.concurrency)
                .unwrap_or_else(|| mode.default_concurrency())
        };

        let pacing = args
            .pacing_ms
            .or(config.pacing_ms)
            .map(Duration::from_millis)
            .unwrap_or_else(|| mode.default_pacing());

        let write_mode = if args.append {
            WriteMode::Append
        } else if args.overwrite {
            WriteMode::Overwrite
        } else {
            config.write_mode.unwrap_or_else(|| mode.default_write_mode())
        };

        let mut retry = config.retry;
        if let Some(max_attempts) = args.max_attempts {
            retry.max_attempts = max_attempts;
        }

        let settings = Self {
            mode,
            input: args.input.clone(),
            output: args
                .output
                .clone()
                .or(config.output)
                .unwrap_or_else(|| PathBuf::from(mode.default_output())),
            write_mode,
            scheduler: SchedulerConfig {
                concurrency,
                pacing,
            },
            policy: BackoffPolicy::from(&retry),
            filter: resolve_filter(mode, args, config.extensions)?,
            choice: mode.classifier_choice(),
            classifier,
            summary_json: args.summary_json.clone(),
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.scheduler.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.policy.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        Ok(())
    }
}

fn resolve_filter(
    mode: Mode,
    args: &RunArgs,
    configured: Option<Vec<String>>,
) -> Result<Option<ExtensionFilter>> {
    if args.no_filter {
        return Ok(None);
    }
    if args.all_extensions {
        return Ok(Some(ExtensionFilter::all_supported()));
    }
    if !args.exts.is_empty() {
        return match ExtensionFilter::new(&args.exts) {
            Some(filter) => Ok(Some(filter)),
            None => bail!("no valid extensions given with --exts"),
        };
    }
    match configured {
        Some(list) => Ok(ExtensionFilter::new(list)),
        None => Ok(mode.default_filter()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use clap::Parser;
    use docsieve_classifiers::LlmProvider;
    use std::io::Write;

    fn command(args: &[&str]) -> Command {
        let mut argv = vec!["docsieve"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    fn env(pairs: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_keyword_mode_defaults() {
        let settings =
            RunSettings::resolve(RunConfig::default(), &command(&["keywords", "urls.txt"])).unwrap();

        assert_eq!(settings.mode, Mode::Keywords);
        assert_eq!(settings.output, PathBuf::from("sorted-keywords.txt"));
        assert_eq!(settings.write_mode, WriteMode::Overwrite);
        assert_eq!(settings.scheduler.concurrency, 5);
        assert_eq!(settings.scheduler.pacing, Duration::ZERO);
        assert_eq!(settings.filter, ExtensionFilter::new(["pdf"]));
        assert_eq!(settings.policy, BackoffPolicy::default());
    }

    #[test]
    fn test_ai_mode_defaults_and_overrides() {
        let settings = RunSettings::resolve(
            RunConfig::default(),
            &command(&["ai", "urls.txt", "--provider", "claude", "--model", "claude-3-opus", "--overwrite"]),
        )
        .unwrap();

        assert_eq!(settings.mode, Mode::Ai);
        assert_eq!(settings.output, PathBuf::from("suggestion.txt"));
        assert_eq!(settings.write_mode, WriteMode::Overwrite);
        assert_eq!(settings.scheduler.concurrency, 1);
        assert_eq!(settings.scheduler.pacing, Duration::from_millis(500));
        assert!(settings.filter.is_none());
        assert_eq!(settings.classifier.llm.provider, LlmProvider::Anthropic);
        assert_eq!(settings.classifier.llm.model.as_deref(), Some("claude-3-opus"));
    }

    #[test]
    fn test_cli_beats_file_and_env() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "concurrency: 8\npacing_ms: 50\nretry:\n  max_attempts: 2\nclassifier:\n  llm:\n    provider: gemini"
        )
        .unwrap();

        let config = RunConfig::load_from(
            Some(file.path()),
            env(&[("DOCSIEVE__CONCURRENCY", "3"), ("DOCSIEVE__EXTENSIONS", "pdf,docx")]),
        )
        .unwrap();
        assert_eq!(config.concurrency, Some(3));
        assert_eq!(config.pacing_ms, Some(50));
        assert_eq!(config.retry.max_attempts, 2);

        let settings =
            RunSettings::resolve(config, &command(&["keywords", "in.txt", "-j", "2"])).unwrap();
        assert_eq!(settings.scheduler.concurrency, 2);
        assert_eq!(settings.policy.max_attempts, 2);
        assert_eq!(settings.filter, ExtensionFilter::new(["docx", "pdf"]));
        assert_eq!(settings.classifier.llm.provider, LlmProvider::Gemini);
    }

    #[test]
    fn test_missing_explicit_config_file() {
        assert!(RunConfig::load_from(Some(Path::new("/no/such/docsieve.yaml")), env(&[])).is_err());
    }

    #[test]
    fn test_validation() {
        let config = RunConfig {
            concurrency: Some(0),
            ..Default::default()
        };
        assert!(RunSettings::resolve(config, &command(&["keywords", "in.txt"])).is_err());

        let settings =
            RunSettings::resolve(RunConfig::default(), &command(&["keywords", "in.txt", "--sequential"]))
                .unwrap();
        assert_eq!(settings.scheduler.concurrency, 1);

        assert!(RunSettings::resolve(
            RunConfig::default(),
            &command(&["keywords", "in.txt", "--max-attempts", "0"])
        )
        .is_err());
    }

    #[test]
    fn test_harvest_settings_layer() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "harvest:\n  check_delay_ms: 1000").unwrap();

        let config = RunConfig::load_from(
            Some(file.path()),
            env(&[("DOCSIEVE__HARVEST__ENDPOINT", "http://mirror.test/cdx")]),
        )
        .unwrap();
        assert_eq!(config.harvest.check_delay_ms, 1000);
        assert_eq!(config.harvest.endpoint, "http://mirror.test/cdx");
        assert_eq!(config.harvest.fetch_timeout_secs, 300);

        assert!(RunSettings::resolve(config, &command(&["harvest", "example.test"])).is_err());
    }

    #[test]
    fn test_filter_flags() {
        let settings =
            RunSettings::resolve(RunConfig::default(), &command(&["keywords", "in.txt", "--no-filter"]))
                .unwrap();
        assert!(settings.filter.is_none());

        let settings = RunSettings::resolve(
            RunConfig::default(),
            &command(&["ai", "in.txt", "--exts", "xlsx, sql"]),
        )
        .unwrap();
        assert_eq!(settings.filter, ExtensionFilter::new(["sql", "xlsx"]));

        assert!(RunSettings::resolve(
            RunConfig::default(),
            &command(&["keywords", "in.txt", "--exts", " , "])
        )
        .is_err());
    }
}
