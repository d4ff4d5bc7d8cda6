//! Configuration: `~/.auto-commit/config.yml`, environment and CLI flags.
//!
//! Precedence, highest first: CLI flag, environment variable, config file,
//! built-in default.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ConfigError;
use crate::llm::BackendKind;
use crate::llm::retry::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT, RetryPolicy};

/// Directory under the home directory holding config and templates.
const CONFIG_DIR_NAME: &str = ".auto-commit";

/// Config file name inside the config directory.
const CONFIG_FILE_NAME: &str = "config.yml";

/// Environment variable overriding the per-attempt timeout (milliseconds).
pub const TIMEOUT_ENV_VAR: &str = "AUTO_COMMIT_TIMEOUT_MS";

/// Environment variable overriding the attempt count.
pub const MAX_RETRIES_ENV_VAR: &str = "AUTO_COMMIT_MAX_RETRIES";

/// Model used with Codex when none is configured.
pub const DEFAULT_CODEX_MODEL: &str = "gpt-5.1";

/// Output language of the generated message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    Zh,
    En,
    Ja,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
            Language::Ja => "ja",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zh" => Ok(Language::Zh),
            "en" => Ok(Language::En),
            "ja" => Ok(Language::Ja),
            _ => Err(ConfigError::InvalidLanguage(s.to_string())),
        }
    }
}

/// Options that shape the prompt and drive the generation backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub language: Language,
    pub use_emoji: bool,
    pub conventional_commit: bool,
    pub commit_type: Option<String>,
    pub backend: BackendKind,
    pub model: Option<String>,
    pub max_retries: u32,
    pub timeout: Duration,
    pub executable_path: Option<PathBuf>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            language: Language::default(),
            use_emoji: true,
            conventional_commit: false,
            commit_type: None,
            backend: BackendKind::Codex,
            model: Some(DEFAULT_CODEX_MODEL.to_string()),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            executable_path: None,
        }
    }
}

impl GenerationOptions {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            timeout: self.timeout,
        }
    }
}

/// Options that control one pipeline run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub dry_run: bool,
    pub push: bool,
    pub verbose: bool,
    pub template_name: Option<String>,
    pub save_template: Option<String>,
    pub append_signature: bool,
    pub trace_id: Uuid,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            push: false,
            verbose: false,
            template_name: None,
            save_template: None,
            append_signature: true,
            trace_id: Uuid::new_v4(),
        }
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub generation: GenerationOptions,
    pub run: RunSettings,
}

/// Contents of `config.yml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    pub language: Option<String>,
    pub use_emoji: Option<bool>,
    pub conventional_commit: Option<bool>,
    pub commit_type: Option<String>,
    pub verbose: Option<bool>,
    pub push: Option<bool>,
    pub template_name: Option<String>,
    pub provider: Option<String>,
    pub claude_path: Option<PathBuf>,
    pub codex_path: Option<PathBuf>,
    pub model: Option<String>,
    pub codex_model: Option<String>,
    pub max_retries: Option<u32>,
    /// Per-attempt timeout in milliseconds.
    pub timeout: Option<u64>,
    pub append_signature: Option<bool>,
}

impl FileConfig {
    /// Read `path`. A missing file gives the defaults; an unreadable or
    /// malformed one is reported and also gives the defaults.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {}", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("Failed to read config {}: {}, using defaults", path.display(), e);
                return Self::default();
            }
        };
        Self::parse(&content).unwrap_or_else(|e| {
            warn!("Failed to parse config {}: {}, using defaults", path.display(), e);
            Self::default()
        })
    }

    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes as unit, not as a mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}

/// Values given on the command line. `None`/`false` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub language: Option<Language>,
    /// `Some(true)` for `--emoji`, `Some(false)` for `--no-emoji`.
    pub emoji: Option<bool>,
    pub conventional: bool,
    pub commit_type: Option<String>,
    pub dry_run: bool,
    pub verbose: bool,
    pub push: bool,
    pub template_name: Option<String>,
    pub save_template: Option<String>,
    pub backend: Option<BackendKind>,
    pub model: Option<String>,
    pub max_retries: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub no_signature: bool,
}

/// `~/.auto-commit`
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR_NAME))
        .ok_or(ConfigError::NoHomeDir)
}

/// `~/.auto-commit/config.yml`
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Read a numeric override from the environment.
///
/// Unset or empty means no override. A value that does not parse is
/// reported and ignored.
fn env_override(var: &str) -> Option<u64> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => match v.trim().parse::<u64>() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!("Invalid {} value '{}', ignoring it", var, v);
                None
            }
        },
        _ => None,
    }
}

impl Settings {
    /// Load the config file from its standard location and merge `cli`.
    pub fn load(cli: CliOverrides) -> Result<Self, ConfigError> {
        let file = FileConfig::load(&config_path()?);
        Self::resolve(file, cli)
    }

    /// Merge the layers into validated settings.
    pub fn resolve(file: FileConfig, cli: CliOverrides) -> Result<Self, ConfigError> {
        let language = match (cli.language, file.language.as_deref()) {
            (Some(language), _) => language,
            (None, Some(language)) => language.parse()?,
            (None, None) => Language::default(),
        };

        let backend = match (cli.backend, file.provider.as_deref()) {
            (Some(backend), _) => backend,
            (None, Some(provider)) => provider.parse()?,
            (None, None) => BackendKind::Codex,
        };

        let model = match backend {
            BackendKind::Claude => cli.model.or(file.model),
            BackendKind::Codex => cli
                .model
                .or(file.codex_model)
                .or(file.model)
                .or_else(|| Some(DEFAULT_CODEX_MODEL.to_string())),
        };

        let executable_path = match backend {
            BackendKind::Claude => file.claude_path,
            BackendKind::Codex => file.codex_path,
        };

        let max_retries = match cli.max_retries {
            Some(n) => n,
            None => env_override(MAX_RETRIES_ENV_VAR)
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                .or(file.max_retries)
                .unwrap_or(DEFAULT_MAX_RETRIES),
        };
        if max_retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }

        let timeout_ms = cli
            .timeout_ms
            .or_else(|| env_override(TIMEOUT_ENV_VAR))
            .or(file.timeout);
        let timeout = timeout_ms.map_or(DEFAULT_TIMEOUT, Duration::from_millis);
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        let commit_type = cli
            .commit_type
            .or(file.commit_type)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let conventional_commit =
            cli.conventional || file.conventional_commit.unwrap_or(false) || commit_type.is_some();

        let generation = GenerationOptions {
            language,
            use_emoji: cli.emoji.or(file.use_emoji).unwrap_or(true),
            conventional_commit,
            commit_type,
            backend,
            model,
            max_retries,
            timeout,
            executable_path,
        };

        let run = RunSettings {
            dry_run: cli.dry_run,
            push: cli.push || file.push.unwrap_or(false),
            verbose: cli.verbose || file.verbose.unwrap_or(false),
            template_name: cli.template_name.or(file.template_name),
            save_template: cli.save_template,
            append_signature: !cli.no_signature && file.append_signature.unwrap_or(true),
            trace_id: Uuid::new_v4(),
        };

        Ok(Self { generation, run })
    }
}
