//! Configuration system (layered: defaults < config file < env).

use std::path::{Path, PathBuf};

use bon::Builder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter::ToolChoice;
use crate::capability::QualifiedName;
use crate::error::{Result, TesseraError};
use crate::naming::{MAX_TOOL_NAME_LEN, SOURCE_PREFIX_BUDGET};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "TESSERA_CONFIG";

pub const DEFAULT_MAX_STEPS: u32 = 5;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a research assistant. Use the available tools \
to gather evidence before answering, and cite what the tools return.";

fn default_max_steps() -> u32 {
    DEFAULT_MAX_STEPS
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_max_tool_name_len() -> usize {
    MAX_TOOL_NAME_LEN
}

fn default_source_prefix_budget() -> usize {
    SOURCE_PREFIX_BUDGET
}

/// Orchestrator settings shared by every run.
///
/// ```
/// use tessera::config::OrchestratorConfig;
///
/// let config = OrchestratorConfig::builder().max_steps(3).build();
/// assert_eq!(config.max_steps, 3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Step ceiling: a run stops after this many provider turns.
    #[builder(default = DEFAULT_MAX_STEPS)]
    pub max_steps: u32,
    pub temperature: Option<f64>,
    #[builder(default = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,
    /// Base system prompt; empty means none.
    #[builder(default = default_system_prompt(), into)]
    pub system_prompt: String,
    /// Capability whose result says whether the model wants another turn.
    pub continuation_capability: Option<QualifiedName>,
    #[builder(default = MAX_TOOL_NAME_LEN)]
    pub max_tool_name_len: usize,
    #[builder(default = SOURCE_PREFIX_BUDGET)]
    pub source_prefix_budget: usize,
    /// Check call input against the capability's descriptor before executing.
    #[builder(default)]
    pub validate_arguments: bool,
    #[builder(default)]
    pub tool_choice: ToolChoice,
    /// Per-call limit for capability execution; unset waits indefinitely.
    pub tool_timeout_ms: Option<u64>,
    /// Per-query limit for provider calls; unset waits indefinitely.
    pub provider_timeout_ms: Option<u64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            temperature: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: default_system_prompt(),
            continuation_capability: None,
            max_tool_name_len: default_max_tool_name_len(),
            source_prefix_budget: default_source_prefix_budget(),
            validate_arguments: false,
            tool_choice: ToolChoice::Auto,
            tool_timeout_ms: None,
            provider_timeout_ms: None,
        }
    }
}

impl OrchestratorConfig {
    /// Defaults, then the config file, then the environment (`.env` included).
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = match config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `TESSERA_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(raw) = var("TESSERA_MAX_STEPS") {
            self.max_steps = parse_env("TESSERA_MAX_STEPS", &raw)?;
        }
        if let Some(raw) = var("TESSERA_TEMPERATURE") {
            self.temperature = Some(parse_env("TESSERA_TEMPERATURE", &raw)?);
        }
        if let Some(raw) = var("TESSERA_MAX_TOKENS") {
            self.max_tokens = parse_env("TESSERA_MAX_TOKENS", &raw)?;
        }
        if let Some(prompt) = var("TESSERA_SYSTEM_PROMPT") {
            self.system_prompt = prompt;
        }
        if let Some(raw) = var("TESSERA_CONTINUATION_CAPABILITY") {
            self.continuation_capability = Some(QualifiedName::parse(&raw).map_err(|_| {
                TesseraError::Configuration(format!(
                    "TESSERA_CONTINUATION_CAPABILITY must be 'source/capability', got '{raw}'"
                ))
            })?);
        }
        if let Some(raw) = var("TESSERA_VALIDATE_ARGUMENTS") {
            self.validate_arguments = parse_bool("TESSERA_VALIDATE_ARGUMENTS", &raw)?;
        }
        if let Some(raw) = var("TESSERA_TOOL_TIMEOUT_MS") {
            self.tool_timeout_ms = Some(parse_env("TESSERA_TOOL_TIMEOUT_MS", &raw)?);
        }
        if let Some(raw) = var("TESSERA_PROVIDER_TIMEOUT_MS") {
            self.provider_timeout_ms = Some(parse_env("TESSERA_PROVIDER_TIMEOUT_MS", &raw)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(TesseraError::Configuration(
                "max_steps must be at least 1".into(),
            ));
        }
        if self.source_prefix_budget == 0
            || self.source_prefix_budget + 2 > self.max_tool_name_len
        {
            return Err(TesseraError::Configuration(format!(
                "source_prefix_budget {} does not fit max_tool_name_len {}",
                self.source_prefix_budget, self.max_tool_name_len
            )));
        }
        if self.tool_timeout_ms == Some(0) || self.provider_timeout_ms == Some(0) {
            return Err(TesseraError::Configuration(
                "timeouts must be positive; leave them unset to wait indefinitely".into(),
            ));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(TesseraError::Configuration(format!(
                    "temperature {temperature} is outside 0.0..=2.0"
                )));
            }
        }
        Ok(())
    }
}

/// `$TESSERA_CONFIG`, else `~/.tessera/config.toml`.
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(explicit));
    }
    directories::UserDirs::new().map(|dirs| dirs.home_dir().join(".tessera").join("config.toml"))
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| TesseraError::Configuration(format!("invalid {name} '{raw}': {e}")))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TesseraError::Configuration(format!(
            "invalid {name} '{raw}': expected a boolean"
        ))),
    }
}
