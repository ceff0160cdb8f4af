//! Configuration parsing and validation for multillm.
//!
//! A config file is plain TOML. Loading happens in two steps: the file is
//! deserialized as written, then API keys are resolved (`${VAR}` references
//! expanded, missing keys looked up as `<NAME>_API_KEY`) and the result is
//! validated.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use crate::evaluator::{Evaluator, RankingWeights, SpeedThresholds};
use crate::router::UseCase;

const REDACTED: &str = "[REDACTED]";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub providers: Vec<ProviderConfig>,
    pub routing: RoutingConfig,
    pub evaluation: EvaluationConfig,
    pub logging: LoggingConfig,
}

/// Provider credential. Never printed or serialized in clear.
///
/// The only way to the raw value is [`ApiKey::expose_secret`].
#[derive(Clone, Deserialize)]
#[serde(from = "String")]
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    /// Empty or whitespace-only keys authenticate nothing.
    pub fn is_blank(&self) -> bool {
        self.expose_secret().trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

impl From<String> for ApiKey {
    fn from(raw: String) -> Self {
        ApiKey(SecretString::from(raw))
    }
}

impl From<&str> for ApiKey {
    fn from(raw: &str) -> Self {
        ApiKey::from(raw.to_string())
    }
}

/// Where a provider's API key came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Written out in the config file.
    Literal,
    /// Built from `${VAR}` references in the config file.
    Expanded,
    /// Read from the `<NAME>_API_KEY` variable named here.
    Convention(String),
    /// Nowhere.
    Missing,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Literal => f.write_str("literal"),
            KeySource::Expanded => f.write_str("expanded"),
            KeySource::Convention(var) => write!(f, "env {}", var),
            KeySource::Missing => f.write_str("missing"),
        }
    }
}

/// Wire protocol spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    Ollama,
    Gemini,
    #[serde(rename = "huggingface")]
    HuggingFace,
}

impl ProviderKind {
    /// Local backends run without credentials.
    pub fn requires_api_key(self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAiCompatible => "openai_compatible",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Gemini => "gemini",
            ProviderKind::HuggingFace => "huggingface",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Defaults for the backends multillm knows by name.
struct KnownProvider {
    name: &'static str,
    kind: ProviderKind,
    url: &'static str,
    model: &'static str,
}

const KNOWN_PROVIDERS: [KnownProvider; 5] = [
    KnownProvider {
        name: "groq",
        kind: ProviderKind::OpenAiCompatible,
        url: "https://api.groq.com/openai/v1",
        model: "llama3-8b-8192",
    },
    KnownProvider {
        name: "openrouter",
        kind: ProviderKind::OpenAiCompatible,
        url: "https://openrouter.ai/api/v1",
        model: "meta-llama/llama-3-8b-instruct:free",
    },
    KnownProvider {
        name: "ollama",
        kind: ProviderKind::Ollama,
        url: "http://localhost:11434",
        model: "llama3",
    },
    KnownProvider {
        name: "gemini",
        kind: ProviderKind::Gemini,
        url: "https://generativelanguage.googleapis.com/v1beta",
        model: "gemini-pro",
    },
    KnownProvider {
        name: "huggingface",
        kind: ProviderKind::HuggingFace,
        url: "https://api-inference.huggingface.co/models",
        model: "mistralai/Mistral-7B-Instruct-v0.1",
    },
];

/// Provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Unique name for this provider; also its registry id
    pub name: String,
    /// Protocol; inferred from well-known names when omitted
    pub kind: Option<ProviderKind>,
    /// Base URL; defaults per well-known provider or kind
    pub url: Option<String>,
    /// Model to request; defaults per well-known provider or kind
    pub model: Option<String>,
    /// Optional API key
    pub api_key: Option<ApiKey>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts on transient failures
    #[serde(default)]
    pub max_retries: u32,
    /// Price per 1000 tokens (0 for free tiers and local models)
    #[serde(default)]
    pub cost_per_1k_tokens: f64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl ProviderConfig {
    fn known(&self) -> Option<&'static KnownProvider> {
        let by_name = KNOWN_PROVIDERS
            .iter()
            .find(|k| k.name == self.name && self.kind.map_or(true, |kind| kind == k.kind));
        // Single-endpoint protocols have a canonical default under any name
        by_name.or_else(|| match self.kind {
            Some(kind) if kind != ProviderKind::OpenAiCompatible => {
                KNOWN_PROVIDERS.iter().find(|k| k.kind == kind)
            }
            _ => None,
        })
    }

    /// Resolved protocol.
    pub fn kind(&self) -> ProviderKind {
        self.kind
            .or_else(|| self.known().map(|k| k.kind))
            .unwrap_or(ProviderKind::OpenAiCompatible)
    }

    /// Resolved base URL, empty when neither configured nor known.
    pub fn base_url(&self) -> &str {
        self.url
            .as_deref()
            .or_else(|| self.known().map(|k| k.url))
            .unwrap_or("")
    }

    /// Resolved model, empty when neither configured nor known.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .or_else(|| self.known().map(|k| k.model))
            .unwrap_or("")
    }
}

/// Routing configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutingConfig {
    /// After the preference list is exhausted, try every other registered provider
    #[serde(default)]
    pub fallback_to_unlisted: bool,
    /// Per-use-case preference overrides, keyed by use case name
    #[serde(default)]
    pub preferences: BTreeMap<String, Vec<String>>,
}

impl RoutingConfig {
    /// Parse the override keys into use cases.
    pub fn parsed_preferences(&self) -> Result<Vec<(UseCase, Vec<String>)>, ConfigError> {
        self.preferences
            .iter()
            .map(|(key, order)| {
                UseCase::from_str(key)
                    .map(|use_case| (use_case, order.clone()))
                    .map_err(|e| ConfigError::Validation(format!("routing.preferences: {}", e)))
            })
            .collect()
    }
}

/// Evaluation constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub speed_thresholds_ms: SpeedThresholds,
    pub readability_weight: f64,
    pub speed_weight: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        let weights = RankingWeights::default();
        Self {
            speed_thresholds_ms: SpeedThresholds::default(),
            readability_weight: weights.readability,
            speed_weight: weights.speed,
        }
    }
}

impl EvaluationConfig {
    pub fn weights(&self) -> RankingWeights {
        RankingWeights {
            readability: self.readability_weight,
            speed: self.speed_weight,
        }
    }

    /// Build an evaluator from these constants.
    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(self.speed_thresholds_ms, self.weights())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for the `multillm` target when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Provider '{provider}': cannot resolve ${{{var}}}: {reason}")]
    EnvVar {
        var: String,
        provider: String,
        reason: String,
    },
}

impl ProviderConfig {
    fn check(&self) -> Result<(), String> {
        let name = &self.name;
        if name.trim().is_empty() {
            return Err("provider with empty name".to_string());
        }
        if self.base_url().is_empty() {
            return Err(format!("provider '{}' has no URL and no known default", name));
        }
        if self.model().is_empty() {
            return Err(format!("provider '{}' has no model and no known default", name));
        }
        if self.timeout_secs == 0 {
            return Err(format!("provider '{}' has a zero timeout", name));
        }
        if !self.cost_per_1k_tokens.is_finite() || self.cost_per_1k_tokens < 0.0 {
            return Err(format!("provider '{}' has a negative or non-finite cost", name));
        }
        Ok(())
    }
}

impl Config {
    /// Parse and validate a TOML string. API keys are taken as written.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML string, resolve keys from the process environment, and validate.
    pub fn parse_str_with_env(
        content: &str,
    ) -> Result<(Self, Vec<(String, KeySource)>), ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        let sources = config.resolve_keys_with(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok((config, sources))
    }

    /// Read, parse, resolve, and validate a config file.
    ///
    /// Also returns where each provider's key came from, in file order.
    pub fn from_file_with_env(
        path: impl AsRef<Path>,
    ) -> Result<(Self, Vec<(String, KeySource)>), ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_str_with_env(&content)
    }

    /// Resolve every provider's API key through `lookup`.
    ///
    /// A key containing `${VAR}` is expanded; any other key is kept; an
    /// absent key is looked up under [`convention_env_var_name`]. Blank
    /// values count as absent, so a provider with only a blank key ends up
    /// with `KeySource::Missing`.
    pub fn resolve_keys_with<F>(&mut self, lookup: F) -> Result<Vec<(String, KeySource)>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut sources = Vec::with_capacity(self.providers.len());
        for provider in &mut self.providers {
            let written = provider.api_key.take().filter(|key| !key.is_blank());
            let source = match written {
                Some(key) if key.expose_secret().contains("${") => {
                    let expanded = expand_references(key.expose_secret(), &provider.name, &lookup)?;
                    if expanded.trim().is_empty() {
                        KeySource::Missing
                    } else {
                        provider.api_key = Some(ApiKey::from(expanded));
                        KeySource::Expanded
                    }
                }
                Some(key) => {
                    provider.api_key = Some(key);
                    KeySource::Literal
                }
                None => {
                    let var = convention_env_var_name(&provider.name);
                    match lookup(&var).filter(|value| !value.trim().is_empty()) {
                        Some(value) => {
                            provider.api_key = Some(ApiKey::from(value));
                            KeySource::Convention(var)
                        }
                        None => KeySource::Missing,
                    }
                }
            };
            tracing::debug!(provider = %provider.name, source = %source, "Resolved API key");
            sources.push((provider.name.clone(), source));
        }
        Ok(sources)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            tracing::warn!("No providers configured, every query will fail");
        }

        let mut names = HashSet::new();
        for provider in &self.providers {
            provider.check().map_err(ConfigError::Validation)?;
            if !names.insert(provider.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "provider '{}' is configured more than once",
                    provider.name
                )));
            }
        }

        self.routing.parsed_preferences()?;
        self.evaluation
            .speed_thresholds_ms
            .validate()
            .map_err(ConfigError::Validation)?;
        self.evaluation
            .weights()
            .validate()
            .map_err(ConfigError::Validation)?;
        Ok(())
    }
}

fn env_reference() -> &'static Regex {
    static REFERENCE: OnceLock<Regex> = OnceLock::new();
    REFERENCE.get_or_init(|| Regex::new(r"\$\{([^}]*)\}").expect("reference pattern is valid"))
}

/// Replace each `${VAR}` in `value` with `lookup(VAR)`.
fn expand_references<F>(value: &str, provider: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env_error = |var: &str, reason: &str| ConfigError::EnvVar {
        var: var.to_string(),
        provider: provider.to_string(),
        reason: reason.to_string(),
    };

    let mut expanded = String::with_capacity(value.len());
    let mut cursor = 0;
    for caps in env_reference().captures_iter(value) {
        let (Some(whole), Some(var)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let var = var.as_str().trim();
        if var.is_empty() {
            return Err(env_error("", "empty variable name"));
        }
        let resolved = lookup(var).ok_or_else(|| env_error(var, "variable is not set"))?;
        expanded.push_str(&value[cursor..whole.start()]);
        expanded.push_str(&resolved);
        cursor = whole.end();
    }

    let tail = &value[cursor..];
    if tail.contains("${") {
        return Err(env_error("?", "unclosed '${' reference"));
    }
    expanded.push_str(tail);
    Ok(expanded)
}

/// Environment variable consulted when a provider has no `api_key`:
/// `groq` -> `GROQ_API_KEY`, `my-router` -> `MY_ROUTER_API_KEY`.
pub fn convention_env_var_name(provider_name: &str) -> String {
    let stem: String = provider_name
        .trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' | '.' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();
    format!("{}_API_KEY", stem)
}
