//! Use cases and the routing policy table.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, RoutingConfig};

/// Declared purpose of a query, driving provider preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseCase {
    Healthcare,
    Accessibility,
    General,
    CostSensitive,
}

impl UseCase {
    pub const ALL: [UseCase; 4] = [
        UseCase::Healthcare,
        UseCase::Accessibility,
        UseCase::General,
        UseCase::CostSensitive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UseCase::Healthcare => "healthcare",
            UseCase::Accessibility => "accessibility",
            UseCase::General => "general",
            UseCase::CostSensitive => "cost_sensitive",
        }
    }

    /// Plain-language reason for the default preference order.
    pub fn explanation(self) -> &'static str {
        match self {
            UseCase::Healthcare => {
                "For healthcare questions, reliable and detailed models such as Gemini and Groq are tried first."
            }
            UseCase::Accessibility => {
                "For accessibility needs, fast models such as Groq and Gemini are preferred for clear, quick answers."
            }
            UseCase::General => {
                "For general questions, Groq and a local Ollama model balance speed and quality."
            }
            UseCase::CostSensitive => {
                "For cost-sensitive use, free local models such as Ollama come first, then free hosted tiers."
            }
        }
    }
}

impl fmt::Display for UseCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no use case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown use case '{0}' (expected healthcare, accessibility, general or cost_sensitive)")]
pub struct ParseUseCaseError(String);

impl FromStr for UseCase {
    type Err = ParseUseCaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        UseCase::ALL
            .into_iter()
            .find(|u| u.as_str() == normalized)
            .ok_or_else(|| ParseUseCaseError(s.to_string()))
    }
}

/// Static use case → ordered provider preference mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingPolicy {
    preferences: HashMap<UseCase, Vec<String>>,
    fallback_to_unlisted: bool,
}

fn order(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        let preferences = HashMap::from([
            (UseCase::Healthcare, order(&["gemini", "groq", "huggingface"])),
            (UseCase::Accessibility, order(&["groq", "gemini", "openrouter"])),
            (UseCase::General, order(&["groq", "ollama", "gemini"])),
            (UseCase::CostSensitive, order(&["ollama", "groq", "openrouter"])),
        ]);
        Self {
            preferences,
            fallback_to_unlisted: false,
        }
    }
}

impl RoutingPolicy {
    /// A table with no use cases at all.
    pub fn empty() -> Self {
        Self {
            preferences: HashMap::new(),
            fallback_to_unlisted: false,
        }
    }

    /// Defaults overlaid with the configured overrides.
    pub fn from_config(config: &RoutingConfig) -> Result<Self, ConfigError> {
        let mut policy = Self::default().with_unlisted_fallback(config.fallback_to_unlisted);
        for (use_case, ids) in config.parsed_preferences()? {
            policy = policy.with_preference(use_case, ids);
        }
        Ok(policy)
    }

    /// Set (or replace) the preference order for `use_case`.
    pub fn with_preference<I, S>(mut self, use_case: UseCase, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferences
            .insert(use_case, ids.into_iter().map(Into::into).collect());
        self
    }

    /// Drop `use_case` from the table.
    pub fn without(mut self, use_case: UseCase) -> Self {
        self.preferences.remove(&use_case);
        self
    }

    pub fn with_unlisted_fallback(mut self, enabled: bool) -> Self {
        self.fallback_to_unlisted = enabled;
        self
    }

    /// Ordered provider ids for `use_case`, or `None` if the table has no entry.
    pub fn preferences(&self, use_case: UseCase) -> Option<&[String]> {
        self.preferences.get(&use_case).map(Vec::as_slice)
    }

    pub fn fallback_to_unlisted(&self) -> bool {
        self.fallback_to_unlisted
    }
}
