//! Latency categories.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordinal speed category, fastest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedRating {
    VeryFast,
    Fast,
    Moderate,
    Slow,
    VerySlow,
}

impl SpeedRating {
    pub fn label(self) -> &'static str {
        match self {
            SpeedRating::VeryFast => "Very Fast",
            SpeedRating::Fast => "Fast",
            SpeedRating::Moderate => "Moderate",
            SpeedRating::Slow => "Slow",
            SpeedRating::VerySlow => "Very Slow",
        }
    }
}

impl fmt::Display for SpeedRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Exclusive upper bounds, in milliseconds, of each category below `VerySlow`.
///
/// A latency equal to a bound belongs to the next slower category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedThresholds {
    pub very_fast: u64,
    pub fast: u64,
    pub moderate: u64,
    pub slow: u64,
}

impl Default for SpeedThresholds {
    fn default() -> Self {
        Self {
            very_fast: 1000,
            fast: 3000,
            moderate: 5000,
            slow: 10000,
        }
    }
}

impl SpeedThresholds {
    /// Bounds must be strictly increasing.
    pub fn validate(&self) -> Result<(), String> {
        let bounds = [
            ("very_fast", self.very_fast),
            ("fast", self.fast),
            ("moderate", self.moderate),
            ("slow", self.slow),
        ];
        for pair in bounds.windows(2) {
            let (lower_name, lower) = pair[0];
            let (upper_name, upper) = pair[1];
            if lower >= upper {
                return Err(format!(
                    "speed threshold '{}' ({} ms) must be below '{}' ({} ms)",
                    lower_name, lower, upper_name, upper
                ));
            }
        }
        Ok(())
    }

    pub fn rate(&self, latency_ms: u64) -> SpeedRating {
        if latency_ms < self.very_fast {
            SpeedRating::VeryFast
        } else if latency_ms < self.fast {
            SpeedRating::Fast
        } else if latency_ms < self.moderate {
            SpeedRating::Moderate
        } else if latency_ms < self.slow {
            SpeedRating::Slow
        } else {
            SpeedRating::VerySlow
        }
    }
}

/// Rate `latency_ms` against the default thresholds.
pub fn speed_rating(latency_ms: u64) -> SpeedRating {
    SpeedThresholds::default().rate(latency_ms)
}
