//! Side-by-side comparison and ranking of response records.

use serde::Serialize;

use super::readability::{readability, Readability};
use super::speed::{SpeedRating, SpeedThresholds};
use crate::provider::{ProviderError, ResponseRecord};
use crate::router::QueryOutcomes;

/// Relative weight of readability and speed in the combined score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankingWeights {
    pub readability: f64,
    pub speed: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            readability: 0.5,
            speed: 0.5,
        }
    }
}

impl RankingWeights {
    pub fn readability_only() -> Self {
        Self {
            readability: 1.0,
            speed: 0.0,
        }
    }

    pub fn speed_only() -> Self {
        Self {
            readability: 0.0,
            speed: 1.0,
        }
    }

    /// Weights must be finite, non-negative, and not both zero.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [("readability", self.readability), ("speed", self.speed)] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!(
                    "{} weight must be a non-negative number, got {}",
                    name, value
                ));
            }
        }
        if self.readability == 0.0 && self.speed == 0.0 {
            return Err("readability and speed weights cannot both be zero".to_string());
        }
        Ok(())
    }
}

/// Scores for one response within a comparison.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub provider_name: String,
    pub model: String,
    pub latency_ms: u64,
    pub token_count: u32,
    pub estimated_cost: f64,
    pub response_length: usize,
    pub speed_rating: SpeedRating,
    pub readability: Readability,
    pub combined_score: f64,
}

/// Result of [`Evaluator::compare`].
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    /// One entry per input record, in input order.
    pub evaluations: Vec<Evaluation>,
    /// Indices into `evaluations`, best first.
    pub ranking: Vec<usize>,
    pub fastest: Option<String>,
    pub most_readable: Option<String>,
}

impl Comparison {
    /// Evaluations in rank order.
    pub fn ranked(&self) -> impl Iterator<Item = &Evaluation> {
        self.ranking.iter().map(|&i| &self.evaluations[i])
    }

    pub fn winner(&self) -> Option<&Evaluation> {
        self.ranked().next()
    }
}

/// A provider that failed during a fan-out query.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: ProviderError,
}

/// Result of [`Evaluator::compare_outcomes`].
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeComparison {
    pub total: usize,
    pub successful: usize,
    pub comparison: Comparison,
    pub failures: Vec<ProviderFailure>,
}

/// Stateless scorer holding the speed thresholds and ranking weights.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Evaluator {
    thresholds: SpeedThresholds,
    weights: RankingWeights,
}

impl Evaluator {
    pub fn new(thresholds: SpeedThresholds, weights: RankingWeights) -> Self {
        Self {
            thresholds,
            weights,
        }
    }

    pub fn with_weights(mut self, weights: RankingWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn thresholds(&self) -> SpeedThresholds {
        self.thresholds
    }

    pub fn weights(&self) -> RankingWeights {
        self.weights
    }

    /// Score one record on its own. Its speed component is always full.
    pub fn evaluate(&self, record: &ResponseRecord) -> Evaluation {
        self.evaluation(record, 1.0)
    }

    fn evaluation(&self, record: &ResponseRecord, speed_norm: f64) -> Evaluation {
        let readability = readability(record.content());
        let readability_norm = readability.flesch_reading_ease.clamp(0.0, 100.0) / 100.0;
        let combined_score =
            self.weights.readability * readability_norm + self.weights.speed * speed_norm;

        Evaluation {
            provider_name: record.provider_name().to_string(),
            model: record.model().to_string(),
            latency_ms: record.latency_ms(),
            token_count: record.token_count(),
            estimated_cost: record.estimated_cost(),
            response_length: record.content().chars().count(),
            speed_rating: self.thresholds.rate(record.latency_ms()),
            readability,
            combined_score,
        }
    }

    /// Evaluate and rank `records`.
    ///
    /// Speed is normalized across the batch: the fastest record scores 1.0,
    /// the slowest 0.0, and every record scores 1.0 when all latencies match.
    /// Ties in combined score keep input order.
    pub fn compare(&self, records: &[ResponseRecord]) -> Comparison {
        let min = records.iter().map(|r| r.latency_ms()).min().unwrap_or(0);
        let max = records.iter().map(|r| r.latency_ms()).max().unwrap_or(0);
        let span = max - min;

        let evaluations: Vec<Evaluation> = records
            .iter()
            .map(|record| {
                let speed_norm = if span == 0 {
                    1.0
                } else {
                    (max - record.latency_ms()) as f64 / span as f64
                };
                self.evaluation(record, speed_norm)
            })
            .collect();

        let mut ranking: Vec<usize> = (0..evaluations.len()).collect();
        ranking.sort_by(|&a, &b| {
            evaluations[b]
                .combined_score
                .total_cmp(&evaluations[a].combined_score)
        });

        let mut fastest: Option<&Evaluation> = None;
        let mut most_readable: Option<&Evaluation> = None;
        for eval in &evaluations {
            if fastest.map_or(true, |f| eval.latency_ms < f.latency_ms) {
                fastest = Some(eval);
            }
            if most_readable.map_or(true, |m| {
                eval.readability.flesch_reading_ease > m.readability.flesch_reading_ease
            }) {
                most_readable = Some(eval);
            }
        }
        let fastest = fastest.map(|e| e.provider_name.clone());
        let most_readable = most_readable.map(|e| e.provider_name.clone());

        tracing::debug!(
            responses = evaluations.len(),
            fastest = ?fastest,
            most_readable = ?most_readable,
            "Compared responses"
        );

        Comparison {
            evaluations,
            ranking,
            fastest,
            most_readable,
        }
    }

    /// Compare the successful entries of a fan-out and list the failures.
    pub fn compare_outcomes(&self, outcomes: &QueryOutcomes) -> OutcomeComparison {
        let mut records = Vec::new();
        let mut failures = Vec::new();
        for (provider, outcome) in outcomes {
            match outcome {
                Ok(record) => records.push(record.clone()),
                Err(error) => failures.push(ProviderFailure {
                    provider: provider.clone(),
                    error: error.clone(),
                }),
            }
        }

        OutcomeComparison {
            total: outcomes.len(),
            successful: records.len(),
            comparison: self.compare(&records),
            failures,
        }
    }
}
