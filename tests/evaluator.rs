//! Integration tests for readability, speed ratings, and end-to-end ranking.
//!
//! The ranking scenarios run a real `query_all` fan-out over adapters that
//! sleep on the paused tokio clock, so measured latencies are exact.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use multillm::evaluator::{
    readability, readability_score, speed_rating, Evaluator, RankingWeights, SpeedRating,
    SpeedThresholds, READABILITY_SENTINEL,
};
use multillm::provider::{GenerateOptions, ProviderAdapter, ProviderError, ResponseRecord};
use multillm::{Router, RoutingPolicy, UseCase};

const EASY_TEXT: &str = "Walk each day. Drink lots of water. Get good sleep. It helps you feel well.";
const HARD_TEXT: &str = "Comprehensive cardiovascular optimization necessitates individualized \
                         physiological assessment, incorporating multidimensional \
                         epidemiological considerations regarding predisposition.";

/// Adapter that waits `delay` on the tokio clock, then returns `text`.
struct Delayed {
    name: &'static str,
    text: &'static str,
    delay: Duration,
}

#[async_trait]
impl ProviderAdapter for Delayed {
    fn model(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<ResponseRecord, ProviderError> {
        let start = tokio::time::Instant::now();
        tokio::time::sleep(self.delay).await;
        Ok(ResponseRecord::new(self.name, "mock", self.text, start.elapsed()))
    }
}

fn two_provider_router(fast_text: &'static str, slow_text: &'static str) -> Router {
    let policy = RoutingPolicy::empty().with_preference(UseCase::General, ["fast", "slow"]);
    let router = Router::new(policy);
    router.register(
        "fast",
        Arc::new(Delayed {
            name: "fast",
            text: fast_text,
            delay: Duration::ZERO,
        }),
    );
    router.register(
        "slow",
        Arc::new(Delayed {
            name: "slow",
            text: slow_text,
            delay: Duration::from_millis(6000),
        }),
    );
    router
}

async fn gather(router: &Router) -> Vec<ResponseRecord> {
    let outcomes = router
        .query_all("How do I stay healthy?", &GenerateOptions::default())
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 2);
    outcomes.into_values().map(|o| o.unwrap()).collect()
}

fn ranked_names(evaluator: &Evaluator, records: &[ResponseRecord]) -> Vec<String> {
    evaluator
        .compare(records)
        .ranked()
        .map(|e| e.provider_name.clone())
        .collect()
}

// ── Readability ───────────────────────────────────────────────────

/// Empty input yields the finite sentinel.
#[test]
fn test_empty_text_sentinel() {
    let score = readability_score("");
    assert!(score.is_finite());
    assert_eq!(score, READABILITY_SENTINEL);
    assert_eq!(readability("").flesch_kincaid_grade, READABILITY_SENTINEL);
}

/// Same text, same score, every time.
#[test]
fn test_readability_is_deterministic() {
    let first = readability(HARD_TEXT);
    for _ in 0..10 {
        assert_eq!(readability(HARD_TEXT), first);
    }
}

/// Plain text outranks dense text on both Flesch measures.
#[test]
fn test_easy_text_reads_easier() {
    let easy = readability(EASY_TEXT);
    let hard = readability(HARD_TEXT);
    assert!(easy.flesch_reading_ease > hard.flesch_reading_ease);
    assert!(easy.flesch_kincaid_grade < hard.flesch_kincaid_grade);
}

// ── Speed ─────────────────────────────────────────────────────────

/// Extremes and both sides of every default threshold.
#[test]
fn test_speed_rating_boundaries() {
    assert_eq!(speed_rating(0), SpeedRating::VeryFast);
    assert_eq!(speed_rating(u64::MAX), SpeedRating::VerySlow);

    let t = SpeedThresholds::default();
    let expected = [
        (t.very_fast, SpeedRating::VeryFast, SpeedRating::Fast),
        (t.fast, SpeedRating::Fast, SpeedRating::Moderate),
        (t.moderate, SpeedRating::Moderate, SpeedRating::Slow),
        (t.slow, SpeedRating::Slow, SpeedRating::VerySlow),
    ];
    for (bound, below, at) in expected {
        assert_eq!(speed_rating(bound - 1), below, "{} ms", bound - 1);
        assert_eq!(speed_rating(bound), at, "{} ms", bound);
    }
}

// ── End-to-end ranking ────────────────────────────────────────────

/// Fast/plain vs slow/dense: speed weighting puts "fast" first, and so does
/// readability weighting, because "fast" is also the easier read.
#[tokio::test(start_paused = true)]
async fn test_fast_plain_provider_ranks_first() {
    let router = two_provider_router(EASY_TEXT, HARD_TEXT);
    let records = gather(&router).await;

    let by_speed = Evaluator::default().with_weights(RankingWeights::speed_only());
    assert_eq!(ranked_names(&by_speed, &records), ["fast", "slow"]);

    let by_readability = Evaluator::default().with_weights(RankingWeights::readability_only());
    assert_eq!(ranked_names(&by_readability, &records), ["fast", "slow"]);

    let comparison = Evaluator::default().compare(&records);
    assert_eq!(comparison.fastest.as_deref(), Some("fast"));
    assert_eq!(comparison.most_readable.as_deref(), Some("fast"));

    let slow = comparison
        .evaluations
        .iter()
        .find(|e| e.provider_name == "slow")
        .unwrap();
    assert!(slow.latency_ms >= 6000);
    assert_eq!(slow.speed_rating, SpeedRating::Slow);
}

/// Fast/dense vs slow/plain: the weights decide, and flipping them flips the order.
#[tokio::test(start_paused = true)]
async fn test_weights_decide_between_speed_and_readability() {
    let router = two_provider_router(HARD_TEXT, EASY_TEXT);
    let records = gather(&router).await;

    let by_speed = Evaluator::default().with_weights(RankingWeights::speed_only());
    assert_eq!(ranked_names(&by_speed, &records), ["fast", "slow"]);

    let by_readability = Evaluator::default().with_weights(RankingWeights::readability_only());
    assert_eq!(ranked_names(&by_readability, &records), ["slow", "fast"]);

    let comparison = Evaluator::default().compare(&records);
    assert_eq!(comparison.fastest.as_deref(), Some("fast"));
    assert_eq!(comparison.most_readable.as_deref(), Some("slow"));
}

/// The routed single answer comes from the first preference.
#[tokio::test(start_paused = true)]
async fn test_routed_answer_is_evaluated() {
    let router = two_provider_router(EASY_TEXT, HARD_TEXT);
    let record = router
        .query_best_for_use_case("hi", UseCase::General, &GenerateOptions::default())
        .await
        .unwrap();

    let evaluation = Evaluator::default().evaluate(&record);
    assert_eq!(evaluation.provider_name, "fast");
    assert_eq!(evaluation.speed_rating, SpeedRating::VeryFast);
    assert!(evaluation.readability.flesch_reading_ease > 60.0);
}

/// Fan-out failures are counted next to the ranked successes.
#[tokio::test]
async fn test_compare_outcomes_over_fan_out() {
    struct Down;

    #[async_trait]
    impl ProviderAdapter for Down {
        fn model(&self) -> &str {
            "down"
        }

        async fn generate(
            &self,
            _prompt: &str,
            _options: &GenerateOptions,
        ) -> Result<ResponseRecord, ProviderError> {
            Err(ProviderError::new(
                multillm::provider::ProviderErrorKind::Unavailable,
                "connection refused",
            ))
        }
    }

    let router = two_provider_router(EASY_TEXT, HARD_TEXT);
    router.deregister("slow");
    router.register("down", Arc::new(Down));

    let outcomes = router
        .query_all("hi", &GenerateOptions::default())
        .await
        .unwrap();
    let result = Evaluator::default().compare_outcomes(&outcomes);

    assert_eq!(result.total, 2);
    assert_eq!(result.successful, 1);
    assert_eq!(result.failures[0].provider, "down");
    assert_eq!(result.comparison.winner().unwrap().provider_name, "fast");

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["failures"][0]["error"]["kind"], "unavailable");
}
