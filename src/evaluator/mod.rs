//! Response evaluation: readability, speed, and side-by-side ranking.
//!
//! Everything here is pure. The [`Evaluator`] only carries the thresholds
//! and weights it was built with.

mod compare;
mod readability;
mod speed;

pub use compare::{
    Comparison, Evaluation, Evaluator, OutcomeComparison, ProviderFailure, RankingWeights,
};
pub use readability::{
    count_syllables, readability, readability_score, Readability, ReadabilityBand,
    READABILITY_SENTINEL,
};
pub use speed::{speed_rating, SpeedRating, SpeedThresholds};
