//! multillm - Multi-provider LLM query routing and response evaluation
//!
//! This library wraps several text-generation backends behind one adapter
//! trait, routes prompts to them by declared use case, and scores the
//! responses for readability and speed.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod provider;
pub mod router;

pub use config::Config;
pub use error::{Error, Result};
pub use evaluator::{readability_score, speed_rating, Evaluator};
pub use provider::{GenerateOptions, ProviderAdapter, ProviderError, ResponseRecord};
pub use router::{Router, RoutingPolicy, UseCase};
