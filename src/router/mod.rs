//! Router module for provider selection.
//!
//! This module handles:
//! - The provider registry (register, deregister, lookup)
//! - Use-case routing through an ordered preference table
//! - Concurrent fan-out to every registered provider

mod policy;
mod selector;

pub use policy::{ParseUseCaseError, RoutingPolicy, UseCase};
pub use selector::{QueryOutcomes, Router};
