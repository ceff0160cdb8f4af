//! Provider registry and query orchestration.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;

use super::policy::{RoutingPolicy, UseCase};
use crate::config::{convention_env_var_name, Config};
use crate::error::{CandidateFailure, Error, FailureReason, Result};
use crate::provider::{build_adapter, GenerateOptions, ProviderAdapter, ProviderError, ResponseRecord};

/// Per-provider outcome of [`Router::query_all`], keyed by provider id.
pub type QueryOutcomes = BTreeMap<String, std::result::Result<ResponseRecord, ProviderError>>;

/// Router over a registry of provider adapters.
///
/// The registry is a concurrent map: `register` may run while queries are in
/// flight, and every query snapshots the adapters it needs before awaiting.
pub struct Router {
    registry: DashMap<String, Arc<dyn ProviderAdapter>>,
    policy: RoutingPolicy,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RoutingPolicy::default())
    }
}

impl Router {
    /// Create an empty router with the given policy table.
    pub fn new(policy: RoutingPolicy) -> Self {
        Self {
            registry: DashMap::new(),
            policy,
        }
    }

    /// Build a router from configuration, registering every usable provider.
    ///
    /// Providers that need an API key and have none are skipped with a warning.
    pub fn from_config(config: &Config) -> Result<Self> {
        let policy = RoutingPolicy::from_config(&config.routing)?;
        let router = Self::new(policy);

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        for provider in &config.providers {
            match build_adapter(provider, client.clone())? {
                Some(adapter) => {
                    tracing::info!(
                        provider = %provider.name,
                        kind = %provider.kind(),
                        model = %provider.model(),
                        "Registered provider"
                    );
                    router.register(provider.name.clone(), adapter);
                }
                None => {
                    tracing::warn!(
                        provider = %provider.name,
                        env_var = %convention_env_var_name(&provider.name),
                        "No API key found, provider not registered"
                    );
                }
            }
        }

        Ok(router)
    }

    /// Insert or replace the adapter registered under `id`.
    pub fn register(&self, id: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) {
        let id = id.into();
        if self.registry.insert(id.clone(), adapter).is_some() {
            tracing::debug!(provider = %id, "Replaced registered provider");
        }
    }

    /// Remove the adapter registered under `id`. Returns whether one existed.
    pub fn deregister(&self, id: &str) -> bool {
        self.registry.remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.registry.contains_key(id)
    }

    /// Registered provider ids in sorted order.
    pub fn providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.registry.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    /// Clone the adapter handle out so no shard lock is held across an await.
    fn adapter(&self, id: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.registry.get(id).map(|entry| entry.value().clone())
    }

    /// Query one provider by id. Adapter errors are propagated unchanged.
    pub async fn query_single(
        &self,
        id: &str,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<ResponseRecord> {
        let adapter = self.adapter(id).ok_or_else(|| Error::NotRegistered {
            provider: id.to_string(),
        })?;

        tracing::debug!(provider = %id, "Querying single provider");
        Ok(adapter.generate(prompt, options).await?)
    }

    /// Query providers in the use case's preference order and return the first success.
    ///
    /// Unregistered candidates are skipped and failing ones are recorded; the
    /// next candidate is tried either way. Only preference order decides who
    /// goes first.
    pub async fn query_best_for_use_case(
        &self,
        prompt: &str,
        use_case: UseCase,
        options: &GenerateOptions,
    ) -> Result<ResponseRecord> {
        let preferred = self
            .policy
            .preferences(use_case)
            .ok_or(Error::UnroutedUseCase { use_case })?;

        let mut candidates: Vec<String> = preferred.to_vec();
        if self.policy.fallback_to_unlisted() {
            candidates.extend(
                self.providers()
                    .into_iter()
                    .filter(|id| !preferred.contains(id)),
            );
        }

        let mut failures = Vec::new();
        for id in candidates {
            let Some(adapter) = self.adapter(&id) else {
                tracing::debug!(provider = %id, use_case = %use_case, "Candidate not registered, skipping");
                failures.push(CandidateFailure {
                    provider: id,
                    reason: FailureReason::NotRegistered,
                });
                continue;
            };

            match adapter.generate(prompt, options).await {
                Ok(record) => {
                    tracing::info!(
                        provider = %id,
                        use_case = %use_case,
                        latency_ms = record.latency_ms(),
                        skipped = failures.len(),
                        "Selected provider for use case"
                    );
                    return Ok(record);
                }
                Err(err) => {
                    tracing::warn!(
                        provider = %id,
                        use_case = %use_case,
                        kind = ?err.kind,
                        error = %err.message,
                        "Candidate failed, trying next"
                    );
                    failures.push(CandidateFailure {
                        provider: id,
                        reason: FailureReason::Failed(err),
                    });
                }
            }
        }

        Err(Error::NoProviderAvailable {
            context: format!("use case '{}'", use_case),
            failures,
        })
    }

    /// Query every registered provider concurrently.
    ///
    /// Returns exactly one entry per registered provider, success or failure.
    /// Fails only when nothing is registered.
    pub async fn query_all(&self, prompt: &str, options: &GenerateOptions) -> Result<QueryOutcomes> {
        let adapters: Vec<(String, Arc<dyn ProviderAdapter>)> = self
            .registry
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        if adapters.is_empty() {
            return Err(Error::NoProviderAvailable {
                context: "query_all".to_string(),
                failures: Vec::new(),
            });
        }

        tracing::info!(providers = adapters.len(), "Querying all providers");

        let calls = adapters.into_iter().map(|(id, adapter)| async move {
            let outcome = adapter.generate(prompt, options).await;
            (id, outcome)
        });
        let outcomes: QueryOutcomes = join_all(calls).await.into_iter().collect();

        let succeeded = outcomes.values().filter(|o| o.is_ok()).count();
        tracing::info!(
            succeeded,
            failed = outcomes.len() - succeeded,
            "Collected provider responses"
        );

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderErrorKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Echo {
        name: &'static str,
        calls: AtomicU32,
    }

    impl Echo {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl ProviderAdapter for Echo {
        fn model(&self) -> &str {
            "echo"
        }

        async fn generate(
            &self,
            prompt: &str,
            _options: &GenerateOptions,
        ) -> std::result::Result<ResponseRecord, ProviderError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(ResponseRecord::new(self.name, "echo", prompt, Duration::from_millis(5)))
        }
    }

    struct Broken;

    #[async_trait]
    impl ProviderAdapter for Broken {
        fn model(&self) -> &str {
            "broken"
        }

        async fn generate(
            &self,
            _prompt: &str,
            _options: &GenerateOptions,
        ) -> std::result::Result<ResponseRecord, ProviderError> {
            Err(ProviderError::new(ProviderErrorKind::Auth, "bad key"))
        }
    }

    #[test]
    fn test_register_overwrites_and_deregisters() {
        let router = Router::default();
        router.register("groq", Echo::new("first"));
        router.register("groq", Echo::new("second"));
        router.register("ollama", Echo::new("ollama"));

        assert_eq!(router.providers(), vec!["groq", "ollama"]);
        assert!(router.deregister("groq"));
        assert!(!router.deregister("groq"));
        assert!(!router.contains("groq"));
    }

    #[tokio::test]
    async fn test_query_single_not_registered() {
        let router = Router::default();
        let err = router
            .query_single("groq", "hi", &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotRegistered { ref provider } if provider == "groq"));
    }

    #[tokio::test]
    async fn test_query_single_propagates_adapter_error() {
        let router = Router::default();
        router.register("groq", Arc::new(Broken));
        let err = router
            .query_single("groq", "hi", &GenerateOptions::default())
            .await
            .unwrap_err();
        match err {
            Error::Provider(e) => assert_eq!(e.kind, ProviderErrorKind::Auth),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unlisted_fallback_runs_after_preferences() {
        let policy = RoutingPolicy::empty()
            .with_preference(UseCase::General, ["groq"])
            .with_unlisted_fallback(true);
        let router = Router::new(policy);
        router.register("groq", Arc::new(Broken));
        router.register("zeta", Echo::new("zeta"));

        let record = router
            .query_best_for_use_case("hi", UseCase::General, &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(record.provider_name(), "zeta");
    }

    #[tokio::test]
    async fn test_unlisted_providers_ignored_by_default() {
        let policy = RoutingPolicy::empty().with_preference(UseCase::General, ["groq"]);
        let router = Router::new(policy);
        let zeta = Echo::new("zeta");
        router.register("zeta", zeta.clone());

        let err = router
            .query_best_for_use_case("hi", UseCase::General, &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoProviderAvailable { .. }));
        assert_eq!(zeta.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_first_success_stops_the_walk() {
        let policy = RoutingPolicy::empty().with_preference(UseCase::Healthcare, ["a", "b"]);
        let router = Router::new(policy);
        let a = Echo::new("a");
        let b = Echo::new("b");
        router.register("a", a.clone());
        router.register("b", b.clone());

        let record = router
            .query_best_for_use_case("hi", UseCase::Healthcare, &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(record.provider_name(), "a");
        assert_eq!(a.calls.load(Ordering::Relaxed), 1);
        assert_eq!(b.calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_from_config_skips_keyless_remote_providers() {
        let config = Config::parse_str(
            r#"
            [[providers]]
            name = "ollama"

            [[providers]]
            name = "openrouter"

            [[providers]]
            name = "groq"
            api_key = "gsk-test"
        "#,
        )
        .unwrap();

        let router = Router::from_config(&config).unwrap();
        assert_eq!(router.providers(), vec!["groq", "ollama"]);
    }
}
