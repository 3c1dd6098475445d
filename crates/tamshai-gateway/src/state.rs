use std::{env, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use tamshai_auth::prelude::ServerRegistry;
use tamshai_cache::prelude::{build_store, ConfirmationStore, ContextCache, SharedKv};
use tamshai_llm::prelude::{build_generator, SharedGenerator};
use tamshai_net::prelude::{HttpQueryClient, NetMetrics, QueryClient};

use crate::config::GatewayConfig;
use crate::metrics::GatewayMetrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub version: VersionInfo,
    pub registry: Arc<ServerRegistry>,
    pub client: Arc<dyn QueryClient>,
    pub generator: SharedGenerator,
    pub context_cache: ContextCache,
    pub confirmations: ConfirmationStore,
    pub metrics: GatewayMetrics,
    pub net_metrics: NetMetrics,
}

impl AppState {
    pub async fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let registry = config.registry()?;
        let net_metrics = NetMetrics::default();
        let client = HttpQueryClient::builder()
            .with_policy(config.query_policy())
            .with_metrics(net_metrics.clone())
            .build()
            .map_err(|err| anyhow!("failed to build domain server client: {err}"))?;
        let generator =
            build_generator(&config.llm).map_err(|err| anyhow!("llm provider: {err}"))?;
        let store = build_store(&config.cache.backend)
            .await
            .map_err(|err| anyhow!("cache backend: {err}"))
            .context("failed to initialise the shared store")?;

        Ok(Self::from_parts(
            config,
            registry,
            Arc::new(client),
            generator,
            store,
        )
        .with_net_metrics(net_metrics))
    }

    /// Assembles state from already-built collaborators.
    pub fn from_parts(
        config: GatewayConfig,
        registry: ServerRegistry,
        client: Arc<dyn QueryClient>,
        generator: SharedGenerator,
        store: SharedKv,
    ) -> Self {
        let context_ttl = Duration::from_secs(config.cache.context_ttl_secs);
        let confirmation_ttl = Duration::from_secs(config.cache.confirmation_ttl_secs);
        Self {
            config: Arc::new(config),
            version: VersionInfo::from_env(),
            registry: Arc::new(registry),
            client,
            generator,
            context_cache: ContextCache::new(store.clone(), context_ttl),
            confirmations: ConfirmationStore::new(store, confirmation_ttl),
            metrics: GatewayMetrics::default(),
            net_metrics: NetMetrics::default(),
        }
    }

    fn with_net_metrics(mut self, metrics: NetMetrics) -> Self {
        self.net_metrics = metrics;
        self
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeouts.query_ms)
    }

    pub fn heartbeat(&self) -> Option<Duration> {
        self.config.stream.heartbeat()
    }
}

#[derive(Clone)]
pub struct VersionInfo {
    pub version: String,
    pub commit: Option<String>,
}

impl VersionInfo {
    pub fn from_env() -> Self {
        Self {
            version: env::var("TAMSHAI_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            commit: env::var("GIT_COMMIT_HASH").ok(),
        }
    }
}
