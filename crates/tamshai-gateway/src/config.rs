use std::{env, path::Path, time::Duration};

use anyhow::{anyhow, bail, Context};
use config::Config;
use serde::{Deserialize, Serialize};
use tamshai_auth::prelude::{ServerConfig, ServerRegistry};
use tamshai_cache::prelude::CacheBackendConfig;
use tamshai_llm::prelude::LlmProviderConfig;
use tamshai_net::prelude::QueryPolicy;
use tracing::warn;
use url::Url;

pub const CONFIG_FILE_ENV: &str = "TAMSHAI_CONFIG_FILE";
pub const ENV_PREFIX: &str = "TAMSHAI";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ListenConfig,
    #[serde(default)]
    pub servers: Vec<DomainServerConfig>,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub llm: LlmProviderConfig,
}

impl GatewayConfig {
    /// File named by `TAMSHAI_CONFIG_FILE` (if present), then `TAMSHAI__*`
    /// environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let config_file = env::var(CONFIG_FILE_ENV)
            .unwrap_or_else(|_| "config/gateway.local.toml".to_string());

        let mut builder = Config::builder()
            .set_default("server.address", ListenConfig::default_address())?
            .set_default("server.port", ListenConfig::default_port())?;

        if Path::new(&config_file).exists() {
            builder = builder.add_source(config::File::from(Path::new(&config_file)));
        }

        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

        let config: GatewayConfig = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let config: GatewayConfig = Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .context("failed to parse configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the gateway cannot run with. Returns the non-fatal
    /// findings, which are also logged.
    pub fn validate(&self) -> anyhow::Result<Vec<String>> {
        let t = &self.timeouts;
        for (name, value) in [
            ("timeouts.read_ms", t.read_ms),
            ("timeouts.write_ms", t.write_ms),
            ("timeouts.query_ms", t.query_ms),
            ("cache.context_ttl_secs", self.cache.context_ttl_secs),
            ("cache.confirmation_ttl_secs", self.cache.confirmation_ttl_secs),
        ] {
            if value == 0 {
                bail!("{name} must be greater than zero");
            }
        }
        if t.write_ms < t.read_ms {
            bail!(
                "timeouts.write_ms ({}) must not be shorter than timeouts.read_ms ({})",
                t.write_ms,
                t.read_ms
            );
        }
        if self.pagination.max_pages == 0 {
            bail!("pagination.max_pages must be at least 1");
        }

        self.registry()?;

        let mut findings = Vec::new();
        if t.query_ms < t.read_ms {
            findings.push(format!(
                "timeouts.query_ms ({}) is shorter than timeouts.read_ms ({}); slow servers will be cut off by the orchestration bound",
                t.query_ms, t.read_ms
            ));
        }
        if self.servers.is_empty() {
            findings.push("no domain servers configured; queries will run without data".into());
        }
        for finding in &findings {
            warn!(target: "tamshai::config", "{finding}");
        }
        Ok(findings)
    }

    pub fn registry(&self) -> anyhow::Result<ServerRegistry> {
        let servers = self
            .servers
            .iter()
            .map(DomainServerConfig::to_server)
            .collect::<anyhow::Result<Vec<_>>>()?;
        ServerRegistry::new(servers).map_err(|err| anyhow!("invalid server registry: {err}"))
    }

    pub fn query_policy(&self) -> QueryPolicy {
        QueryPolicy::default()
            .with_read_timeout(Duration::from_millis(self.timeouts.read_ms))
            .with_write_timeout(Duration::from_millis(self.timeouts.write_ms))
            .with_max_pages(self.pagination.max_pages)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "ListenConfig::default_address")]
    pub address: String,
    #[serde(default = "ListenConfig::default_port")]
    pub port: u16,
}

impl ListenConfig {
    fn default_address() -> String {
        "127.0.0.1".to_string()
    }

    fn default_port() -> u16 {
        3100
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: Self::default_address(),
            port: Self::default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainServerConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub required_roles: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl DomainServerConfig {
    fn to_server(&self) -> anyhow::Result<ServerConfig> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("server '{}' has an invalid base_url", self.name))?;
        if url.cannot_be_a_base() {
            bail!("server '{}' base_url must be an absolute http(s) URL", self.name);
        }
        if self.required_roles.is_empty() {
            bail!("server '{}' must declare at least one required role", self.name);
        }
        Ok(ServerConfig::new(
            &self.name,
            url,
            self.required_roles.iter().cloned(),
            &self.description,
        ))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "TimeoutConfig::default_read_ms")]
    pub read_ms: u64,
    #[serde(default = "TimeoutConfig::default_write_ms")]
    pub write_ms: u64,
    /// Bound on one whole fan-out, independent of the per-call timeouts.
    #[serde(default = "TimeoutConfig::default_query_ms")]
    pub query_ms: u64,
}

impl TimeoutConfig {
    fn default_read_ms() -> u64 {
        5_000
    }

    fn default_write_ms() -> u64 {
        10_000
    }

    fn default_query_ms() -> u64 {
        8_000
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_ms: Self::default_read_ms(),
            write_ms: Self::default_write_ms(),
            query_ms: Self::default_query_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationConfig {
    #[serde(default = "PaginationConfig::default_max_pages")]
    pub max_pages: u32,
}

impl PaginationConfig {
    fn default_max_pages() -> u32 {
        10
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_pages: Self::default_max_pages(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// 0 disables heartbeats.
    #[serde(default = "StreamConfig::default_heartbeat_ms")]
    pub heartbeat_ms: u64,
}

impl StreamConfig {
    fn default_heartbeat_ms() -> u64 {
        15_000
    }

    pub fn heartbeat(&self) -> Option<Duration> {
        (self.heartbeat_ms > 0).then(|| Duration::from_millis(self.heartbeat_ms))
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heartbeat_ms: Self::default_heartbeat_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_ttl_secs")]
    pub context_ttl_secs: u64,
    #[serde(default = "CacheConfig::default_ttl_secs")]
    pub confirmation_ttl_secs: u64,
    #[serde(default)]
    pub backend: CacheBackendConfig,
}

impl CacheConfig {
    fn default_ttl_secs() -> u64 {
        300
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            context_ttl_secs: Self::default_ttl_secs(),
            confirmation_ttl_secs: Self::default_ttl_secs(),
            backend: CacheBackendConfig::default(),
        }
    }
}
