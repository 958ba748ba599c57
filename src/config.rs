// src/config.rs

//! Loads and validates rankboard configuration from TOML.
//!
//! ```toml
//! log_level = "info"
//!
//! [store]
//! backend = "resp"
//! host = "127.0.0.1"
//! port = 6379
//! read_timeout = "500ms"
//!
//! [[leaderboards]]
//! name = "arena"
//! ordering = "desc"
//! encoder = "first-in-is-bigger"
//! max_members = 100
//! ```

use crate::core::encoder::EncoderKind;
use crate::core::leaderboard::Leaderboard;
use crate::core::storage::{MemoryStore, RespStore, SortedSetStore};
use crate::core::{Ordering, RankError};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub leaderboards: Vec<LeaderboardConfig>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            store: StoreConfig::default(),
            leaderboards: Vec::new(),
        }
    }
}

/// Which backing store the leaderboards live in.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-process, non-persistent.
    #[default]
    Memory,
    /// A Redis-compatible server.
    Resp(RespStoreConfig),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RespStoreConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: u32,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub read_timeout: Duration,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    6379
}
fn default_timeout() -> Duration {
    Duration::from_secs(2)
}

impl Default for RespStoreConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: 0,
            password: None,
            connect_timeout: default_timeout(),
            read_timeout: default_timeout(),
        }
    }
}

/// One leaderboard declared in the config file.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LeaderboardConfig {
    /// The base key.
    pub name: String,
    #[serde(default)]
    pub sub_id: Option<String>,
    #[serde(default)]
    pub ordering: Ordering,
    #[serde(default)]
    pub encoder: Option<EncoderKind>,
    /// `0` disables eviction.
    #[serde(default)]
    pub max_members: usize,
}

impl Config {
    /// Reads, parses and validates a TOML config file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    /// The `log_level` directive as a subscriber filter. `RUST_LOG`, when
    /// set, is left to the caller to prefer.
    ///
    /// ```
    /// use tracing_subscriber::prelude::*;
    /// let config = rankboard::config::Config::from_toml_str("log_level = \"rankboard=debug\"")?;
    /// let _ = tracing_subscriber::registry()
    ///     .with(config.log_filter()?)
    ///     .with(tracing_subscriber::fmt::layer())
    ///     .try_init();
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn log_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.log_level)
            .with_context(|| format!("Invalid log_level directive '{}'", self.log_level))
    }

    /// Looks up a declared leaderboard by base key.
    pub fn leaderboard(&self, name: &str) -> Option<&LeaderboardConfig> {
        self.leaderboards.iter().find(|lb| lb.name == name)
    }

    /// Builds a handle for every declared leaderboard on `store`.
    pub fn build_leaderboards(
        &self,
        store: Arc<dyn SortedSetStore>,
    ) -> Result<Vec<Leaderboard>, RankError> {
        self.leaderboards
            .iter()
            .map(|lb| lb.build(store.clone()))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        self.log_filter()?;

        if let StoreConfig::Resp(resp) = &self.store {
            if resp.host.is_empty() {
                return Err(anyhow!("store.host cannot be empty"));
            }
            if resp.port == 0 {
                return Err(anyhow!("store.port cannot be 0"));
            }
            if resp.connect_timeout.is_zero() {
                return Err(anyhow!("store.connect_timeout cannot be 0"));
            }
            if resp.read_timeout.is_zero() {
                return Err(anyhow!("store.read_timeout cannot be 0"));
            }
            if resp.password.is_none() && !is_loopback(&resp.host) {
                warn!(
                    "Store at {}:{} is not local and no password is configured.",
                    resp.host, resp.port
                );
            }
        }

        let mut seen = HashSet::new();
        for (i, lb) in self.leaderboards.iter().enumerate() {
            if lb.name.is_empty() {
                return Err(anyhow!("leaderboard #{}: name cannot be empty", i + 1));
            }
            let sub_id = lb
                .sub_id
                .as_deref()
                .unwrap_or(crate::core::leaderboard::DEFAULT_SUB_ID);
            if !seen.insert((lb.name.as_str(), sub_id)) {
                return Err(anyhow!(
                    "leaderboard #{}: '{}:{}' is declared more than once",
                    i + 1,
                    lb.name,
                    sub_id
                ));
            }
        }
        Ok(())
    }
}

fn is_loopback(host: &str) -> bool {
    host == "localhost"
        || host
            .parse::<std::net::IpAddr>()
            .is_ok_and(|ip| ip.is_loopback())
}

impl StoreConfig {
    /// Creates the configured store. For `resp` this connects immediately.
    pub async fn open(&self) -> Result<Arc<dyn SortedSetStore>, RankError> {
        match self {
            StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreConfig::Resp(resp) => Ok(Arc::new(RespStore::connect(resp).await?)),
        }
    }
}

impl LeaderboardConfig {
    pub fn build(&self, store: Arc<dyn SortedSetStore>) -> Result<Leaderboard, RankError> {
        let mut builder = Leaderboard::builder(self.name.clone())
            .store(store)
            .ordering(self.ordering)
            .max_members(self.max_members);
        if let Some(sub_id) = &self.sub_id {
            builder = builder.sub_id(sub_id.clone());
        }
        if let Some(kind) = self.encoder {
            builder = builder.encoder(kind.encoder());
        }
        builder.build()
    }
}
