//! Configuration management for the GanttFlow server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with GANTTFLOW__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::schedule::{UnlockPolicy, DEFAULT_UNLOCK_OFFSET_DAYS};
use shared::types::DEFAULT_PAGE_SIZE;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Which reference store backs the server
    pub store: StoreConfig,

    /// Unlock scheduling
    pub schedule: ScheduleConfig,

    /// Table and card listings
    pub listing: ListingConfig,

    /// Change-event fan-out
    pub events: EventsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Run embedded migrations on startup
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Postgres,
    /// Process-local store, contents lost on restart
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub kind: StoreKind,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    /// Days between the base date and unlock
    pub unlock_offset_days: u32,
}

impl ScheduleConfig {
    pub fn policy(&self) -> UnlockPolicy {
        UnlockPolicy::new(self.unlock_offset_days)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    /// Rows per page
    pub page_size: u32,

    /// Entries returned by the history endpoint
    pub history_limit: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EventsConfig {
    /// Buffered change events per subscriber before it lags
    pub channel_capacity: usize,

    /// SSE keep-alive interval
    pub keep_alive_secs: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("GANTTFLOW_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.run_migrations", environment == "development")?
            .set_default("store.kind", "postgres")?
            .set_default("schedule.unlock_offset_days", i64::from(DEFAULT_UNLOCK_OFFSET_DAYS))?
            .set_default("listing.page_size", i64::from(DEFAULT_PAGE_SIZE))?
            .set_default("listing.history_limit", 50)?
            .set_default("events.channel_capacity", 256)?
            .set_default("events.keep_alive_secs", 15)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (GANTTFLOW__ prefix)
            .add_source(
                Environment::with_prefix("GANTTFLOW")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// In-memory configuration for tests and local demos
    pub fn in_memory() -> Self {
        Self {
            environment: "test".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 1,
                min_connections: 0,
                run_migrations: false,
            },
            store: StoreConfig {
                kind: StoreKind::Memory,
            },
            schedule: ScheduleConfig {
                unlock_offset_days: DEFAULT_UNLOCK_OFFSET_DAYS,
            },
            listing: ListingConfig {
                page_size: DEFAULT_PAGE_SIZE,
                history_limit: 50,
            },
            events: EventsConfig {
                channel_capacity: 256,
                keep_alive_secs: 15,
            },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
