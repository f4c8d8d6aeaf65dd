use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub scheduler: SchedulerConfig,
    pub probe: ProbeConfig,
    pub scraper: ScraperConfig,
    pub refresh: RefreshConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub config_path: String,
    pub log_path: String,
    pub products_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub interval_hours: u64,
    pub platform_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub sample_markup_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub headless: bool,
    pub user_agent: String,
    pub chrome_path: Option<String>,
    pub page_settle_ms: u64,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    pub items_per_platform: usize,
    pub platform_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

/// One year; longer intervals are almost certainly a unit mistake.
pub const MAX_INTERVAL_HOURS: u64 = 24 * 365;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                config_path: "selector_config.json".to_string(),
                log_path: "update_log.json".to_string(),
                products_path: "products.json".to_string(),
            },
            scheduler: SchedulerConfig {
                interval_hours: 48,
                platform_delay_ms: 3000,
            },
            probe: ProbeConfig {
                sample_markup_limit: 800,
            },
            scraper: ScraperConfig {
                headless: true,
                user_agent: DEFAULT_USER_AGENT.to_string(),
                chrome_path: None,
                page_settle_ms: 5000,
                request_timeout: 30,
            },
            refresh: RefreshConfig {
                items_per_platform: 10,
                platform_delay_ms: 2000,
            },
            logging: LoggingConfig {
                filter: "drift_watcher=info".to_string(),
                directory: None,
            },
            metrics: MetricsConfig {
                enabled: false,
                port: 9001,
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let defaults = AppConfig::default();

        let s = Config::builder()
            // Built-in defaults
            .set_default("storage.config_path", defaults.storage.config_path)?
            .set_default("storage.log_path", defaults.storage.log_path)?
            .set_default("storage.products_path", defaults.storage.products_path)?
            .set_default("scheduler.interval_hours", defaults.scheduler.interval_hours)?
            .set_default("scheduler.platform_delay_ms", defaults.scheduler.platform_delay_ms)?
            .set_default("probe.sample_markup_limit", defaults.probe.sample_markup_limit as u64)?
            .set_default("scraper.headless", defaults.scraper.headless)?
            .set_default("scraper.user_agent", defaults.scraper.user_agent)?
            .set_default("scraper.page_settle_ms", defaults.scraper.page_settle_ms)?
            .set_default("scraper.request_timeout", defaults.scraper.request_timeout)?
            .set_default("refresh.items_per_platform", defaults.refresh.items_per_platform as u64)?
            .set_default("refresh.platform_delay_ms", defaults.refresh.platform_delay_ms)?
            .set_default("logging.filter", defaults.logging.filter)?
            .set_default("metrics.enabled", defaults.metrics.enabled)?
            .set_default("metrics.port", defaults.metrics.port as u64)?
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "DRIFT__"
            .add_source(Environment::with_prefix("DRIFT").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Add Chrome path from environment if not set
        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.config_path.trim().is_empty() || self.storage.log_path.trim().is_empty() {
            return Err(ConfigError::Message("Storage paths must not be empty".into()));
        }

        if self.storage.config_path == self.storage.log_path {
            return Err(ConfigError::Message(
                "Storage config_path and log_path must differ".into(),
            ));
        }

        if self.scheduler.interval_hours == 0 {
            return Err(ConfigError::Message(
                "Scheduler interval_hours must be greater than 0".into(),
            ));
        }

        if self.scheduler.interval_hours > MAX_INTERVAL_HOURS {
            return Err(ConfigError::Message(format!(
                "Scheduler interval_hours must be at most {}",
                MAX_INTERVAL_HOURS
            )));
        }

        if self.probe.sample_markup_limit == 0 {
            return Err(ConfigError::Message(
                "Probe sample_markup_limit must be greater than 0".into(),
            ));
        }

        if self.scraper.request_timeout == 0 {
            return Err(ConfigError::Message(
                "Scraper request_timeout must be greater than 0".into(),
            ));
        }

        if self.refresh.items_per_platform == 0 {
            return Err(ConfigError::Message(
                "Refresh items_per_platform must be greater than 0".into(),
            ));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }
}
