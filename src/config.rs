use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    365
}

/// Startup seeding of an empty store.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    #[serde(default = "default_true")]
    pub demo_data: bool,
    #[serde(default = "default_true")]
    pub badges: bool,
    /// Fixed RNG seed for reproducible demo data; random when unset.
    pub rng_seed: Option<u64>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            demo_data: true,
            badges: true,
            rng_seed: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Host sampler writing a system_metrics row per tick.
#[derive(Debug, Clone, Deserialize)]
pub struct SamplerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_sampler_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_sampler_interval_secs(),
        }
    }
}

fn default_sampler_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    #[serde(default = "default_vacuum_interval_secs")]
    pub vacuum_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            prune_interval_secs: default_prune_interval_secs(),
            vacuum_schedule: None,
            vacuum_interval_secs: default_vacuum_interval_secs(),
        }
    }
}

fn default_prune_interval_secs() -> u64 {
    3600
}

fn default_vacuum_interval_secs() -> u64 {
    86_400
}

/// Defaults for the performance endpoints; request parameters override them.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_peak_threshold")]
    pub peak_threshold: f64,
    #[serde(default = "default_limit")]
    pub peak_limit: usize,
    #[serde(default = "default_limit")]
    pub ranking_limit: usize,
    #[serde(default = "default_report_top_volunteers")]
    pub report_top_volunteers: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            peak_threshold: default_peak_threshold(),
            peak_limit: default_limit(),
            ranking_limit: default_limit(),
            report_top_volunteers: default_report_top_volunteers(),
        }
    }
}

fn default_peak_threshold() -> f64 {
    80.0
}

fn default_limit() -> usize {
    10
}

fn default_report_top_volunteers() -> usize {
    5
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            self.sampler.interval_secs > 0,
            "sampler.interval_secs must be > 0, got {}",
            self.sampler.interval_secs
        );
        anyhow::ensure!(
            self.maintenance.prune_interval_secs > 0,
            "maintenance.prune_interval_secs must be > 0, got {}",
            self.maintenance.prune_interval_secs
        );
        anyhow::ensure!(
            self.maintenance.vacuum_interval_secs > 0,
            "maintenance.vacuum_interval_secs must be > 0, got {}",
            self.maintenance.vacuum_interval_secs
        );
        if let Some(ref schedule) = self.maintenance.vacuum_schedule {
            anyhow::ensure!(
                <cron::Schedule as std::str::FromStr>::from_str(schedule).is_ok(),
                "maintenance.vacuum_schedule is not a valid cron expression: {:?}",
                schedule
            );
        }
        anyhow::ensure!(
            self.analytics.peak_threshold.is_finite(),
            "analytics.peak_threshold must be a finite number"
        );
        anyhow::ensure!(
            self.analytics.peak_limit > 0,
            "analytics.peak_limit must be > 0, got {}",
            self.analytics.peak_limit
        );
        anyhow::ensure!(
            self.analytics.ranking_limit > 0,
            "analytics.ranking_limit must be > 0, got {}",
            self.analytics.ranking_limit
        );
        anyhow::ensure!(
            self.analytics.report_top_volunteers > 0,
            "analytics.report_top_volunteers must be > 0, got {}",
            self.analytics.report_top_volunteers
        );
        Ok(())
    }
}
