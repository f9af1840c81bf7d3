use std::env;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub busy_timeout_millis: u64,
}

/// Game tuning parameters shared by every round.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Fraction of the prize pool retained by the platform, e.g. "0.10".
    pub platform_cut: String,
    /// Interval between background ticker passes.
    pub tick_interval_millis: u64,
    /// A `settling` claim older than this is considered abandoned and
    /// released back to `ending` for retry.
    pub stale_settling_secs: i64,
    /// Maximum comment length after sanitization.
    pub max_comment_len: usize,
    /// `seconds_remaining` at or below this marks the round as ending soon.
    pub ending_soon_secs: i64,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub game: GameConfig,
    pub log_level: String,
    pub environment: String,
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://fastfinger.db?mode=rwc".to_string());

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(5);

        let acquire_timeout_secs = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let busy_timeout_millis = env::var("DATABASE_BUSY_TIMEOUT_MILLIS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(5000);

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            busy_timeout_millis,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get busy timeout as Duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_millis)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://fastfinger.db?mode=rwc".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 30,
            busy_timeout_millis: 5000,
        }
    }
}

impl GameConfig {
    /// Create game config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let platform_cut = env::var("PLATFORM_CUT").unwrap_or_else(|_| "0.10".to_string());

        // Validate the fraction eagerly so a bad deployment fails at boot,
        // not at the first settlement.
        let cut: rust_decimal::Decimal = platform_cut
            .parse()
            .map_err(|_| format!("Invalid PLATFORM_CUT: {}", platform_cut))?;
        if cut < rust_decimal::Decimal::ZERO || cut >= rust_decimal::Decimal::ONE {
            return Err(format!(
                "PLATFORM_CUT must be in [0, 1), got {}",
                platform_cut
            ));
        }

        let tick_interval_millis = env::var("TICK_INTERVAL_MILLIS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1000);

        let stale_settling_secs = env::var("STALE_SETTLING_SECS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(30);

        let max_comment_len = env::var("MAX_COMMENT_LEN")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(280);

        let ending_soon_secs = env::var("ENDING_SOON_SECS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(10);

        if tick_interval_millis == 0 {
            return Err("TICK_INTERVAL_MILLIS must be greater than 0".to_string());
        }

        if max_comment_len == 0 {
            return Err("MAX_COMMENT_LEN must be greater than 0".to_string());
        }

        Ok(Self {
            platform_cut,
            tick_interval_millis,
            stale_settling_secs,
            max_comment_len,
            ending_soon_secs,
        })
    }

    /// Get tick interval as Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_millis)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            platform_cut: "0.10".to_string(),
            tick_interval_millis: 1000,
            stale_settling_secs: 30,
            max_comment_len: 280,
            ending_soon_secs: 10,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let game = GameConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            database,
            game,
            log_level: log_level.to_lowercase(),
            environment: environment.to_lowercase(),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            game: GameConfig::default(),
            log_level: "info".to_string(),
            environment: "development".to_string(),
        }
    }
}
