use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default location of the diagnostic flag file. Its presence enables verbose activity logging.
pub const DEFAULT_DEBUG_FLAG_PATH: &str = "/tmp/herald_notification_center_debug";

/// Default coalescing tick, in milliseconds.
pub const DEFAULT_COALESCE_INTERVAL_MS: u64 = 20;

/// Top-level herald configuration.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    pub center: CenterConfig,
    pub logging: LoggingConfig,
}

/// Notification center settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CenterConfig {
    /// Verbose activity is logged at `INFO` when this file exists at construction.
    pub debug_flag_path: PathBuf,
    /// Batch `Soon` posts and flush them on the coalescing tick.
    pub coalesce: bool,
    pub coalesce_interval_ms: u64,
}

impl CenterConfig {
    /// The coalescing tick, never shorter than one millisecond.
    #[must_use]
    pub fn coalesce_interval(&self) -> Duration {
        Duration::from_millis(self.coalesce_interval_ms.max(1))
    }

    /// Whether the diagnostic flag file is present right now.
    #[must_use]
    pub fn debug_flag_present(&self) -> bool {
        self.debug_flag_path.exists()
    }
}

impl Default for CenterConfig {
    fn default() -> Self {
        Self {
            debug_flag_path: PathBuf::from(DEFAULT_DEBUG_FLAG_PATH),
            coalesce: false,
            coalesce_interval_ms: DEFAULT_COALESCE_INTERVAL_MS,
        }
    }
}

/// Subscriber settings handed to `herald-logger`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub console: bool,
    pub json: bool,
    /// Rolling file output is enabled when set.
    pub directory: Option<PathBuf>,
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            console: true,
            json: false,
            directory: None,
            env_filter: None,
        }
    }
}
