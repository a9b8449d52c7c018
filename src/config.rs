use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Application-level constants
pub const APP_NAME: &str = "credit-intake";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ENV_JOB_DELAY_MS: &str = "CREDIT_INTAKE_JOB_DELAY_MS";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "CREDIT_INTAKE_HTTP_TIMEOUT_SECS";
pub const ENV_ACCESS_TOKEN: &str = "CREDIT_INTAKE_ACCESS_TOKEN";
pub const ENV_LOG: &str = "CREDIT_INTAKE_LOG";
pub const ENV_OUTPUT_DIR: &str = "CREDIT_INTAKE_OUTPUT_DIR";

const DEFAULT_JOB_DELAY_MS: u64 = 1000;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Load `.env` from the working directory if present.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}

pub fn default_log_filter() -> &'static str {
    "info,credit_intake_lib=info"
}

/// Downloads, else Desktop, else the working directory.
pub fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::desktop_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `dir/stem_YYYYmmdd_HHMMSS.ext`, suffixed `_2`, `_3`… if taken.
pub fn timestamped_output_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let now = chrono::Local::now();
    let base = format!("{}_{}", stem, now.format("%Y%m%d_%H%M%S"));
    let mut path = dir.join(format!("{base}.{ext}"));
    let mut counter = 2u32;
    while path.exists() {
        path = dir.join(format!("{base}_{counter}.{ext}"));
        counter += 1;
    }
    path
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub job_delay: Duration,
    pub http_timeout: Duration,
    pub access_token: Option<String>,
    pub log_filter: String,
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            job_delay: Duration::from_millis(DEFAULT_JOB_DELAY_MS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            access_token: None,
            log_filter: default_log_filter().to_string(),
            output_dir: default_output_dir(),
        }
    }
}

impl AppConfig {
    /// Read settings from the process environment after loading `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_env();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(v) = get(ENV_JOB_DELAY_MS) {
            config.job_delay = Duration::from_millis(parse_u64(ENV_JOB_DELAY_MS, &v)?);
        }
        if let Some(v) = get(ENV_HTTP_TIMEOUT_SECS) {
            let secs = parse_u64(ENV_HTTP_TIMEOUT_SECS, &v)?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_HTTP_TIMEOUT_SECS,
                    value: v,
                });
            }
            config.http_timeout = Duration::from_secs(secs);
        }
        config.access_token = get(ENV_ACCESS_TOKEN);
        if let Some(v) = get(ENV_LOG) {
            config.log_filter = v;
        }
        if let Some(v) = get(ENV_OUTPUT_DIR) {
            config.output_dir = PathBuf::from(v);
        }
        Ok(config)
    }
}

fn parse_u64(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
