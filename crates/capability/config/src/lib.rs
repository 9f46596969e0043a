//! 应用运行配置与设备清单加载。

mod devices;

pub use devices::{DeviceEntry, load_devices, parse_devices};

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("failed to read {0}: {1}")]
    Read(String, #[source] std::io::Error),
    #[error("failed to parse device list: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("no devices configured")]
    NoDevices,
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub telemetry_path: String,
    pub config_file: String,
    pub disable_default_metrics: bool,
    pub max_concurrency: usize,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr =
            read_optional("PLUG_HTTP_ADDR").unwrap_or_else(|| "0.0.0.0:9999".to_string());
        let telemetry_path = read_path_with_default("PLUG_TELEMETRY_PATH", "/metrics")?;
        let config_file =
            read_optional("PLUG_CONFIG_FILE").unwrap_or_else(|| "config.yaml".to_string());
        let disable_default_metrics =
            read_bool_with_default("PLUG_DISABLE_DEFAULT_METRICS", false)?;
        let max_concurrency = read_usize_with_default("PLUG_MAX_CONCURRENCY", 16)?;
        if max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "PLUG_MAX_CONCURRENCY".to_string(),
                "0".to_string(),
            ));
        }

        Ok(Self {
            http_addr,
            telemetry_path,
            config_file,
            disable_default_metrics,
            max_concurrency,
        })
    }
}

fn read_usize_with_default(key: &str, default: usize) -> Result<usize, ConfigError> {
    let value = match read_optional(key) {
        Some(value) => value,
        None => return Ok(default),
    };
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

/// 路径必须以 `/` 开头，且不能与 `/`、`/health` 冲突。
fn read_path_with_default(key: &str, default: &str) -> Result<String, ConfigError> {
    let value = match read_optional(key) {
        Some(value) => value,
        None => return Ok(default.to_string()),
    };
    if !value.starts_with('/') || value == "/" || value == "/health" {
        return Err(ConfigError::Invalid(key.to_string(), value));
    }
    Ok(value)
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> Result<bool, ConfigError> {
    let value = match read_optional(key) {
        Some(value) => value,
        None => return Ok(default),
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}
