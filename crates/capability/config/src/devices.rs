//! 设备清单（YAML）。
//!
//! ```yaml
//! - name: kitchen
//!   id: bf1234567890abcdef
//!   key: 0123456789abcdef
//!   ip: 192.168.1.50
//!   timeout_ms: 5000
//! ```

use crate::ConfigError;
use domain::{DEFAULT_DEVICE_PORT, DEFAULT_EXCHANGE_TIMEOUT, Device};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 清单中的单个设备条目。
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEntry {
    pub name: String,
    pub id: String,
    /// 原始密钥字符串，按 UTF-8 字节使用
    pub key: String,
    #[serde(alias = "address")]
    pub ip: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl DeviceEntry {
    fn into_device(self) -> Device {
        let timeout = self
            .timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_EXCHANGE_TIMEOUT);
        Device::new(self.name, self.id, self.key.into_bytes(), self.ip)
            .with_port(self.port.unwrap_or(DEFAULT_DEVICE_PORT))
            .with_timeout(timeout)
    }
}

/// 读取并校验设备清单文件。
pub fn load_devices(path: impl AsRef<Path>) -> Result<Vec<Device>, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|err| ConfigError::Read(path.display().to_string(), err))?;
    parse_devices(&content)
}

/// 解析设备清单：不能为空，名称非空且唯一。
///
/// 密钥长度不在此校验，非 16 字节密钥的设备在每次采集时报加密错误。
pub fn parse_devices(content: &str) -> Result<Vec<Device>, ConfigError> {
    let entries: Option<Vec<DeviceEntry>> = serde_yaml::from_str(content)?;
    let entries = entries.unwrap_or_default();
    if entries.is_empty() {
        return Err(ConfigError::NoDevices);
    }

    let mut seen = HashSet::new();
    for entry in &entries {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "name".to_string(),
                format!("empty device name for id {}", entry.id),
            ));
        }
        if entry.ip.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "ip".to_string(),
                format!("empty address for device {}", entry.name),
            ));
        }
        if !seen.insert(entry.name.clone()) {
            return Err(ConfigError::Invalid(
                "name".to_string(),
                format!("duplicate device name {}", entry.name),
            ));
        }
    }

    Ok(entries.into_iter().map(DeviceEntry::into_device).collect())
}
