pub mod data;

pub use data::Telemetry;

use std::fmt;
use std::time::Duration;

/// 设备监听端口（协议固定值）。
pub const DEFAULT_DEVICE_PORT: u16 = 6668;

/// 未配置时单次交互的超时时间。
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// 智能插座设备描述：身份、密钥与连接信息。
///
/// 加载后不可变，由采集编排器在进程生命周期内持有。
#[derive(Clone, PartialEq, Eq)]
pub struct Device {
    /// 指标标签中使用的设备名称
    pub name: String,
    /// 设备 ID，同时作为 gwId 与 devId 发送
    pub id: String,
    /// 预共享密钥（原始字节，必须为 16 字节）
    pub key: Vec<u8>,
    /// 主机名或 IP 地址
    pub address: String,
    /// 设备端口
    pub port: u16,
    /// 连接 + 写入 + 读取的整体超时
    pub timeout: Duration,
}

impl Device {
    /// 使用默认端口与超时构造设备描述。
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        key: impl Into<Vec<u8>>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            key: key.into(),
            address: address.into(),
            port: DEFAULT_DEVICE_PORT,
            timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `host:port` 形式的连接地址，IPv6 地址自动加方括号。
    pub fn endpoint(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

// 密钥不进入日志。
impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("key", &format_args!("<{} bytes>", self.key.len()))
            .field("address", &self.address)
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .finish()
    }
}
