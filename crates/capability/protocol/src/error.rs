//! 协议错误类型定义

/// 错误大类，用于日志与测试断言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 建连、写入、读取失败，零字节读取或超时
    Network,
    /// 密钥长度、分组长度或填充错误
    Crypto,
    /// 帧结构或遥测报文格式错误
    Protocol,
    /// 采集任务异常终止
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Crypto => "crypto",
            Self::Protocol => "protocol",
            Self::Internal => "internal",
        }
    }
}

/// 加解密错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// 密钥长度不是 16 字节
    #[error("invalid key size: expected 16 bytes, got {0}")]
    KeySize(usize),

    /// 输入长度不是分组长度的整数倍
    #[error("input length {0} is not a multiple of the 16-byte block size")]
    BlockSize(usize),

    /// 填充字节非法
    #[error("invalid padding: {0}")]
    Padding(String),
}

/// 协议通信错误
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// 连接错误
    #[error("connection error: {0}")]
    Connection(String),

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 设备关闭连接且未返回数据
    #[error("no data received from device")]
    NoData,

    /// 超时错误
    #[error("timeout: {0}")]
    Timeout(String),

    /// 加解密错误
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// 帧结构错误
    #[error("frame error: {0}")]
    Frame(String),

    /// 请求帧超出单字节长度字段
    #[error("frame too large: payload of {0} bytes does not fit the single-byte length field")]
    FrameTooLarge(usize),

    /// 数据解析错误
    #[error("data parse error: {0}")]
    DataParse(String),

    /// 采集任务异常终止
    #[error("task failed: {0}")]
    Task(String),
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) | Self::Io(_) | Self::NoData | Self::Timeout(_) => {
                ErrorKind::Network
            }
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::Frame(_) | Self::FrameTooLarge(_) | Self::DataParse(_) => ErrorKind::Protocol,
            Self::Task(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ProtocolError::NoData.kind(), ErrorKind::Network);
        assert_eq!(
            ProtocolError::Timeout("10.0.0.2:6668".to_string()).kind(),
            ErrorKind::Network
        );
        assert_eq!(
            ProtocolError::from(CryptoError::KeySize(5)).kind(),
            ErrorKind::Crypto
        );
        assert_eq!(ProtocolError::FrameTooLarge(300).kind(), ErrorKind::Protocol);
        assert_eq!(
            ProtocolError::DataParse("missing field `18`".to_string()).kind(),
            ErrorKind::Protocol
        );
        assert_eq!(ErrorKind::Crypto.as_str(), "crypto");
    }
}
