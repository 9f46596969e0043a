//! 设备状态查询客户端
//!
//! 每次查询都是独立的一次 TCP 交互：建连、整帧写入、单次有界读取、关闭。
//! 不复用连接，嵌入式设备对并发连接的容忍度很低。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let device = Device::new("kitchen", "bf1234567890abcdef", "0123456789abcdef", "192.168.1.50");
//! let client = DeviceClient::new(&device)?;
//! let telemetry = client.status().await?;
//! ```

use crate::cipher::{Cipher, unpad};
use crate::dps::decode_status;
use crate::error::{CryptoError, ProtocolError};
use crate::frame::{decode_response, encode_status_request};
use async_trait::async_trait;
use domain::{Device, Telemetry};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// 单次读取缓冲区大小，协议假设完整响应一次到达
pub const READ_BUFFER_SIZE: usize = 256;

/// 遥测来源：采集编排器与设备客户端之间的接缝
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn status(&self) -> Result<Telemetry, ProtocolError>;
}

/// 单个设备的协议客户端
#[derive(Debug, Clone)]
pub struct DeviceClient {
    name: String,
    device_id: String,
    endpoint: String,
    cipher: Cipher,
    timeout: Duration,
}

impl DeviceClient {
    /// 创建客户端，密钥长度在此处校验一次
    pub fn new(device: &Device) -> Result<Self, CryptoError> {
        let cipher = Cipher::new(&device.key)?;
        Ok(Self {
            name: device.name.clone(),
            device_id: device.id.clone(),
            endpoint: device.endpoint(),
            cipher,
            timeout: device.timeout,
        })
    }

    /// 查询设备状态
    ///
    /// 连接、写入、读取共用一个截止时间，超时按网络错误处理。
    pub async fn status(&self) -> Result<Telemetry, ProtocolError> {
        let request = encode_status_request(&self.cipher, &self.device_id)?;

        let response = match tokio::time::timeout(self.timeout, self.exchange(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ProtocolError::Timeout(format!(
                    "no response from {} within {}ms",
                    self.endpoint,
                    self.timeout.as_millis()
                )));
            }
        };

        let encrypted = decode_response(&response)?;
        let decrypted = self.cipher.decrypt_blocks(encrypted)?;
        decode_status(unpad(&decrypted)?)
    }

    /// 一次请求/响应交互，连接在任何返回路径上都会随 `stream` 释放
    async fn exchange(&self, request: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let mut stream = TcpStream::connect(&self.endpoint)
            .await
            .map_err(|e| ProtocolError::Connection(format!("{}: {}", self.endpoint, e)))?;

        stream.write_all(request).await?;
        debug!(
            device = %self.name,
            endpoint = %self.endpoint,
            bytes = request.len(),
            "sent status request"
        );

        let mut buffer = [0u8; READ_BUFFER_SIZE];
        let read = stream.read(&mut buffer).await?;
        if read == 0 {
            return Err(ProtocolError::NoData);
        }
        debug!(
            device = %self.name,
            endpoint = %self.endpoint,
            bytes = read,
            "received status response"
        );

        // 主动发送 FIN，失败不影响已读到的数据
        let _ = stream.shutdown().await;
        Ok(buffer[..read].to_vec())
    }
}

#[async_trait]
impl StatusSource for DeviceClient {
    async fn status(&self) -> Result<Telemetry, ProtocolError> {
        DeviceClient::status(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::frame::{PREFIX, encode_response};
    use tokio::net::TcpListener;

    const KEY: &[u8] = b"0123456789abcdef";
    const STATUS_BODY: &[u8] = br#"{"dps":{"1":true,"18":500,"19":123,"20":2300}}"#;

    /// 启动只应答一次的模拟设备，返回监听端口
    async fn spawn_device(reply: Option<Vec<u8>>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            assert_eq!(request[..PREFIX.len()], PREFIX);
            if let Some(reply) = reply {
                socket.write_all(&reply).await.unwrap();
            }
        });
        port
    }

    /// 读满一个请求帧（长度字段位于偏移 15）
    async fn read_request(socket: &mut tokio::net::TcpStream) -> Vec<u8> {
        let mut request = Vec::new();
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        loop {
            let read = socket.read(&mut buffer).await.unwrap();
            request.extend_from_slice(&buffer[..read]);
            if read == 0 || (request.len() > 15 && request.len() >= 16 + request[15] as usize) {
                return request;
            }
        }
    }

    fn device(port: u16) -> Device {
        Device::new("kitchen", "dev1", KEY, "127.0.0.1").with_port(port)
    }

    #[tokio::test]
    async fn test_status_exchange() {
        let cipher = Cipher::new(KEY).unwrap();
        let reply = encode_response(&cipher, 1, 0, STATUS_BODY).unwrap();
        let port = spawn_device(Some(reply)).await;

        let client = DeviceClient::new(&device(port)).unwrap();
        let telemetry = client.status().await.unwrap();
        assert!(telemetry.switch_on);
        assert_eq!(telemetry.current_amps, 0.5);
        assert_eq!(telemetry.power_watts, 12.3);
        assert_eq!(telemetry.voltage_volts, 230.0);
    }

    #[tokio::test]
    async fn test_zero_byte_read() {
        let port = spawn_device(None).await;

        let client = DeviceClient::new(&device(port)).unwrap();
        let err = client.status().await.unwrap_err();
        assert!(matches!(err, ProtocolError::NoData));
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = DeviceClient::new(&device(port)).unwrap();
        let err = client.status().await.unwrap_err();
        assert!(matches!(err, ProtocolError::Connection(_)));
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_timeout_bounds_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        // 接受连接但从不应答
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let device = device(port).with_timeout(Duration::from_millis(200));
        let client = DeviceClient::new(&device).unwrap();
        let err = client.status().await.unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout(_)));
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_wrong_key_fails_decode() {
        let cipher = Cipher::new(b"fedcba9876543210").unwrap();
        let reply = encode_response(&cipher, 1, 0, STATUS_BODY).unwrap();
        let port = spawn_device(Some(reply)).await;

        let client = DeviceClient::new(&device(port)).unwrap();
        let err = client.status().await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Crypto | ErrorKind::Protocol));
    }

    #[test]
    fn test_key_checked_at_construction() {
        let device = Device::new("kitchen", "dev1", "too-short", "127.0.0.1");
        let err = DeviceClient::new(&device).unwrap_err();
        assert_eq!(err, CryptoError::KeySize(9));
    }
}
