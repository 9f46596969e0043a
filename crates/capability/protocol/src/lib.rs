//! # 智能插座协议能力模块
//!
//! 通过局域网私有二进制协议查询计量插座的状态：
//! - **Frame**：请求帧组装（前缀、命令字、长度、密文、CRC、结束标记）与响应帧剥离
//! - **Cipher**：AES-128 逐块加解密与长度前缀填充
//! - **Dps**：解密后的遥测报文解析与单位换算
//! - **DeviceClient**：单次 TCP 交互完成一次状态查询
//!
//! ## 数据流
//!
//! ```text
//! Device { id, key, address }
//!       │
//!       ▼
//! {"gwId","devId"} ─ pad ─ encrypt ─ frame + crc32
//!       │
//!       ▼  TCP :6668（每次查询新建连接）
//! 响应帧 ─ 去头尾 ─ decrypt ─ unpad ─ {"dps": {...}}
//!       │
//!       ▼
//! Telemetry { switch_on, current_amps, power_watts, voltage_volts }
//! ```
//!
//! 协议固定为单一版本，不做版本协商。

mod cipher;
mod client;
mod dps;
mod error;
mod frame;

pub use cipher::{BLOCK_SIZE, Cipher, KEY_SIZE, pad, unpad};
pub use client::{DeviceClient, READ_BUFFER_SIZE, StatusSource};
pub use dps::{Dps, decode_dps, decode_status};
pub use error::{CryptoError, ErrorKind, ProtocolError};
pub use frame::{
    MAX_PAYLOAD_LEN, PREFIX, RESPONSE_HEADER_LEN, STATUS_COMMAND, SUFFIX, TRAILER_LEN,
    decode_response, encode_response, encode_status_request, status_request_body,
};
