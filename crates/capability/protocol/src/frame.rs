//! 帧编解码
//!
//! ## 请求帧
//!
//! ```text
//! 偏移  字段          长度    取值
//! 0     prefix        11      00 00 55 AA 00 00 00 00 00 00 00
//! 11    command       4       0A 00 00 00（状态查询）
//! 15    length        1       密文长度 + 8
//! 16    payload       N*16    AES-128 ECB 密文
//! -8    crc32         4       大端，覆盖之前所有字节
//! -4    suffix        4       00 00 AA 55
//! ```
//!
//! ## 响应帧
//!
//! 前 20 字节为帧头（magic、序号、命令字、长度、返回码），
//! 末 8 字节为 CRC 与结束标记，中间为密文。

use crate::cipher::{Cipher, pad};
use crate::error::ProtocolError;
use serde::Serialize;

/// 请求帧固定前缀
pub const PREFIX: [u8; 11] = [0x00, 0x00, 0x55, 0xaa, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

/// 状态查询命令字
pub const STATUS_COMMAND: [u8; 4] = [0x0a, 0x00, 0x00, 0x00];

/// 帧尾：4 字节 CRC 占位 + 4 字节结束标记
pub const SUFFIX: [u8; 8] = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xaa, 0x55];

/// 响应帧头长度
pub const RESPONSE_HEADER_LEN: usize = 20;

/// 帧尾长度（CRC + 结束标记）
pub const TRAILER_LEN: usize = 8;

/// 单字节长度字段可表示的最大值
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

const FRAME_MAGIC: [u8; 4] = [0x00, 0x00, 0x55, 0xaa];
const TAIL_MAGIC: [u8; 4] = [0x00, 0x00, 0xaa, 0x55];

/// 状态查询请求体
#[derive(Debug, Serialize)]
struct StatusRequest<'a> {
    #[serde(rename = "gwId", skip_serializing_if = "str::is_empty")]
    gw_id: &'a str,
    #[serde(rename = "devId", skip_serializing_if = "str::is_empty")]
    dev_id: &'a str,
}

/// 序列化状态查询请求体（明文 JSON）
pub fn status_request_body(device_id: &str) -> Result<Vec<u8>, ProtocolError> {
    let request = StatusRequest {
        gw_id: device_id,
        dev_id: device_id,
    };
    serde_json::to_vec(&request).map_err(|e| ProtocolError::DataParse(e.to_string()))
}

/// 构造完整的状态查询请求帧
pub fn encode_status_request(cipher: &Cipher, device_id: &str) -> Result<Vec<u8>, ProtocolError> {
    let body = status_request_body(device_id)?;
    let encrypted = cipher.encrypt_blocks(&pad(&body))?;

    let length = encrypted.len() + SUFFIX.len();
    let length_byte = u8::try_from(length).map_err(|_| ProtocolError::FrameTooLarge(length))?;

    let mut frame = Vec::with_capacity(PREFIX.len() + STATUS_COMMAND.len() + 1 + length);
    frame.extend_from_slice(&PREFIX);
    frame.extend_from_slice(&STATUS_COMMAND);
    frame.push(length_byte);
    frame.extend_from_slice(&encrypted);
    frame.extend_from_slice(&SUFFIX);

    seal_crc(&mut frame);
    Ok(frame)
}

/// 构造响应帧（设备侧格式，用于模拟设备与测试）
pub fn encode_response(
    cipher: &Cipher,
    sequence: u32,
    return_code: u32,
    body: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let encrypted = cipher.encrypt_blocks(&pad(body))?;
    let length = 4 + encrypted.len() + TRAILER_LEN;
    let length = u32::try_from(length).map_err(|_| ProtocolError::FrameTooLarge(length))?;

    let mut frame = Vec::with_capacity(RESPONSE_HEADER_LEN + encrypted.len() + TRAILER_LEN);
    frame.extend_from_slice(&FRAME_MAGIC);
    frame.extend_from_slice(&sequence.to_be_bytes());
    frame.extend_from_slice(&u32::from(STATUS_COMMAND[0]).to_be_bytes());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(&return_code.to_be_bytes());
    frame.extend_from_slice(&encrypted);
    frame.extend_from_slice(&SUFFIX);

    seal_crc(&mut frame);
    Ok(frame)
}

/// 剥离响应帧头尾，返回密文部分
///
/// 校验最小长度、首尾标记与 CRC，不校验序号和返回码。
pub fn decode_response(frame: &[u8]) -> Result<&[u8], ProtocolError> {
    if frame.len() < RESPONSE_HEADER_LEN + TRAILER_LEN {
        return Err(ProtocolError::Frame(format!(
            "response too short: {} bytes",
            frame.len()
        )));
    }
    if !frame.starts_with(&FRAME_MAGIC) {
        return Err(ProtocolError::Frame("missing frame prefix".to_string()));
    }
    if !frame.ends_with(&TAIL_MAGIC) {
        return Err(ProtocolError::Frame("missing frame suffix".to_string()));
    }

    let crc_at = frame.len() - TRAILER_LEN;
    let expected = u32::from_be_bytes([
        frame[crc_at],
        frame[crc_at + 1],
        frame[crc_at + 2],
        frame[crc_at + 3],
    ]);
    let computed = crc32fast::hash(&frame[..crc_at]);
    if expected != computed {
        return Err(ProtocolError::Frame(format!(
            "crc mismatch: frame carries {:08x}, computed {:08x}",
            expected, computed
        )));
    }

    Ok(&frame[RESPONSE_HEADER_LEN..crc_at])
}

/// 计算除末 8 字节外的 CRC32，并以大端写入 CRC 占位
fn seal_crc(frame: &mut [u8]) {
    let crc_at = frame.len() - TRAILER_LEN;
    let crc = crc32fast::hash(&frame[..crc_at]);
    frame[crc_at..crc_at + 4].copy_from_slice(&crc.to_be_bytes());
}
