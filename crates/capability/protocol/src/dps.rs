//! 遥测报文解析
//!
//! 解密去填充后的报文形如 `{"dps": {"1": true, "18": 500, "19": 123, "20": 2300}}`：
//!
//! | 数据点 | 含义 | 换算 |
//! |---|---|---|
//! | 1 | 开关状态 | bool |
//! | 18 | 电流 | ÷1000 → A |
//! | 19 | 功率 | ÷10 → W |
//! | 20 | 电压 | ÷10 → V |

use crate::error::ProtocolError;
use domain::Telemetry;
use serde::Deserialize;

/// 设备上报的原始数据点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Dps {
    #[serde(rename = "1")]
    pub switch_on: bool,
    /// 毫安
    #[serde(rename = "18")]
    pub current: i64,
    /// 0.1 瓦
    #[serde(rename = "19")]
    pub power: i64,
    /// 0.1 伏
    #[serde(rename = "20")]
    pub voltage: i64,
}

impl Dps {
    /// 按协议系数换算为遥测读数
    pub fn to_telemetry(&self) -> Telemetry {
        Telemetry {
            switch_on: self.switch_on,
            current_amps: self.current as f64 / 1000.0,
            power_watts: self.power as f64 / 10.0,
            voltage_volts: self.voltage as f64 / 10.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    dps: Dps,
}

/// 解析原始数据点，不做部分恢复
pub fn decode_dps(payload: &[u8]) -> Result<Dps, ProtocolError> {
    let response: StatusResponse =
        serde_json::from_slice(payload).map_err(|e| ProtocolError::DataParse(e.to_string()))?;
    Ok(response.dps)
}

/// 解析并换算遥测读数
pub fn decode_status(payload: &[u8]) -> Result<Telemetry, ProtocolError> {
    decode_dps(payload).map(|dps| dps.to_telemetry())
}
