/// 单次成功交互得到的遥测读数（已按协议系数换算）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    /// 继电器是否闭合
    pub switch_on: bool,
    /// 电流（安培）
    pub current_amps: f64,
    /// 有功功率（瓦特）
    pub power_watts: f64,
    /// 电压（伏特）
    pub voltage_volts: f64,
}

impl Telemetry {
    /// 开关状态的数值形式（1 为开，0 为关）。
    pub fn switch_on_value(&self) -> f64 {
        if self.switch_on { 1.0 } else { 0.0 }
    }
}
