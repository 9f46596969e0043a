//! 插座导出器指标集合。
//!
//! 所有指标位于 `tuya_smartplug_` 前缀下，每个导出器实例持有独立的 Registry。

use domain::Telemetry;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::time::Duration;

pub const NAMESPACE: &str = "tuya";
pub const SUBSYSTEM: &str = "smartplug";

const DEVICE_LABEL: &str = "device";

/// 指标注册与编码错误。
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metrics registry error: {0}")]
    Registry(#[from] prometheus::Error),
    #[error("metrics output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// 导出器指标。
#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Registry,
    scrapes_total: IntCounter,
    scrape_errors_total: IntCounterVec,
    last_scrape_error: IntGauge,
    scrape_duration: HistogramVec,
    current: GaugeVec,
    voltage: GaugeVec,
    power: GaugeVec,
    switch_on: GaugeVec,
    build_info: GaugeVec,
}

fn opts(name: &str, help: &str) -> Opts {
    Opts::new(name, help)
        .namespace(NAMESPACE)
        .subsystem(SUBSYSTEM)
}

impl ExporterMetrics {
    /// 创建并注册全部指标；`with_process_metrics` 为 true 时附加进程指标。
    pub fn new(with_process_metrics: bool) -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let scrapes_total = IntCounter::with_opts(opts(
            "scrapes_total",
            "Total number of times the exporter was scraped",
        ))?;
        registry.register(Box::new(scrapes_total.clone()))?;

        let scrape_errors_total = IntCounterVec::new(
            opts(
                "scrape_errors_total",
                "Total number of failed status queries per device",
            ),
            &[DEVICE_LABEL],
        )?;
        registry.register(Box::new(scrape_errors_total.clone()))?;

        let last_scrape_error = IntGauge::with_opts(opts(
            "last_scrape_error",
            "Whether the last collection cycle had a device error (1 for error, 0 for success)",
        ))?;
        registry.register(Box::new(last_scrape_error.clone()))?;

        let scrape_duration = HistogramVec::new(
            HistogramOpts::new(
                "scrape_duration_seconds",
                "Time spent querying each device",
            )
            .namespace(NAMESPACE)
            .subsystem(SUBSYSTEM)
            .buckets(prometheus::exponential_buckets(0.005, 2.0, 14)?),
            &[DEVICE_LABEL],
        )?;
        registry.register(Box::new(scrape_duration.clone()))?;

        let current = GaugeVec::new(opts("current", "Current in amperes"), &[DEVICE_LABEL])?;
        registry.register(Box::new(current.clone()))?;

        let voltage = GaugeVec::new(opts("voltage", "Voltage in volts"), &[DEVICE_LABEL])?;
        registry.register(Box::new(voltage.clone()))?;

        let power = GaugeVec::new(opts("power", "Power in watts"), &[DEVICE_LABEL])?;
        registry.register(Box::new(power.clone()))?;

        let switch_on = GaugeVec::new(
            opts("switch_on", "Whether the plug relay is on (1 for on, 0 for off)"),
            &[DEVICE_LABEL],
        )?;
        registry.register(Box::new(switch_on.clone()))?;

        let build_info = GaugeVec::new(
            opts("exporter_build_info", "Build metadata for the running exporter"),
            &["version"],
        )?;
        registry.register(Box::new(build_info.clone()))?;

        if with_process_metrics {
            register_process_collector(&registry)?;
        }

        Ok(Self {
            registry,
            scrapes_total,
            scrape_errors_total,
            last_scrape_error,
            scrape_duration,
            current,
            voltage,
            power,
            switch_on,
            build_info,
        })
    }

    pub fn set_build_info(&self, version: &str) {
        self.build_info.with_label_values(&[version]).set(1.0);
    }

    /// 预先创建设备的错误计数（值为 0），便于从首次抓取起计算速率。
    pub fn register_device(&self, device: &str) {
        let _ = self.scrape_errors_total.with_label_values(&[device]);
    }

    pub fn inc_scrapes(&self) {
        self.scrapes_total.inc();
    }

    pub fn set_last_scrape_error(&self, had_error: bool) {
        self.last_scrape_error.set(i64::from(had_error));
    }

    /// 记录一次成功查询：耗时与四个读数。
    pub fn observe_reading(&self, device: &str, elapsed: Duration, telemetry: &Telemetry) {
        self.scrape_duration
            .with_label_values(&[device])
            .observe(elapsed.as_secs_f64());
        self.current
            .with_label_values(&[device])
            .set(telemetry.current_amps);
        self.voltage
            .with_label_values(&[device])
            .set(telemetry.voltage_volts);
        self.power
            .with_label_values(&[device])
            .set(telemetry.power_watts);
        self.switch_on
            .with_label_values(&[device])
            .set(telemetry.switch_on_value());
    }

    /// 记录一次失败查询：错误计数加一，并移除该设备上一轮的读数。
    pub fn observe_failure(&self, device: &str, elapsed: Duration) {
        self.scrape_duration
            .with_label_values(&[device])
            .observe(elapsed.as_secs_f64());
        self.scrape_errors_total.with_label_values(&[device]).inc();
        for gauge in [&self.current, &self.voltage, &self.power, &self.switch_on] {
            let _ = gauge.remove_label_values(&[device]);
        }
    }

    /// 以 Prometheus 文本格式编码当前所有指标。
    pub fn encode(&self) -> Result<String, MetricsError> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

#[cfg(target_os = "linux")]
fn register_process_collector(registry: &Registry) -> Result<(), MetricsError> {
    let collector = prometheus::process_collector::ProcessCollector::for_self();
    registry.register(Box::new(collector))?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn register_process_collector(_registry: &Registry) -> Result<(), MetricsError> {
    Ok(())
}
