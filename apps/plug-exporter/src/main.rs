//! 智能插座 Prometheus 导出器：启动时加载设备清单，每次抓取触发一轮采集。

mod handlers;
mod middleware;
mod routes;

use plug_collector::{Collector, CollectorConfig};
use plug_config::{AppConfig, load_devices};
use plug_telemetry::{ExporterMetrics, init_tracing};
use std::sync::Arc;
use tracing::{error, info};

pub(crate) const PROGRAM_NAME: &str = "tuya_smartplug_exporter";

#[derive(Clone)]
pub(crate) struct AppState {
    pub collector: Collector,
    pub metrics: ExporterMetrics,
    pub landing_page: Arc<str>,
}

impl AppState {
    pub fn new(collector: Collector, metrics: ExporterMetrics, telemetry_path: &str) -> Self {
        for name in collector.device_names() {
            metrics.register_device(name);
        }
        metrics.set_build_info(env!("CARGO_PKG_VERSION"));
        Self {
            collector,
            metrics,
            landing_page: Arc::from(handlers::landing_page(telemetry_path)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 初始化结构化日志
    init_tracing();

    // 从环境变量加载运行配置
    let config = AppConfig::from_env()
        .inspect_err(|err| error!(error = %err, "invalid configuration"))?;
    info!(
        program = PROGRAM_NAME,
        version = env!("CARGO_PKG_VERSION"),
        config = %config.config_file,
        "starting exporter"
    );

    // 设备清单为空或不可读时直接退出
    let devices = load_devices(&config.config_file)
        .inspect_err(|err| error!(error = %err, "error reading device list"))?;
    info!(devices = devices.len(), "configured devices");

    let collector = Collector::with_config(
        &devices,
        CollectorConfig {
            max_concurrency: config.max_concurrency,
        },
    );
    let metrics = ExporterMetrics::new(!config.disable_default_metrics)?;
    let state = AppState::new(collector, metrics, &config.telemetry_path);
    let app = routes::create_router(state, &config.telemetry_path);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(
        addr = %config.http_addr,
        path = %config.telemetry_path,
        "listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("exporter shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
