//! HTTP 处理器

use crate::{AppState, PROGRAM_NAME};
use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use plug_collector::CollectionReport;
use plug_telemetry::ExporterMetrics;
use tracing::error;

/// 渲染首页，链接到指标路径
pub fn landing_page(telemetry_path: &str) -> String {
    format!(
        "<html>\n<head><title>{name}</title></head>\n<body>\n<h1>{name}</h1>\n\
         <p><a href='{path}'>Metrics</a></p>\n<p><a href='/health'>Health</a></p>\n\
         </body>\n</html>\n",
        name = PROGRAM_NAME.replace('_', " "),
        path = telemetry_path
    )
}

pub async fn landing(State(state): State<AppState>) -> Html<String> {
    Html(state.landing_page.to_string())
}

pub async fn health() -> &'static str {
    "OK"
}

/// 每次抓取执行一轮采集，再输出全部指标
pub async fn scrape(State(state): State<AppState>) -> Response {
    let metrics = &state.metrics;
    metrics.inc_scrapes();

    // 在轮次锁内写入指标，重叠的抓取不会交错写入
    let sink = metrics.clone();
    state
        .collector
        .collect_with(move |report| apply_report(&sink, report))
        .await;

    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, metrics.content_type())],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "metrics encoding error",
            )
                .into_response()
        }
    }
}

fn apply_report(metrics: &ExporterMetrics, report: &CollectionReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(telemetry) => metrics.observe_reading(&outcome.name, outcome.duration, telemetry),
            Err(_) => metrics.observe_failure(&outcome.name, outcome.duration),
        }
    }
    metrics.set_last_scrape_error(report.had_error);
}
