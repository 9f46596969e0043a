//! 路由定义
//!
//! - 首页：/
//! - 健康检查：/health
//! - 指标：可配置路径（默认 /metrics）

use super::AppState;
use super::handlers::{health, landing, scrape};
use super::middleware::request_context;
use axum::{Router, middleware, routing::get};

/// 创建导出器路由，所有请求注入 request_id/trace_id
pub fn create_router(state: AppState, telemetry_path: &str) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/health", get(health))
        .route(telemetry_path, get(scrape))
        .with_state(state)
        .layer(middleware::from_fn(request_context))
}
