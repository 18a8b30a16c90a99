use std::sync::Arc;

use axum::{routing::get, Router};
use bookshelf_domain::value_objects::ProcessedCounter;
use tower_http::trace::TraceLayer;

use crate::handlers::{health::health_check, status::worker_status};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub processed_counter: Arc<ProcessedCounter>,
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // Worker处理计数
        .route("/", get(worker_status))
        // 健康检查
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
