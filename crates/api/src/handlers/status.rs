use axum::extract::State;

use crate::routes::AppState;

/// Worker处理计数，纯文本只读输出
///
/// 只反映成功ack的单调计数，失败信息一律走进程日志。
pub async fn worker_status(State(state): State<AppState>) -> String {
    format!(
        "This worker has processed {} books.",
        state.processed_counter.get()
    )
}
