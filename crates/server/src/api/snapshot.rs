/// 最近一次显示的快照
use axum::{extract::State, routing::get, Json, Router};
use common::MetricSnapshot;

use super::ApiError;
use crate::app_state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/snapshot", get(get_snapshot))
}

async fn get_snapshot(State(state): State<AppState>) -> Result<Json<MetricSnapshot>, ApiError> {
    state
        .latest_snapshot()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("尚未生成快照".to_string()))
}
