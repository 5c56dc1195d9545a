/// 宿主推送接口
///
/// 宿主以原始 JSON 推送系统信息，解析结果同步返回给调用方

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;
use tracing::debug;

use super::ApiError;
use crate::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct PushAccepted {
    pub state: monitor::ControllerState,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/system-info", post(push_system_info))
}

async fn push_system_info(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<PushAccepted>), ApiError> {
    debug!("收到推送数据: {} bytes", body.len());
    let controller = state.controller();

    let result = controller.push(body).await;
    if let Err(common::Error::Internal(msg)) = &result {
        return Err(ApiError::Unavailable(msg.clone()));
    }
    state.telemetry.record_push(result.is_ok());
    result?;

    Ok((
        StatusCode::ACCEPTED,
        Json(PushAccepted {
            state: controller.state(),
        }),
    ))
}
