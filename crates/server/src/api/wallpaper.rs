/// 壁纸辅助接口
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use monitor::wallpaper::{analyze_zones, fallback_gradient, FallbackWallpaper, ZoneAnalysis};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ApiError;
use crate::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct ScheduleStatus {
    pub today: NaiveDate,
    pub last_fetched: Option<NaiveDate>,
    pub needs_refresh: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct FetchedRequest {
    /// 缺省为今天
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct FallbackQuery {
    /// 缺省为当前本地小时
    pub hour: Option<u32>,
}

/// RGBA 像素数据
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/fetched", post(mark_fetched))
        .route("/fallback", get(get_fallback))
        .route("/analyze", post(analyze))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

async fn get_status(State(state): State<AppState>) -> Json<ScheduleStatus> {
    let today = today();
    let schedule = state.schedule.read().await;
    Json(ScheduleStatus {
        today,
        last_fetched: schedule.last_fetched(),
        needs_refresh: schedule.needs_refresh(today),
    })
}

async fn mark_fetched(
    State(state): State<AppState>,
    body: Option<Json<FetchedRequest>>,
) -> Json<ScheduleStatus> {
    let today = today();
    let date = body.and_then(|Json(req)| req.date).unwrap_or(today);

    let mut schedule = state.schedule.write().await;
    schedule.mark_fetched(date);
    info!("🖼️ 壁纸获取日期已记录: {}", date);

    Json(ScheduleStatus {
        today,
        last_fetched: schedule.last_fetched(),
        needs_refresh: schedule.needs_refresh(today),
    })
}

async fn get_fallback(
    State(state): State<AppState>,
    Query(query): Query<FallbackQuery>,
) -> Result<Json<FallbackWallpaper>, ApiError> {
    let hour = query.hour.unwrap_or_else(|| state.clock.local_hour());
    if hour > 23 {
        return Err(ApiError::BadRequest(format!("无效的小时: {}", hour)));
    }
    Ok(Json(fallback_gradient(hour)))
}

async fn analyze(Json(req): Json<AnalyzeRequest>) -> Result<Json<Vec<ZoneAnalysis>>, ApiError> {
    let zones = analyze_zones(&req.pixels, req.width, req.height)?;
    Ok(Json(zones))
}

#[cfg(test)]
mod tests {
    use crate::app_state::tests::test_state;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_schedule_status_and_fetch() {
        let (state, _task) = test_state();
        let app = crate::build_router(state);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/wallpaper/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await["needs_refresh"], true);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/wallpaper/fetched")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["needs_refresh"], false);
    }

    #[tokio::test]
    async fn test_fallback_gradient_by_hour() {
        let (state, _task) = test_state();
        let app = crate::build_router(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/wallpaper/fallback?hour=19")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json["period"], "evening");
        assert_eq!(json["theme"]["color"], "#ffffff");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/wallpaper/fallback?hour=30")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_bright_image() {
        let (state, _task) = test_state();
        let pixels: Vec<u8> = std::iter::repeat([250u8, 250, 250, 255])
            .take(25)
            .flatten()
            .collect();
        let body = serde_json::json!({ "width": 5, "height": 5, "pixels": pixels });

        let response = crate::build_router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/wallpaper/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json[0]["zone"], "specs");
        assert_eq!(json[1]["theme"]["color"], "#000000");
    }

    #[tokio::test]
    async fn test_analyze_huge_dimensions_is_bad_request() {
        let (state, _task) = test_state();
        let body = serde_json::json!({ "width": u32::MAX, "height": u32::MAX, "pixels": [] });

        let response = crate::build_router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/wallpaper/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
