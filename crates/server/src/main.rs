/// Daily Wallpaper - Server
///
/// 壁纸页面的本地服务：接收宿主推送，通过 WebSocket 向页面下发指标并收集浏览器性能信号

mod api;
mod app_state;
mod config;
mod display;
mod telemetry;
mod ws;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    let cfg = config::Config::from_env()?;

    // 可以通过环境变量 RUST_LOG 设置日志级别，未设置时使用 LOG_LEVEL
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level)),
        )
        .init();

    info!("🚀 启动 Daily Wallpaper Server...");
    info!("✅ 配置加载成功: {:?}", cfg.monitor);

    let (app_state, controller, events) = AppState::build(&cfg.monitor)?;
    let controller_task = tokio::spawn(controller.run(events));
    info!("✅ 监控控制器已启动");

    let app = build_router(app_state.clone());

    // 启动服务器
    let addr = SocketAddr::from(([127, 0, 0, 1], cfg.server_port));
    info!("🎯 服务器监听在 http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app_state.controller().shutdown().ok();
    if let Err(e) = controller_task.await {
        error!("监控控制器异常退出: {}", e);
    }
    info!("👋 服务器已停止");

    Ok(())
}

/// 构建应用路由
pub(crate) fn build_router(state: AppState) -> Router {
    // 页面以本地文件方式加载，需要放开跨域
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/ws/frontend", get(ws::handle_frontend_websocket))
        .nest("/api", api::api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("监听退出信号失败: {}", e);
    }
    info!("收到退出信号");
}

async fn root_handler() -> &'static str {
    "Daily Wallpaper Server v1"
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.telemetry.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("导出监控指标失败: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
