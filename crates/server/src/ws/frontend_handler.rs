/// 页面 WebSocket 连接处理器
///
/// 向壁纸页面推送指示器更新，并接收页面上报的帧耗时、堆内存和能力信号

use axum::extract::ws::{Message as AxumWsMessage, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use common::models::BrowserSignals;
use futures_util::{SinkExt, StreamExt};
use monitor::metrics::HeapSample;
use monitor::{IndicatorKind, SpecIndicator};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app_state::AppState;

/// 页面连接信息
#[derive(Debug, Clone)]
pub struct FrontendConnection {
    pub connection_id: String,

    /// 发送消息的通道
    pub sender: mpsc::UnboundedSender<FrontendMessage>,

    pub connected_at: chrono::DateTime<chrono::Utc>,
}

/// 发往页面的消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrontendMessage {
    /// 单个指示器更新
    IndicatorUpdate {
        indicator: IndicatorKind,
        label: String,
        bar_percent: f64,
    },
    /// 心跳响应
    Pong {
        timestamp: i64,
    },
}

impl From<&SpecIndicator> for FrontendMessage {
    fn from(indicator: &SpecIndicator) -> Self {
        Self::IndicatorUpdate {
            indicator: indicator.kind,
            label: indicator.label.clone(),
            bar_percent: indicator.bar_percent,
        }
    }
}

/// 页面上报的消息
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingMessage {
    Ping,
    /// 单帧回调时间戳（毫秒）
    Frame {
        timestamp: f64,
    },
    /// 一批帧耗时（毫秒）
    FrameTimes {
        durations_ms: Vec<f64>,
    },
    HeapSample {
        used_bytes: f64,
        total_bytes: f64,
        #[serde(default)]
        timestamp: Option<i64>,
    },
    Capabilities(BrowserSignals),
}

/// 页面连接管理器
#[derive(Clone)]
pub struct FrontendConnectionManager {
    /// connection_id -> FrontendConnection
    connections: Arc<RwLock<HashMap<String, Arc<FrontendConnection>>>>,
}

impl FrontendConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 注册新的页面连接
    pub async fn register(
        &self,
        connection_id: String,
        sender: mpsc::UnboundedSender<FrontendMessage>,
    ) -> Arc<FrontendConnection> {
        let connection = Arc::new(FrontendConnection {
            connection_id: connection_id.clone(),
            sender,
            connected_at: chrono::Utc::now(),
        });

        let mut connections = self.connections.write().await;
        connections.insert(connection_id.clone(), connection.clone());

        info!("页面连接已注册: {}", connection_id);
        connection
    }

    /// 注销页面连接
    pub async fn unregister(&self, connection_id: &str) {
        let mut connections = self.connections.write().await;
        if connections.remove(connection_id).is_some() {
            info!("页面连接已注销: {}", connection_id);
        }
    }

    /// 获取连接数量
    pub async fn count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }

    /// 向所有连接广播消息
    pub async fn broadcast(&self, message: FrontendMessage) -> usize {
        let connections = self.connections.read().await;
        let mut count = 0;

        for (connection_id, conn) in connections.iter() {
            if let Err(e) = conn.sender.send(message.clone()) {
                warn!("向页面连接 {} 发送消息失败: {}", connection_id, e);
            } else {
                count += 1;
            }
        }

        count
    }
}

impl Default for FrontendConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket 升级处理器
pub async fn handle_frontend_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_frontend_connection(socket, state))
}

/// 处理页面 WebSocket 连接
async fn handle_frontend_connection(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4().to_string();
    info!("新的页面 WebSocket 连接: {}", connection_id);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<FrontendMessage>();

    let connection = state
        .frontend_manager()
        .register(connection_id.clone(), tx.clone())
        .await;

    // 新连接立即补发最近一次快照
    if let Some(snapshot) = state.latest_snapshot().await {
        for indicator in state.visible_indicators(&snapshot) {
            let _ = tx.send(FrontendMessage::from(&indicator));
        }
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = send_frontend_message(&mut ws_sender, msg).await {
                error!("发送页面消息失败: {}", e);
                break;
            }
        }
        debug!("页面消息发送任务结束");
    });

    let connection_clone = connection.clone();
    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(AxumWsMessage::Text(text)) => {
                    if let Err(e) = handle_incoming_text(&text, &connection_clone, &state_clone).await {
                        warn!("处理页面消息失败: {}", e);
                    }
                }
                Ok(AxumWsMessage::Close(_)) => {
                    debug!("页面连接关闭");
                    break;
                }
                Ok(_) => {
                    debug!("忽略非文本页面消息");
                }
                Err(e) => {
                    error!("接收页面消息错误: {}", e);
                    break;
                }
            }
        }
        debug!("页面消息接收任务结束");
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    state.frontend_manager().unregister(&connection_id).await;
    info!("页面连接已关闭: {}", connection_id);
}

/// 处理页面上报的文本消息
pub(crate) async fn handle_incoming_text(
    text: &str,
    connection: &FrontendConnection,
    state: &AppState,
) -> common::Result<()> {
    let msg: IncomingMessage = serde_json::from_str(text)
        .map_err(|e| common::Error::Parse(format!("无法识别的页面消息: {}", e)))?;

    let collector = state.collector();
    match msg {
        IncomingMessage::Ping => {
            let pong = FrontendMessage::Pong {
                timestamp: chrono::Utc::now().timestamp(),
            };
            if let Err(e) = connection.sender.send(pong) {
                warn!("发送心跳响应失败: {}", e);
            }
        }
        IncomingMessage::Frame { timestamp } => collector.on_frame(timestamp).await,
        IncomingMessage::FrameTimes { durations_ms } => collector.record_frames(&durations_ms).await,
        IncomingMessage::HeapSample {
            used_bytes,
            total_bytes,
            timestamp,
        } => {
            collector
                .record_heap(HeapSample {
                    used_bytes,
                    total_bytes,
                    timestamp: timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
                })
                .await
        }
        IncomingMessage::Capabilities(signals) => {
            debug!("页面能力信号: {:?}", signals);
            collector.update_signals(signals).await
        }
    }

    Ok(())
}

async fn send_frontend_message(
    sender: &mut futures_util::stream::SplitSink<WebSocket, AxumWsMessage>,
    msg: FrontendMessage,
) -> common::Result<()> {
    let json = serde_json::to_string(&msg)?;

    sender
        .send(AxumWsMessage::Text(json))
        .await
        .map_err(|e| common::Error::Internal(format!("发送页面 WebSocket 消息失败: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::tests::test_state;

    #[test]
    fn test_outgoing_message_format() {
        let msg = FrontendMessage::IndicatorUpdate {
            indicator: IndicatorKind::Ram,
            label: "8.0GB/16.0GB (50.0%)".to_string(),
            bar_percent: 50.0,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "indicator_update");
        assert_eq!(json["indicator"], "ram");
    }

    #[test]
    fn test_incoming_message_parsing() {
        let msg: IncomingMessage =
            serde_json::from_str(r#"{"type":"capabilities","hardware_concurrency":8}"#).unwrap();
        assert_eq!(
            msg,
            IncomingMessage::Capabilities(BrowserSignals {
                hardware_concurrency: Some(8),
                ..Default::default()
            })
        );

        let msg: IncomingMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, IncomingMessage::Ping);
    }

    #[tokio::test]
    async fn test_incoming_signals_reach_collector() {
        let (state, _rx) = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection = FrontendConnection {
            connection_id: "test".to_string(),
            sender: tx,
            connected_at: chrono::Utc::now(),
        };

        handle_incoming_text(r#"{"type":"frame_times","durations_ms":[16.0,18.0]}"#, &connection, &state)
            .await
            .unwrap();
        handle_incoming_text(
            r#"{"type":"heap_sample","used_bytes":100,"total_bytes":400}"#,
            &connection,
            &state,
        )
        .await
        .unwrap();
        handle_incoming_text(r#"{"type":"capabilities","device_memory_gb":8}"#, &connection, &state)
            .await
            .unwrap();
        handle_incoming_text(r#"{"type":"ping"}"#, &connection, &state)
            .await
            .unwrap();

        let history = state.collector().history().await;
        assert_eq!(history.frame_count(), 2);
        assert_eq!(history.mean_frame_time(), Some(17.0));
        assert_eq!(history.heap_count(), 1);
        assert_eq!(state.collector().signals().await.device_memory_gb, Some(8.0));
        assert!(matches!(rx.try_recv(), Ok(FrontendMessage::Pong { .. })));

        let err = handle_incoming_text("{\"type\":\"reboot\"}", &connection, &state)
            .await
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_registered_connections() {
        let manager = FrontendConnectionManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.register("a".to_string(), tx).await;
        assert_eq!(manager.count().await, 1);

        let sent = manager
            .broadcast(FrontendMessage::Pong { timestamp: 1 })
            .await;
        assert_eq!(sent, 1);
        assert_eq!(rx.try_recv().unwrap(), FrontendMessage::Pong { timestamp: 1 });

        manager.unregister("a").await;
        assert_eq!(manager.count().await, 0);
    }
}
