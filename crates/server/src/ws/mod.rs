/// WebSocket 模块
///
/// 管理与壁纸页面的 WebSocket 连接

pub mod frontend_handler;

pub use frontend_handler::{handle_frontend_websocket, FrontendConnectionManager, FrontendMessage};
