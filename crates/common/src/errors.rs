use thiserror::Error;

/// 统一错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// 推送数据格式错误或缺少字段
    #[error("解析错误: {0}")]
    Parse(String),

    /// 请求的浏览器能力不可用（GPU 上下文、设备内存、网络信息等）
    #[error("能力不可用: {0}")]
    CapabilityUnavailable(String),

    /// 显示目标缺失
    #[error("渲染失败: {0}")]
    Render(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("无效参数: {0}")]
    InvalidArgument(String),

    #[error("内部错误: {0}")]
    Internal(String),

    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// 是否为推送数据解析错误
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

/// 统一结果类型
pub type Result<T> = std::result::Result<T, Error>;
