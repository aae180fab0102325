//! 选择器统一错误类型

use http::StatusCode;
use thiserror::Error;

/// 选择器错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// 没有可用节点（尚未发布节点集合，或全部被过滤器剔除）
    #[error("no available node")]
    NoAvailable,

    /// 无法解析的服务端点
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// 服务发现错误
    #[error("discovery error: {0}")]
    Discovery(String),

    /// Watcher 已关闭
    #[error("watcher closed")]
    WatcherClosed,

    /// 配置错误
    #[error("configuration error: {0}")]
    Config(String),

    /// IO 错误
    #[error("io error: {0}")]
    Io(String),
}

impl SelectorError {
    /// 创建服务发现错误
    pub fn discovery(reason: impl Into<String>) -> Self {
        SelectorError::Discovery(reason.into())
    }

    /// 创建配置错误
    pub fn config(reason: impl Into<String>) -> Self {
        SelectorError::Config(reason.into())
    }

    /// 判断是否为可重试的错误
    ///
    /// `NoAvailable` 在本层不可重试，跨节点重试由传输层重新调用 `select` 完成。
    pub fn is_retryable(&self) -> bool {
        matches!(self, SelectorError::Discovery(_) | SelectorError::Io(_))
    }

    /// 映射到 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            SelectorError::NoAvailable => StatusCode::SERVICE_UNAVAILABLE,
            SelectorError::InvalidEndpoint(_) => StatusCode::BAD_REQUEST,
            SelectorError::Discovery(_) | SelectorError::WatcherClosed => StatusCode::BAD_GATEWAY,
            SelectorError::Config(_) | SelectorError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, SelectorError>;
