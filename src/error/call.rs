//! 调用结果错误
//!
//! 传输层在调用完成后通过 `DoneInfo` 回传的错误类型，与具体协议无关。

use http::StatusCode;
use thiserror::Error;

/// 出站调用失败原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// 调用超时
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// 调用被取消
    #[error("call canceled")]
    Canceled,

    /// 对端返回的 HTTP 状态
    #[error("upstream responded with status {0}")]
    Status(StatusCode),

    /// 网络错误
    #[error("network error: {0}")]
    Network(String),
}

impl CallError {
    /// 创建网络错误
    pub fn network(reason: impl Into<String>) -> Self {
        CallError::Network(reason.into())
    }

    /// 是否属于"服务不可用 / 网关超时"一类
    pub fn is_unavailable(&self) -> bool {
        match self {
            CallError::Status(code) => {
                *code == StatusCode::SERVICE_UNAVAILABLE || *code == StatusCode::GATEWAY_TIMEOUT
            }
            _ => false,
        }
    }
}
