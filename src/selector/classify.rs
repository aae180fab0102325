//! 调用结果分类
//!
//! 决定一次调用在成功率统计中记为成功（1000）还是失败（0）。

use std::error::Error as StdError;
use std::sync::Arc;

use tonic::Code;

use super::DoneInfo;
use crate::error::CallError;

/// 应用层错误判定函数，返回 `true` 表示这次调用应记为失败
pub type ErrorHandler = Arc<dyn Fn(&(dyn StdError + Send + Sync + 'static)) -> bool + Send + Sync>;

/// 调用结果分类器
pub trait OutcomeClassifier: Send + Sync {
    /// 返回 `true` 表示这次调用记为失败
    fn is_failure(&self, info: &DoneInfo) -> bool;
}

impl<F> OutcomeClassifier for F
where
    F: Fn(&DoneInfo) -> bool + Send + Sync,
{
    fn is_failure(&self, info: &DoneInfo) -> bool {
        self(info)
    }
}

/// 默认分类器
///
/// 以下错误记为失败：超时、取消、服务不可用（503）、网关超时（504）、网络错误，
/// 以及应用层错误判定函数认定的错误。其余错误（如参数错误）说明节点本身是健康的。
#[derive(Clone, Default)]
pub struct DefaultClassifier {
    error_handler: Option<ErrorHandler>,
}

impl DefaultClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置应用层错误判定函数
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&(dyn StdError + Send + Sync + 'static)) -> bool + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }
}

impl OutcomeClassifier for DefaultClassifier {
    fn is_failure(&self, info: &DoneInfo) -> bool {
        let Some(err) = info.err.as_deref() else {
            return false;
        };

        if let Some(handler) = &self.error_handler {
            if handler(err) {
                return true;
            }
        }

        let mut current: Option<&(dyn StdError + 'static)> = Some(err);
        while let Some(e) = current {
            if is_unhealthy_error(e) {
                return true;
            }
            current = e.source();
        }
        false
    }
}

fn is_unhealthy_error(err: &(dyn StdError + 'static)) -> bool {
    if let Some(call) = err.downcast_ref::<CallError>() {
        return match call {
            CallError::DeadlineExceeded | CallError::Canceled | CallError::Network(_) => true,
            CallError::Status(_) => call.is_unavailable(),
        };
    }
    if let Some(status) = err.downcast_ref::<tonic::Status>() {
        return matches!(
            status.code(),
            Code::DeadlineExceeded | Code::Cancelled | Code::Unavailable
        );
    }
    err.is::<std::io::Error>() || err.is::<tokio::time::error::Elapsed>()
}
