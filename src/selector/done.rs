//! 调用完成回调

use std::fmt;

use http::HeaderMap;
use tower::BoxError;

use crate::error::CallError;

/// 调用结果
///
/// 传输层在响应或失败确定后构造，交给 [`DoneFunc::done`]。
#[derive(Default)]
pub struct DoneInfo {
    /// 调用错误，`None` 表示成功
    pub err: Option<BoxError>,
    /// 请求是否已发出
    pub bytes_sent: bool,
    /// 是否收到了响应数据
    pub bytes_received: bool,
    /// 响应元数据
    pub reply_md: Option<HeaderMap>,
}

impl DoneInfo {
    /// 成功的调用
    pub fn success() -> Self {
        Self {
            bytes_sent: true,
            bytes_received: true,
            ..Default::default()
        }
    }

    /// 失败的调用
    pub fn from_error(err: impl Into<BoxError>) -> Self {
        Self {
            err: Some(err.into()),
            ..Default::default()
        }
    }

    /// 被取消的调用
    pub fn canceled() -> Self {
        Self::from_error(CallError::Canceled)
    }

    /// 设置响应元数据
    pub fn with_reply_md(mut self, md: HeaderMap) -> Self {
        self.reply_md = Some(md);
        self
    }

    /// 设置收发标记
    pub fn with_bytes(mut self, sent: bool, received: bool) -> Self {
        self.bytes_sent = sent;
        self.bytes_received = received;
        self
    }
}

impl fmt::Debug for DoneInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoneInfo")
            .field("err", &self.err.as_ref().map(|e| e.to_string()))
            .field("bytes_sent", &self.bytes_sent)
            .field("bytes_received", &self.bytes_received)
            .finish()
    }
}

/// 调用完成回调
///
/// 每次 `pick` 对应一个 `DoneFunc`，`done` 消费自身，因此最多调用一次。
/// 未调用就被丢弃时按取消处理，保证节点的 in-flight 计数总能归还。
#[must_use = "DoneFunc must be completed with the call outcome"]
pub struct DoneFunc {
    inner: Option<Box<dyn FnOnce(DoneInfo) + Send>>,
}

impl DoneFunc {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(DoneInfo) + Send + 'static,
    {
        Self {
            inner: Some(Box::new(f)),
        }
    }

    /// 上报调用结果
    pub fn done(mut self, info: DoneInfo) {
        if let Some(f) = self.inner.take() {
            f(info);
        }
    }
}

impl Drop for DoneFunc {
    fn drop(&mut self) {
        if let Some(f) = self.inner.take() {
            f(DoneInfo::canceled());
        }
    }
}

impl fmt::Debug for DoneFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoneFunc")
            .field("pending", &self.inner.is_some())
            .finish()
    }
}
