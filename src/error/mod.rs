//! Flare Selector 错误处理模块
//!
//! 选择器自身只有 `NoAvailable` 一种业务失败；其余错误来自服务发现和配置加载。
//! `CallError` 是传输层回传给统计模块的调用结果，不是选择器的故障。

pub mod call;
pub mod conversions;
pub mod selector_error;

pub use call::CallError;
pub use selector_error::{Result, SelectorError};

/// 外部协作方（Watcher 等）使用的结果类型
pub type InfraResult<T> = anyhow::Result<T>;

/// 将外部错误转换为 `SelectorError`
///
/// 如果错误链中本身就是 `SelectorError`，原样返回。
pub fn map_infra_error(error: anyhow::Error) -> SelectorError {
    match error.downcast::<SelectorError>() {
        Ok(err) => err,
        Err(other) => SelectorError::discovery(format!("{:#}", other)),
    }
}

/// `InfraResult` 的辅助扩展，用于快速转换为统一的错误类型
pub trait InfraResultExt<T> {
    fn into_selector(self) -> Result<T>;
}

impl<T> InfraResultExt<T> for InfraResult<T> {
    fn into_selector(self) -> Result<T> {
        self.map_err(map_infra_error)
    }
}
