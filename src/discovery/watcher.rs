//! 服务发现 Watcher 抽象

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::discovery::instance::ServiceInstance;
use crate::error::{InfraResult, SelectorError};

/// 服务成员变化监听器
///
/// 由服务发现后端（etcd、consul、DNS、静态列表等）实现。
/// 注意：由于需要动态分发（dyn），使用 async-trait
#[async_trait]
pub trait Watcher: Send {
    /// 阻塞直到成员发生变化，返回完整的当前实例列表
    ///
    /// 返回 `SelectorError::WatcherClosed` 表示不会再有更新。
    async fn next(&mut self) -> InfraResult<Vec<ServiceInstance>>;

    /// 停止监听
    async fn stop(&mut self) -> InfraResult<()>;
}

/// 基于 mpsc 通道的 Watcher
///
/// 发送端每次推送一份完整的成员快照。
pub struct ChannelWatcher {
    rx: mpsc::Receiver<Vec<ServiceInstance>>,
}

impl ChannelWatcher {
    pub fn new(rx: mpsc::Receiver<Vec<ServiceInstance>>) -> Self {
        Self { rx }
    }

    /// 创建通道和对应的 Watcher
    pub fn channel(buffer: usize) -> (mpsc::Sender<Vec<ServiceInstance>>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl Watcher for ChannelWatcher {
    async fn next(&mut self) -> InfraResult<Vec<ServiceInstance>> {
        match self.rx.recv().await {
            Some(instances) => Ok(instances),
            None => Err(SelectorError::WatcherClosed.into()),
        }
    }

    async fn stop(&mut self) -> InfraResult<()> {
        self.rx.close();
        Ok(())
    }
}
