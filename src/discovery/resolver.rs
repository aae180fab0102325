//! 服务发现到选择器的桥接
//!
//! 后台任务持续读取 Watcher，把每份成员快照转换为节点集合后整体写入选择器。

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::Watcher;
use super::nodes_from_instances;
use crate::config::ResolverConfig;
use crate::error::{Result, SelectorError, map_infra_error};
use crate::selector::Rebalancer;

/// 解析器
///
/// 持有后台刷新任务；`stop` 或 drop 时取消任务并停止 Watcher。
#[derive(Debug)]
pub struct Resolver {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Resolver {
    /// 启动解析器
    ///
    /// `block` 模式下等待第一份有效成员列表写入后才返回，超时返回 `Discovery` 错误；
    /// 否则立即返回，由后台任务异步填充。
    pub async fn start<W, R>(
        watcher: W,
        rebalancer: Arc<R>,
        config: ResolverConfig,
    ) -> Result<Self>
    where
        W: Watcher + 'static,
        R: Rebalancer + ?Sized + 'static,
    {
        info!(
            scheme = %config.scheme,
            block = config.block,
            "Starting resolver"
        );
        let cancel = CancellationToken::new();
        let (ready_tx, ready_rx) = oneshot::channel();

        let handle = tokio::spawn(run_watch_loop(
            watcher,
            rebalancer,
            config.clone(),
            cancel.clone(),
            ready_tx,
        ));

        let resolver = Self {
            cancel,
            handle: Some(handle),
        };

        if !config.block {
            return Ok(resolver);
        }

        match tokio::time::timeout(config.timeout(), ready_rx).await {
            Ok(Ok(())) => Ok(resolver),
            Ok(Err(_)) => {
                resolver.stop().await?;
                Err(SelectorError::discovery(
                    "watcher finished before delivering any node",
                ))
            }
            Err(_) => {
                resolver.stop().await?;
                Err(SelectorError::discovery(format!(
                    "timed out after {:?} waiting for the first node list",
                    config.timeout()
                )))
            }
        }
    }

    /// 后台任务是否仍在运行
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// 停止解析器并等待后台任务退出
    pub async fn stop(mut self) -> Result<()> {
        info!("Stopping resolver");
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .map_err(|e| SelectorError::discovery(format!("resolver task failed: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_watch_loop<W, R>(
    mut watcher: W,
    rebalancer: Arc<R>,
    config: ResolverConfig,
    cancel: CancellationToken,
    ready_tx: oneshot::Sender<()>,
) where
    W: Watcher + 'static,
    R: Rebalancer + ?Sized + 'static,
{
    let mut ready_tx = Some(ready_tx);

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = watcher.next() => result,
        };

        match result {
            Ok(instances) => {
                let nodes = nodes_from_instances(&config.scheme, &instances);
                if nodes.is_empty() {
                    warn!(
                        instances = instances.len(),
                        scheme = %config.scheme,
                        "Refusing empty node list, keeping previous nodes"
                    );
                    continue;
                }

                info!(nodes = nodes.len(), "Service membership updated");
                rebalancer.store(nodes);
                if let Some(tx) = ready_tx.take() {
                    let _ = tx.send(());
                }
            }
            Err(err) => {
                let err = map_infra_error(err);
                if err == SelectorError::WatcherClosed {
                    debug!("Watcher closed, resolver exiting");
                    break;
                }

                error!(error = %err, "Failed to watch service membership");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(config.retry_delay()) => {}
                }
            }
        }
    }

    if let Err(e) = watcher.stop().await {
        warn!(error = %e, "Failed to stop watcher");
    }
}
