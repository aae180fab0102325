//! 平滑加权轮询（nginx 算法）
//!
//! 使用服务发布方声明的权重，未声明时按 [`DEFAULT_WEIGHT`] 计。
//! 当前权重保存在加权节点上，随节点集合代际一起替换。

use std::sync::Arc;
use std::sync::atomic::Ordering;

use http::Extensions;
use parking_lot::Mutex;

use super::Balancer;
use crate::error::{Result, SelectorError};
use crate::selector::{DoneFunc, Node, WeightedNode};

/// 未声明权重时的默认值
pub const DEFAULT_WEIGHT: i64 = 100;

/// 加权轮询负载均衡器
#[derive(Debug, Default)]
pub struct WrrBalancer {
    lock: Mutex<()>,
}

impl WrrBalancer {
    pub fn new() -> Self {
        Self::default()
    }
}

fn effective_weight(node: &WeightedNode) -> i64 {
    node.initial_weight().unwrap_or(DEFAULT_WEIGHT).max(1)
}

impl Balancer for WrrBalancer {
    fn pick(
        &self,
        _ctx: &Extensions,
        nodes: &[Arc<WeightedNode>],
    ) -> Result<(Arc<WeightedNode>, DoneFunc)> {
        if nodes.is_empty() {
            return Err(SelectorError::NoAvailable);
        }

        let guard = self.lock.lock();

        let mut total: i64 = 0;
        let mut selected: Option<(&Arc<WeightedNode>, i64)> = None;
        for node in nodes {
            let weight = effective_weight(node);
            total += weight;
            let cwt = node.wrr_current().fetch_add(weight, Ordering::Relaxed) + weight;
            match selected {
                Some((_, best)) if best >= cwt => {}
                _ => selected = Some((node, cwt)),
            }
        }

        let Some((chosen, _)) = selected else {
            return Err(SelectorError::NoAvailable);
        };
        chosen.wrr_current().fetch_sub(total, Ordering::Relaxed);
        drop(guard);

        let done = chosen.pick();
        Ok((Arc::clone(chosen), done))
    }
}
