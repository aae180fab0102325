//! P2C（Power of Two Choices）负载均衡
//!
//! 随机抽取两个不同节点，选权重更高的一个。落选节点如果超过 `force_pick`
//! 未被选中，且探测令牌空闲，则强制选中它一次，让它的延迟和成功率得到刷新，
//! 已恢复的节点不会被永久饿死。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use http::Extensions;
use rand::Rng;
use tracing::debug;

use super::Balancer;
use crate::error::{Result, SelectorError};
use crate::selector::{DoneFunc, Node, WeightedNode};

/// 默认强制探测阈值
pub const DEFAULT_FORCE_PICK: Duration = Duration::from_secs(3);

/// P2C 负载均衡器
///
/// 除探测令牌外无状态；令牌属于单个实例，不同选择器之间互不影响。
#[derive(Debug)]
pub struct P2cBalancer {
    force_pick: Duration,
    picked: AtomicBool,
}

impl P2cBalancer {
    pub fn new(force_pick: Duration) -> Self {
        Self {
            force_pick,
            picked: AtomicBool::new(false),
        }
    }

    /// 抽取两个不同的下标
    fn pre_pick<'a>(
        &self,
        nodes: &'a [Arc<WeightedNode>],
    ) -> (&'a Arc<WeightedNode>, &'a Arc<WeightedNode>) {
        let mut rng = rand::thread_rng();
        let a = rng.gen_range(0..nodes.len());
        let mut b = rng.gen_range(0..nodes.len() - 1);
        if b >= a {
            b += 1;
        }
        (&nodes[a], &nodes[b])
    }
}

impl Default for P2cBalancer {
    fn default() -> Self {
        Self::new(DEFAULT_FORCE_PICK)
    }
}

impl Balancer for P2cBalancer {
    fn pick(
        &self,
        _ctx: &Extensions,
        nodes: &[Arc<WeightedNode>],
    ) -> Result<(Arc<WeightedNode>, DoneFunc)> {
        match nodes {
            [] => return Err(SelectorError::NoAvailable),
            [only] => {
                let done = only.pick();
                return Ok((Arc::clone(only), done));
            }
            _ => {}
        }

        let (node_a, node_b) = self.pre_pick(nodes);
        let (mut chosen, other) = if node_b.weight() > node_a.weight() {
            (node_b, node_a)
        } else {
            (node_a, node_b)
        };

        if other.pick_elapsed() > self.force_pick
            && self
                .picked
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
        {
            debug!(
                address = %other.address(),
                elapsed = ?other.pick_elapsed(),
                "Forcing pick of starved node"
            );
            chosen = other;
            self.picked.store(false, Ordering::Release);
        }

        let done = chosen.pick();
        Ok((Arc::clone(chosen), done))
    }
}
