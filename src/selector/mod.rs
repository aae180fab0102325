//! 客户端自适应负载均衡
//!
//! 数据流：服务发现 → `Selector::store`（整体替换节点集合）→ `Selector::select`
//! （每次调用一次，过滤后交给负载均衡器）→ 传输层发起调用 → `DoneFunc::done`
//! 更新节点统计。

pub mod balancer;
pub mod builder;
pub mod classify;
pub mod default;
pub mod done;
pub mod filter;
pub mod node;
pub mod peer;
pub mod weighted;

pub use balancer::{Balancer, LoadBalanceStrategy, P2cBalancer, RandomBalancer, WrrBalancer};
pub use builder::{SelectorBuilder, global_selector, set_global_selector};
pub use classify::{DefaultClassifier, ErrorHandler, OutcomeClassifier};
pub use default::Selector;
pub use done::{DoneFunc, DoneInfo};
pub use filter::{NodeFilter, SelectOptions, metadata_filter, version_filter};
pub use node::{Node, ServiceNode, same_endpoint};
pub use peer::{Peer, new_peer_context, peer_from_context};
pub use weighted::{WeightedNode, WeightedNodeBuilder};

use std::sync::Arc;

/// 节点集合的写入方，服务发现每次推送完整成员列表时调用
pub trait Rebalancer: Send + Sync {
    fn store(&self, nodes: Vec<Arc<dyn Node>>);
}
