//! Flare Selector
//!
//! 客户端自适应负载均衡：P2C + EWMA 选择器、可插拔的负载均衡策略，
//! 以及连接服务发现和选择器的 Resolver。

pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod selector;

// Re-exports
pub use config::{Config, LoggingConfig, NodeStatsConfig, ResolverConfig, SelectorConfig};
pub use discovery::{
    ChannelWatcher, Resolver, ServiceInstance, Watcher, nodes_from_instances, parse_endpoint,
};
pub use error::{CallError, InfraResult, InfraResultExt, Result, SelectorError};
pub use selector::{
    Balancer, DefaultClassifier, DoneFunc, DoneInfo, LoadBalanceStrategy, Node, NodeFilter,
    OutcomeClassifier, P2cBalancer, Peer, Rebalancer, SelectOptions, Selector, SelectorBuilder,
    ServiceNode, WeightedNode, WeightedNodeBuilder, global_selector, metadata_filter,
    new_peer_context, peer_from_context, set_global_selector, version_filter,
};
