//! 选择器
//!
//! 持有一个逻辑目标（一个服务）的当前节点集合。服务发现通过 `store` 整体替换集合，
//! 传输层每次出站调用通过 `select` 取一个节点。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use http::Extensions;
use tracing::debug;

use super::balancer::Balancer;
use super::peer::peer_from_context;
use super::{DoneFunc, Node, Rebalancer, SelectOptions, WeightedNode, WeightedNodeBuilder};
use crate::error::{Result, SelectorError};

/// 一次 `store` 发布的不可变节点集合
struct Generation {
    weighted: Vec<Arc<WeightedNode>>,
    raw: Vec<Arc<dyn Node>>,
}

impl Generation {
    fn new(weighted: Vec<Arc<WeightedNode>>) -> Self {
        let raw = weighted.iter().map(|wn| Arc::clone(wn.raw())).collect();
        Self { weighted, raw }
    }

    /// 把过滤后的原始节点按指针映射回加权节点
    fn resolve(&self, filtered: &[Arc<dyn Node>]) -> Vec<Arc<WeightedNode>> {
        let index: HashMap<*const (), usize> = self
            .raw
            .iter()
            .enumerate()
            .map(|(i, node)| (Arc::as_ptr(node) as *const (), i))
            .collect();

        filtered
            .iter()
            .filter_map(|node| index.get(&(Arc::as_ptr(node) as *const ())))
            .map(|&i| Arc::clone(&self.weighted[i]))
            .collect()
    }
}

/// 默认选择器
///
/// `select` 只做一次原子读取，不会阻塞；`store` 是一次原子替换，
/// 替换前已经读到旧集合的调用继续使用旧集合完成。
pub struct Selector {
    generation: ArcSwapOption<Generation>,
    node_builder: WeightedNodeBuilder,
    balancer: Arc<dyn Balancer>,
}

impl Selector {
    pub fn new(node_builder: WeightedNodeBuilder, balancer: Arc<dyn Balancer>) -> Self {
        Self {
            generation: ArcSwapOption::empty(),
            node_builder,
            balancer,
        }
    }

    /// 整体替换节点集合
    ///
    /// 每个节点都包装成新的加权节点，统计不从旧集合继承。
    pub fn store(&self, nodes: Vec<Arc<dyn Node>>) {
        let weighted: Vec<Arc<WeightedNode>> = nodes
            .into_iter()
            .map(|node| self.node_builder.build(node))
            .collect();
        debug!(nodes = weighted.len(), "Publishing new node generation");
        self.generation.store(Some(Arc::new(Generation::new(weighted))));
    }

    /// 为一次出站调用选择节点
    ///
    /// 调用方必须在调用结束后用调用结果完成返回的 `DoneFunc`。
    pub fn select(
        &self,
        ctx: &Extensions,
        opts: &SelectOptions,
    ) -> Result<(Arc<dyn Node>, DoneFunc)> {
        let generation = self.generation.load_full().ok_or(SelectorError::NoAvailable)?;

        let filtered;
        let candidates: &[Arc<WeightedNode>] = if opts.node_filters.is_empty() {
            &generation.weighted
        } else {
            let mut view = generation.raw.clone();
            for filter in &opts.node_filters {
                view = filter(ctx, view);
            }
            filtered = generation.resolve(&view);
            &filtered
        };

        if candidates.is_empty() {
            return Err(SelectorError::NoAvailable);
        }

        let (chosen, done) = self.balancer.pick(ctx, candidates)?;
        let raw = Arc::clone(chosen.raw());
        if let Some(peer) = peer_from_context(ctx) {
            peer.set_node(Arc::clone(&raw));
        }
        Ok((raw, done))
    }

    /// 当前代的加权节点，未发布过节点集合时为空
    pub fn weighted_nodes(&self) -> Vec<Arc<WeightedNode>> {
        self.generation
            .load_full()
            .map(|generation| generation.weighted.clone())
            .unwrap_or_default()
    }

    /// 是否已经发布过节点集合
    pub fn is_populated(&self) -> bool {
        self.generation.load().is_some()
    }
}

impl Rebalancer for Selector {
    fn store(&self, nodes: Vec<Arc<dyn Node>>) {
        Selector::store(self, nodes);
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("nodes", &self.weighted_nodes())
            .finish()
    }
}
