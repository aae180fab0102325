//! 选择器构建器

use std::sync::Arc;

use parking_lot::RwLock;

use super::classify::OutcomeClassifier;
use super::{Selector, WeightedNodeBuilder};
use crate::config::SelectorConfig;

/// 选择器构建器
///
/// 每次 `build` 都创建新的负载均衡器，保证每个选择器拥有独立的探测令牌。
#[derive(Clone, Default)]
pub struct SelectorBuilder {
    config: SelectorConfig,
    classifier: Option<Arc<dyn OutcomeClassifier>>,
}

impl SelectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: SelectorConfig) -> Self {
        Self {
            config,
            classifier: None,
        }
    }

    pub fn config(mut self, config: SelectorConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置调用结果分类器
    pub fn classifier(mut self, classifier: Arc<dyn OutcomeClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn selector_config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn build(&self) -> Selector {
        let mut node_builder = WeightedNodeBuilder::new(&self.config.node);
        if let Some(classifier) = &self.classifier {
            node_builder = node_builder.with_classifier(Arc::clone(classifier));
        }
        let balancer = self.config.strategy.build(self.config.force_pick());
        Selector::new(node_builder, balancer)
    }
}

static GLOBAL_SELECTOR: RwLock<Option<SelectorBuilder>> = parking_lot::const_rwlock(None);

/// 设置进程级默认构建器
pub fn set_global_selector(builder: SelectorBuilder) {
    *GLOBAL_SELECTOR.write() = Some(builder);
}

/// 进程级默认构建器，未设置时返回 P2C 默认配置
pub fn global_selector() -> SelectorBuilder {
    GLOBAL_SELECTOR.read().clone().unwrap_or_default()
}
