//! 节点过滤器与选择参数

use std::fmt;
use std::sync::Arc;

use http::Extensions;

use super::Node;

/// 节点过滤器
///
/// 接收上一个过滤器的输出，返回保留下来的节点。过滤器必须是纯函数；
/// 返回列表中不属于输入的节点会被选择器丢弃。
pub type NodeFilter =
    Arc<dyn Fn(&Extensions, Vec<Arc<dyn Node>>) -> Vec<Arc<dyn Node>> + Send + Sync>;

/// 单次 `select` 的参数
#[derive(Clone, Default)]
pub struct SelectOptions {
    pub node_filters: Vec<NodeFilter>,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个过滤器，按添加顺序从左到右执行
    pub fn with_node_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Extensions, Vec<Arc<dyn Node>>) -> Vec<Arc<dyn Node>> + Send + Sync + 'static,
    {
        self.node_filters.push(Arc::new(filter));
        self
    }

    /// 追加多个过滤器
    pub fn with_node_filters(mut self, filters: impl IntoIterator<Item = NodeFilter>) -> Self {
        self.node_filters.extend(filters);
        self
    }
}

impl fmt::Debug for SelectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectOptions")
            .field("node_filters", &self.node_filters.len())
            .finish()
    }
}

/// 版本过滤器：只保留指定版本的节点
pub fn version_filter(version: impl Into<String>) -> NodeFilter {
    let version = version.into();
    Arc::new(move |_ctx: &Extensions, nodes: Vec<Arc<dyn Node>>| {
        nodes
            .into_iter()
            .filter(|node| node.version() == version)
            .collect()
    })
}

/// 元数据过滤器
///
/// `value` 为 `None` 时只检查键是否存在。
pub fn metadata_filter(key: impl Into<String>, value: Option<String>) -> NodeFilter {
    let key = key.into();
    Arc::new(move |_ctx: &Extensions, nodes: Vec<Arc<dyn Node>>| {
        nodes
            .into_iter()
            .filter(|node| match (&value, node.metadata().get(&key)) {
                (Some(expected), Some(actual)) => expected == actual,
                (None, Some(_)) => true,
                (_, None) => false,
            })
            .collect()
    })
}
