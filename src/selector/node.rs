//! 节点定义

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::discovery::ServiceInstance;

static EMPTY_METADATA: LazyLock<HashMap<String, String>> = LazyLock::new(HashMap::new);

/// 后端节点
///
/// 由服务发现层构造，构造后不可变。`scheme + address` 相同即视为同一个端点。
pub trait Node: Send + Sync {
    /// 协议（如 `grpc`、`http`）
    fn scheme(&self) -> &str;

    /// 地址（`host:port`）
    fn address(&self) -> &str;

    /// 服务名
    fn service_name(&self) -> &str;

    /// 服务发布方声明的权重；`None` 表示只使用计算权重
    fn initial_weight(&self) -> Option<i64>;

    /// 版本
    fn version(&self) -> &str;

    /// 元数据
    fn metadata(&self) -> &HashMap<String, String>;

    /// 原始服务实例，选择器本身从不解读
    fn service_info(&self) -> Option<&ServiceInstance>;
}

/// 判断两个节点是否为同一个端点
pub fn same_endpoint(a: &dyn Node, b: &dyn Node) -> bool {
    a.scheme() == b.scheme() && a.address() == b.address()
}

impl fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("scheme", &self.scheme())
            .field("address", &self.address())
            .field("version", &self.version())
            .finish()
    }
}

/// 默认节点实现
#[derive(Debug, Clone)]
pub struct ServiceNode {
    scheme: String,
    address: String,
    weight: Option<i64>,
    instance: Option<ServiceInstance>,
}

impl ServiceNode {
    /// 创建节点，声明权重取自实例元数据 `weight`
    pub fn new(
        scheme: impl Into<String>,
        address: impl Into<String>,
        instance: Option<ServiceInstance>,
    ) -> Self {
        let weight = instance.as_ref().and_then(|ins| ins.declared_weight());
        Self {
            scheme: scheme.into(),
            address: address.into(),
            weight,
            instance,
        }
    }

    /// 转换为共享节点
    pub fn into_node(self) -> Arc<dyn Node> {
        Arc::new(self)
    }
}

impl Node for ServiceNode {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn service_name(&self) -> &str {
        self.instance.as_ref().map(|ins| ins.name.as_str()).unwrap_or("")
    }

    fn initial_weight(&self) -> Option<i64> {
        self.weight
    }

    fn version(&self) -> &str {
        self.instance.as_ref().map(|ins| ins.version.as_str()).unwrap_or("")
    }

    fn metadata(&self) -> &HashMap<String, String> {
        self.instance
            .as_ref()
            .map(|ins| &ins.metadata)
            .unwrap_or(&EMPTY_METADATA)
    }

    fn service_info(&self) -> Option<&ServiceInstance> {
        self.instance.as_ref()
    }
}
