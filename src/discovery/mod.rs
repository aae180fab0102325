//! 服务发现边界
//!
//! 只定义选择器消费服务发现结果所需的最小接口：实例描述、端点解析、
//! Watcher 抽象，以及把成员快照写入选择器的 `Resolver`。具体的注册中心后端不在此处。

pub mod endpoint;
pub mod instance;
pub mod resolver;
pub mod watcher;

pub use endpoint::parse_endpoint;
pub use instance::{ServiceInstance, WEIGHT_METADATA_KEY};
pub use resolver::Resolver;
pub use watcher::{ChannelWatcher, Watcher};

use std::sync::Arc;

use tracing::warn;

use crate::selector::{Node, ServiceNode};

/// 把实例列表转换为节点集合
///
/// 端点无法解析或没有匹配协议的实例会被跳过并记录警告。
pub fn nodes_from_instances(scheme: &str, instances: &[ServiceInstance]) -> Vec<Arc<dyn Node>> {
    let mut nodes = Vec::with_capacity(instances.len());
    for instance in instances {
        match parse_endpoint(&instance.endpoints, scheme) {
            Ok(Some(address)) => {
                nodes.push(ServiceNode::new(scheme, address, Some(instance.clone())).into_node());
            }
            Ok(None) => {
                warn!(
                    instance = %instance.id,
                    scheme = %scheme,
                    "Instance has no endpoint for scheme, skipping"
                );
            }
            Err(e) => {
                warn!(instance = %instance.id, error = %e, "Failed to parse endpoint, skipping");
            }
        }
    }
    nodes
}
