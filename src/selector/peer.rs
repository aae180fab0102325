use std::sync::Arc;

use http::Extensions;
use parking_lot::Mutex;

use super::Node;

/// 对端信息槽位
///
/// 调用方把 `Peer` 放进请求扩展，`select` 成功后会写入被选中的节点，
/// 便于记录和追踪这次调用由哪个后端处理。
#[derive(Clone, Default)]
pub struct Peer {
    node: Arc<Mutex<Option<Arc<dyn Node>>>>,
}

impl Peer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 被选中的节点
    pub fn node(&self) -> Option<Arc<dyn Node>> {
        self.node.lock().clone()
    }

    pub(crate) fn set_node(&self, node: Arc<dyn Node>) {
        *self.node.lock() = Some(node);
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("node", &self.node().map(|n| n.address().to_string()))
            .finish()
    }
}

/// 在扩展中放入一个新的 `Peer` 并返回它的句柄
pub fn new_peer_context(ctx: &mut Extensions) -> Peer {
    let peer = Peer::new();
    ctx.insert(peer.clone());
    peer
}

/// 从扩展中取出 `Peer`
pub fn peer_from_context(ctx: &Extensions) -> Option<&Peer> {
    ctx.get::<Peer>()
}
