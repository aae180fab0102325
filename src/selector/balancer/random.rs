use std::sync::Arc;

use http::Extensions;
use rand::Rng;

use super::Balancer;
use crate::error::{Result, SelectorError};
use crate::selector::{DoneFunc, WeightedNode};

/// 随机负载均衡器
#[derive(Debug, Default)]
pub struct RandomBalancer;

impl RandomBalancer {
    pub fn new() -> Self {
        Self
    }
}

impl Balancer for RandomBalancer {
    fn pick(
        &self,
        _ctx: &Extensions,
        nodes: &[Arc<WeightedNode>],
    ) -> Result<(Arc<WeightedNode>, DoneFunc)> {
        if nodes.is_empty() {
            return Err(SelectorError::NoAvailable);
        }
        let index = rand::thread_rng().gen_range(0..nodes.len());
        let chosen = &nodes[index];
        let done = chosen.pick();
        Ok((Arc::clone(chosen), done))
    }
}
