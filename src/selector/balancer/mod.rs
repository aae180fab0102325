//! 负载均衡模块
//!
//! 提供多种负载均衡策略，用于从候选节点中选择一个

pub mod p2c;
pub mod random;
pub mod wrr;

pub use p2c::P2cBalancer;
pub use random::RandomBalancer;
pub use wrr::WrrBalancer;

use std::sync::Arc;
use std::time::Duration;

use http::Extensions;
use serde::{Deserialize, Serialize};

use super::{DoneFunc, WeightedNode};
use crate::error::Result;

/// 负载均衡器
///
/// 候选列表为空时返回 `NoAvailable`；选中节点后必须调用其 `pick`，
/// 保证所有策略的 in-flight 统计口径一致。
pub trait Balancer: Send + Sync {
    fn pick(
        &self,
        ctx: &Extensions,
        nodes: &[Arc<WeightedNode>],
    ) -> Result<(Arc<WeightedNode>, DoneFunc)>;
}

/// 负载均衡策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalanceStrategy {
    /// 两次随机选择取优（Power of Two Choices）
    #[default]
    P2c,
    /// 随机
    Random,
    /// 平滑加权轮询
    #[serde(alias = "wrr")]
    WeightedRoundRobin,
}

impl LoadBalanceStrategy {
    /// 创建对应的负载均衡器，每次调用都得到独立的实例
    pub fn build(&self, force_pick: Duration) -> Arc<dyn Balancer> {
        match self {
            LoadBalanceStrategy::P2c => Arc::new(P2cBalancer::new(force_pick)),
            LoadBalanceStrategy::Random => Arc::new(RandomBalancer::new()),
            LoadBalanceStrategy::WeightedRoundRobin => Arc::new(WrrBalancer::new()),
        }
    }
}

impl std::str::FromStr for LoadBalanceStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "p2c" | "power_of_two" => Ok(LoadBalanceStrategy::P2c),
            "random" => Ok(LoadBalanceStrategy::Random),
            "wrr" | "weighted_round_robin" | "weightedroundrobin" => {
                Ok(LoadBalanceStrategy::WeightedRoundRobin)
            }
            _ => Err(format!("Unknown load balance strategy: {}", s)),
        }
    }
}
