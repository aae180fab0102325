use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;
use crate::selector::LoadBalanceStrategy;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub selector: SelectorConfig,
    pub resolver: ResolverConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.selector.node.validate()?;
        Ok(config)
    }
}

/// 选择器配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// 负载均衡策略
    pub strategy: LoadBalanceStrategy,
    /// 强制探测阈值（毫秒）：落选节点超过该时间未被选中时强制选中一次
    pub force_pick_ms: u64,
    /// 节点统计参数
    pub node: NodeStatsConfig,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            strategy: LoadBalanceStrategy::default(),
            force_pick_ms: 3_000,
            node: NodeStatsConfig::default(),
        }
    }
}

impl SelectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: LoadBalanceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_force_pick(mut self, force_pick: Duration) -> Self {
        self.force_pick_ms = force_pick.as_millis() as u64;
        self
    }

    pub fn with_node(mut self, node: NodeStatsConfig) -> Self {
        self.node = node;
        self
    }

    pub fn force_pick(&self) -> Duration {
        Duration::from_millis(self.force_pick_ms)
    }
}

/// 默认冷启动惩罚，取 TOML 整数能表示的最大值（约 292 年）
pub const DEFAULT_PENALTY: u64 = i64::MAX as u64;

/// 节点统计参数
///
/// 预测间隔取 `lag / 5`，并限制在 `[predict_min_ms, predict_max_ms]` 之间。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeStatsConfig {
    /// 衰减时间常数（毫秒），经过 `tau * ln2` 旧样本权重减半
    pub tau_ms: u64,
    /// 冷启动惩罚（纳秒）：无历史数据时每个 in-flight 调用计入的负载。
    /// 有历史节点的有效延迟封顶在它的一半
    pub penalty: u64,
    /// 叠加在延迟上的固定值（毫秒），抹平不同可用区之间的延迟差
    pub zone_gap_ms: u64,
    /// 预测延迟最短刷新间隔（毫秒）
    pub predict_min_ms: u64,
    /// 预测延迟最长刷新间隔（毫秒）
    pub predict_max_ms: u64,
}

impl Default for NodeStatsConfig {
    fn default() -> Self {
        Self {
            tau_ms: 600,
            penalty: DEFAULT_PENALTY,
            zone_gap_ms: 5,
            predict_min_ms: 5,
            predict_max_ms: 200,
        }
    }
}

impl NodeStatsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tau(mut self, tau: Duration) -> Self {
        self.tau_ms = tau.as_millis() as u64;
        self
    }

    pub fn with_penalty(mut self, penalty: u64) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_predict_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.predict_min_ms = min.as_millis() as u64;
        self.predict_max_ms = max.as_millis() as u64;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.tau_ms == 0 {
            return Err(crate::error::SelectorError::config("node.tau_ms must be positive"));
        }
        if self.penalty <= self.zone_gap_ms.saturating_mul(2_000_000) {
            return Err(crate::error::SelectorError::config(
                "node.penalty must exceed twice node.zone_gap_ms in nanoseconds",
            ));
        }
        if self.predict_min_ms > self.predict_max_ms {
            return Err(crate::error::SelectorError::config(
                "node.predict_min_ms must not exceed node.predict_max_ms",
            ));
        }
        Ok(())
    }
}

/// 服务发现解析配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// 使用的端点协议
    pub scheme: String,
    /// 启动时是否阻塞等待第一次成功更新
    pub block: bool,
    /// 阻塞等待的超时时间（毫秒）
    pub timeout_ms: u64,
    /// Watcher 出错后的重试间隔（毫秒）
    pub retry_delay_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            block: false,
            timeout_ms: 10_000,
            retry_delay_ms: 1_000,
        }
    }
}

fn default_scheme() -> String {
    "grpc".to_string()
}

impl ResolverConfig {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            ..Default::default()
        }
    }

    pub fn with_block(mut self, block: bool) -> Self {
        self.block = block;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 默认日志级别，`RUST_LOG` 优先
    pub level: String,
    /// 是否输出 JSON
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
