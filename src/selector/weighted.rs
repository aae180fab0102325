//! 带实时统计的加权节点
//!
//! 每个节点独立维护按时间衰减的延迟（EWMA）和成功率，不依赖任何全局协调：
//! - `pick` 只增加 in-flight 计数并记录开始时间
//! - 其余统计只在调用完成（`DoneFunc::done`）时更新
//! - `load` / `weight` 按需计算，不落地存储

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::classify::{DefaultClassifier, OutcomeClassifier};
use super::{DoneFunc, DoneInfo, Node};
use crate::config::NodeStatsConfig;
use crate::discovery::ServiceInstance;

/// 成功率上限，1000 表示完全健康
pub const SUCCESS_MAX: f64 = 1000.0;

const NANOS_PER_MILLI: f64 = 1_000_000.0;
const TIME_UNIT_NANOS: f64 = 1_000_000_000.0;
const NEVER: u64 = u64::MAX;

/// 以位模式存放在 `AtomicU64` 里的 `f64`
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

#[derive(Debug, Clone)]
struct StatsParams {
    tau_nanos: f64,
    penalty: f64,
    lag_cap_nanos: f64,
    zone_gap_nanos: f64,
    predict_min_nanos: u64,
    predict_max_nanos: u64,
}

impl From<&NodeStatsConfig> for StatsParams {
    fn from(config: &NodeStatsConfig) -> Self {
        let millis = |ms: u64| ms.saturating_mul(NANOS_PER_MILLI as u64);
        let penalty = config.penalty.max(2) as f64;
        Self {
            tau_nanos: (config.tau_ms.max(1) as f64) * NANOS_PER_MILLI,
            penalty,
            lag_cap_nanos: penalty / 2.0,
            zone_gap_nanos: config.zone_gap_ms as f64 * NANOS_PER_MILLI,
            predict_min_nanos: millis(config.predict_min_ms),
            predict_max_nanos: millis(config.predict_max_ms.max(config.predict_min_ms)),
        }
    }
}

/// 加权节点
///
/// 包装一个原始 [`Node`]，与所在的节点集合代际同生共死，不跨代复用统计。
pub struct WeightedNode {
    node: Arc<dyn Node>,
    params: StatsParams,
    classifier: Arc<dyn OutcomeClassifier>,
    epoch: Instant,

    // 以下时间均为相对 epoch 的纳秒数
    lag: AtomicF64,
    success: AtomicF64,
    inflight: AtomicI64,
    inflights: Mutex<BTreeMap<u64, u64>>,
    next_ticket: AtomicU64,
    stamp: AtomicU64,
    predict_ts: AtomicU64,
    predict: AtomicF64,
    reqs: AtomicU64,
    last_pick: AtomicU64,
    // 平滑加权轮询的当前权重，由负载均衡器在自己的锁内读写
    wrr_current: AtomicI64,
}

impl WeightedNode {
    fn new(
        node: Arc<dyn Node>,
        params: StatsParams,
        classifier: Arc<dyn OutcomeClassifier>,
    ) -> Self {
        Self {
            node,
            params,
            classifier,
            epoch: Instant::now(),
            lag: AtomicF64::new(0.0),
            success: AtomicF64::new(SUCCESS_MAX),
            inflight: AtomicI64::new(0),
            inflights: Mutex::new(BTreeMap::new()),
            next_ticket: AtomicU64::new(0),
            stamp: AtomicU64::new(0),
            predict_ts: AtomicU64::new(0),
            predict: AtomicF64::new(0.0),
            reqs: AtomicU64::new(0),
            last_pick: AtomicU64::new(NEVER),
            wrr_current: AtomicI64::new(0),
        }
    }

    fn now_nanos(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// 原始节点
    pub fn raw(&self) -> &Arc<dyn Node> {
        &self.node
    }

    /// 选中该节点：增加 in-flight 计数并返回完成回调
    pub fn pick(self: &Arc<Self>) -> DoneFunc {
        let now = self.now_nanos();
        self.last_pick.store(now, Ordering::Release);
        self.inflight.fetch_add(1, Ordering::AcqRel);
        self.reqs.fetch_add(1, Ordering::Relaxed);

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        self.inflights.lock().insert(ticket, now);

        let node = Arc::clone(self);
        DoneFunc::new(move |info| node.finish(ticket, info))
    }

    fn finish(&self, ticket: u64, info: DoneInfo) {
        let start = self.inflights.lock().remove(&ticket);
        self.inflight.fetch_sub(1, Ordering::AcqRel);

        let now = self.now_nanos();
        let stamp = self.stamp.swap(now, Ordering::AcqRel);
        let elapsed = now.saturating_sub(stamp) as f64;
        let mut w = (-elapsed / self.params.tau_nanos).exp();

        let sample_lag = start
            .map(|start| now.saturating_sub(start))
            .unwrap_or(0)
            .max(1) as f64;
        let old_lag = self.lag.load();
        if old_lag == 0.0 {
            w = 0.0;
        }
        self.lag.store(decay(old_lag, sample_lag, w));

        let sample_success = if self.classifier.is_failure(&info) {
            0.0
        } else {
            SUCCESS_MAX
        };
        let old_success = self.success.load();
        self.success.store(decay(old_success, sample_success, w));
    }

    /// 当前负载：有效延迟（纳秒）× in-flight 数
    ///
    /// 没有任何完成样本时按冷启动惩罚计算。有效延迟封顶在惩罚值的一半，
    /// 同样 in-flight 数下冷节点的负载总是严格高于有历史的节点。
    pub fn load(&self) -> f64 {
        let now = self.now_nanos();
        let avg_lag = self.lag.load();

        let last_predict = self.predict_ts.load(Ordering::Acquire);
        let interval = ((avg_lag / 5.0) as u64)
            .max(self.params.predict_min_nanos)
            .min(self.params.predict_max_nanos);
        if now.saturating_sub(last_predict) > interval
            && self
                .predict_ts
                .compare_exchange(last_predict, now, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
        {
            self.predict.store(self.predict_lag(now, avg_lag));
        }

        let inflight = self.inflight.load(Ordering::Acquire).max(0) as f64;
        if avg_lag == 0.0 {
            return self.params.penalty * inflight;
        }

        let lag = (avg_lag.max(self.predict.load()) + self.params.zone_gap_nanos)
            .min(self.params.lag_cap_nanos);
        lag * inflight
    }

    /// 超过平均延迟仍未完成的调用占多数时，用它们的平均耗时作为预测延迟
    fn predict_lag(&self, now: u64, avg_lag: f64) -> f64 {
        let inflights = self.inflights.lock();
        let mut total = 0.0;
        let mut count = 0usize;
        for &start in inflights.values() {
            let age = now.saturating_sub(start) as f64;
            if age > avg_lag {
                count += 1;
                total += age;
            }
        }
        if count > inflights.len() / 2 + 1 {
            total / count as f64
        } else {
            0.0
        }
    }

    /// 权重：成功率 × 时间单位 / 负载，越大越好
    pub fn weight(&self) -> f64 {
        self.success.load() * TIME_UNIT_NANOS / self.load().max(1.0)
    }

    /// 距离上一次被选中的时间，从未被选中时返回 `Duration::MAX`
    pub fn pick_elapsed(&self) -> Duration {
        let last = self.last_pick.load(Ordering::Acquire);
        if last == NEVER {
            return Duration::MAX;
        }
        Duration::from_nanos(self.now_nanos().saturating_sub(last))
    }

    /// 衰减后的平均延迟，没有历史时为零
    pub fn lag(&self) -> Duration {
        Duration::from_nanos(self.lag.load() as u64)
    }

    /// 衰减后的成功率，范围 `[0, 1000]`
    pub fn success_rate(&self) -> f64 {
        self.success.load()
    }

    pub fn inflight(&self) -> i64 {
        self.inflight.load(Ordering::Acquire)
    }

    pub(crate) fn wrr_current(&self) -> &AtomicI64 {
        &self.wrr_current
    }

    /// 累计被选中次数
    pub fn requests(&self) -> u64 {
        self.reqs.load(Ordering::Relaxed)
    }
}

fn decay(old: f64, sample: f64, w: f64) -> f64 {
    old + (sample - old) * (1.0 - w)
}

impl Node for WeightedNode {
    fn scheme(&self) -> &str {
        self.node.scheme()
    }

    fn address(&self) -> &str {
        self.node.address()
    }

    fn service_name(&self) -> &str {
        self.node.service_name()
    }

    fn initial_weight(&self) -> Option<i64> {
        self.node.initial_weight()
    }

    fn version(&self) -> &str {
        self.node.version()
    }

    fn metadata(&self) -> &HashMap<String, String> {
        self.node.metadata()
    }

    fn service_info(&self) -> Option<&ServiceInstance> {
        self.node.service_info()
    }
}

impl fmt::Debug for WeightedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeightedNode")
            .field("scheme", &self.node.scheme())
            .field("address", &self.node.address())
            .field("lag", &self.lag())
            .field("success", &self.success_rate())
            .field("inflight", &self.inflight())
            .finish()
    }
}

/// 加权节点构建器
#[derive(Clone)]
pub struct WeightedNodeBuilder {
    params: StatsParams,
    classifier: Arc<dyn OutcomeClassifier>,
}

impl WeightedNodeBuilder {
    pub fn new(config: &NodeStatsConfig) -> Self {
        Self {
            params: StatsParams::from(config),
            classifier: Arc::new(DefaultClassifier::new()),
        }
    }

    /// 替换调用结果分类器
    pub fn with_classifier(mut self, classifier: Arc<dyn OutcomeClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn build(&self, node: Arc<dyn Node>) -> Arc<WeightedNode> {
        Arc::new(WeightedNode::new(
            node,
            self.params.clone(),
            Arc::clone(&self.classifier),
        ))
    }
}

impl Default for WeightedNodeBuilder {
    fn default() -> Self {
        Self::new(&NodeStatsConfig::default())
    }
}
