//! 选择器集成测试
//!
//! 覆盖节点集合发布、过滤、对端回填，以及 P2C 在健康/不健康节点之间的分配。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use flare_selector::error::CallError;
use flare_selector::selector::{
    DoneInfo, LoadBalanceStrategy, Node, SelectOptions, Selector, SelectorBuilder, ServiceNode,
    metadata_filter, new_peer_context, peer_from_context, version_filter,
};
use flare_selector::{SelectorConfig, SelectorError, ServiceInstance};
use http::Extensions;

fn node(address: &str) -> Arc<dyn Node> {
    ServiceNode::new("grpc", address, None).into_node()
}

fn node_with(address: &str, version: &str, region: &str) -> Arc<dyn Node> {
    let instance = ServiceInstance::new(address, "greeter")
        .with_version(version)
        .with_metadata("region", region)
        .with_endpoint(format!("grpc://{}", address));
    ServiceNode::new("grpc", address, Some(instance)).into_node()
}

fn p2c_selector() -> Selector {
    SelectorBuilder::new().build()
}

#[test]
fn test_select_before_store_fails() {
    let selector = p2c_selector();
    assert!(!selector.is_populated());

    let err = selector
        .select(&Extensions::new(), &SelectOptions::new())
        .unwrap_err();
    assert_eq!(err, SelectorError::NoAvailable);
}

#[test]
fn test_select_after_empty_store_fails() {
    let selector = p2c_selector();
    selector.store(Vec::new());
    assert!(selector.is_populated());

    let err = selector
        .select(&Extensions::new(), &SelectOptions::new())
        .unwrap_err();
    assert_eq!(err, SelectorError::NoAvailable);
}

#[test]
fn test_single_candidate_always_selected() {
    for strategy in [
        LoadBalanceStrategy::P2c,
        LoadBalanceStrategy::Random,
        LoadBalanceStrategy::WeightedRoundRobin,
    ] {
        let selector =
            SelectorBuilder::from_config(SelectorConfig::new().with_strategy(strategy)).build();
        selector.store(vec![node("10.0.0.1:9000")]);

        for _ in 0..100 {
            let (chosen, done) = selector
                .select(&Extensions::new(), &SelectOptions::new())
                .unwrap();
            assert_eq!(chosen.address(), "10.0.0.1:9000");
            done.done(DoneInfo::success());
        }
    }
}

#[test]
fn test_filters_removing_everything_fail() {
    let selector = p2c_selector();
    selector.store(vec![
        node_with("10.0.0.1:9000", "v1", "east"),
        node_with("10.0.0.2:9000", "v1", "west"),
    ]);

    let opts = SelectOptions::new().with_node_filter(|_, _| Vec::new());
    let err = selector.select(&Extensions::new(), &opts).unwrap_err();
    assert_eq!(err, SelectorError::NoAvailable);

    let opts = SelectOptions::new().with_node_filters([version_filter("v2")]);
    let err = selector.select(&Extensions::new(), &opts).unwrap_err();
    assert_eq!(err, SelectorError::NoAvailable);
}

#[test]
fn test_filters_apply_left_to_right() {
    let selector = p2c_selector();
    selector.store(vec![
        node_with("10.0.0.1:9000", "v1", "east"),
        node_with("10.0.0.2:9000", "v2", "east"),
        node_with("10.0.0.3:9000", "v2", "west"),
    ]);

    let opts = SelectOptions::new().with_node_filters([
        version_filter("v2"),
        metadata_filter("region", Some("east".to_string())),
    ]);

    for _ in 0..50 {
        let (chosen, done) = selector.select(&Extensions::new(), &opts).unwrap();
        assert_eq!(chosen.address(), "10.0.0.2:9000");
        done.done(DoneInfo::success());
    }

    let opts = SelectOptions::new().with_node_filters([metadata_filter("zone", None)]);
    assert_eq!(
        selector.select(&Extensions::new(), &opts).unwrap_err(),
        SelectorError::NoAvailable
    );
}

#[test]
fn test_filter_output_outside_generation_is_dropped() {
    let selector = p2c_selector();
    selector.store(vec![node("10.0.0.1:9000")]);

    // 过滤器返回一个不属于当前集合的节点
    let foreign = node("10.0.0.1:9000");
    let opts = SelectOptions::new().with_node_filter(move |_, _| vec![Arc::clone(&foreign)]);
    assert_eq!(
        selector.select(&Extensions::new(), &opts).unwrap_err(),
        SelectorError::NoAvailable
    );
}

#[test]
fn test_filter_receives_copy_of_live_set() {
    let selector = p2c_selector();
    selector.store(vec![node("10.0.0.1:9000"), node("10.0.0.2:9000")]);

    let opts = SelectOptions::new().with_node_filter(|_, mut nodes| {
        nodes.truncate(1);
        nodes
    });
    let (_, done) = selector.select(&Extensions::new(), &opts).unwrap();
    done.done(DoneInfo::success());

    assert_eq!(selector.weighted_nodes().len(), 2);
}

#[test]
fn test_filter_can_read_call_context() {
    #[derive(Clone)]
    struct Canary;

    let selector = p2c_selector();
    selector.store(vec![
        node_with("10.0.0.1:9000", "stable", "east"),
        node_with("10.0.0.2:9000", "canary", "east"),
    ]);

    let opts = SelectOptions::new().with_node_filter(|ctx: &Extensions, nodes| {
        let wanted = if ctx.get::<Canary>().is_some() {
            "canary"
        } else {
            "stable"
        };
        nodes.into_iter().filter(|n| n.version() == wanted).collect()
    });

    let mut ctx = Extensions::new();
    ctx.insert(Canary);
    let (chosen, done) = selector.select(&ctx, &opts).unwrap();
    assert_eq!(chosen.address(), "10.0.0.2:9000");
    done.done(DoneInfo::success());

    let (chosen, done) = selector.select(&Extensions::new(), &opts).unwrap();
    assert_eq!(chosen.address(), "10.0.0.1:9000");
    done.done(DoneInfo::success());
}

#[test]
fn test_peer_is_filled_with_chosen_node() {
    let selector = p2c_selector();
    selector.store(vec![node("10.0.0.1:9000"), node("10.0.0.2:9000")]);

    let mut ctx = Extensions::new();
    let peer = new_peer_context(&mut ctx);
    assert!(peer.node().is_none());

    let (chosen, done) = selector.select(&ctx, &SelectOptions::new()).unwrap();
    let recorded = peer.node().expect("peer should be filled");
    assert!(Arc::ptr_eq(&recorded, &chosen));
    assert!(peer_from_context(&ctx).is_some());
    done.done(DoneInfo::success());
}

#[test]
fn test_peer_untouched_on_failure() {
    let selector = p2c_selector();
    let mut ctx = Extensions::new();
    let peer = new_peer_context(&mut ctx);

    assert!(selector.select(&ctx, &SelectOptions::new()).is_err());
    assert!(peer.node().is_none());
}

#[test]
fn test_store_replaces_statistics() {
    let selector = p2c_selector();
    selector.store(vec![node("10.0.0.1:9000")]);

    let (_, done) = selector
        .select(&Extensions::new(), &SelectOptions::new())
        .unwrap();
    done.done(DoneInfo::from_error(CallError::DeadlineExceeded));
    assert_eq!(selector.weighted_nodes()[0].success_rate(), 0.0);

    // 相同地址重新发布，统计从头开始
    selector.store(vec![node("10.0.0.1:9000")]);
    let fresh = selector.weighted_nodes();
    assert_eq!(fresh[0].success_rate(), 1000.0);
    assert_eq!(fresh[0].requests(), 0);
}

#[test]
fn test_done_after_store_only_touches_old_generation() {
    let selector = p2c_selector();
    selector.store(vec![node("10.0.0.1:9000")]);
    let (_, done) = selector
        .select(&Extensions::new(), &SelectOptions::new())
        .unwrap();
    let old = selector.weighted_nodes();
    assert_eq!(old[0].inflight(), 1);

    selector.store(vec![node("10.0.0.1:9000")]);
    done.done(DoneInfo::success());

    assert_eq!(old[0].inflight(), 0);
    let current = selector.weighted_nodes();
    assert_eq!(current[0].inflight(), 0);
    assert_eq!(current[0].requests(), 0);
}

#[test]
fn test_concurrent_store_never_mixes_generations() {
    let selector = Arc::new(p2c_selector());
    let old: Vec<String> = (0..4).map(|i| format!("10.0.1.{}:9000", i)).collect();
    let new: Vec<String> = (0..4).map(|i| format!("10.0.2.{}:9000", i)).collect();
    selector.store(old.iter().map(|a| node(a)).collect());

    let stop = Arc::new(AtomicBool::new(false));
    let mut readers = Vec::new();
    for _ in 0..4 {
        let selector = Arc::clone(&selector);
        let stop = Arc::clone(&stop);
        readers.push(thread::spawn(move || {
            let mut seen = Vec::new();
            while !stop.load(Ordering::Relaxed) {
                let mut ctx = Extensions::new();
                let peer = new_peer_context(&mut ctx);
                let (chosen, done) = selector.select(&ctx, &SelectOptions::new()).unwrap();
                let recorded = peer.node().unwrap();
                assert!(Arc::ptr_eq(&recorded, &chosen));
                seen.push(chosen.address().to_string());
                done.done(DoneInfo::success());
            }
            seen
        }));
    }

    for round in 0..50 {
        let set = if round % 2 == 0 { &new } else { &old };
        selector.store(set.iter().map(|a| node(a)).collect());
        thread::sleep(Duration::from_millis(1));
    }
    selector.store(new.iter().map(|a| node(a)).collect());
    stop.store(true, Ordering::Relaxed);

    let known: HashSet<&String> = old.iter().chain(new.iter()).collect();
    for reader in readers {
        for address in reader.join().unwrap() {
            assert!(known.contains(&address), "unexpected node {}", address);
        }
    }

    // 最后一次发布之后只会看到新集合
    for _ in 0..100 {
        let (chosen, done) = selector
            .select(&Extensions::new(), &SelectOptions::new())
            .unwrap();
        assert!(new.contains(&chosen.address().to_string()));
        done.done(DoneInfo::success());
    }
    for wn in selector.weighted_nodes() {
        assert_eq!(wn.inflight(), 0);
    }
}

#[test]
fn test_healthy_tied_nodes_share_traffic() {
    let selector = p2c_selector();
    selector.store(vec![node("10.0.0.1:9000"), node("10.0.0.2:9000")]);

    let mut counts: HashMap<String, usize> = HashMap::new();
    for _ in 0..1000 {
        let (chosen, done) = selector
            .select(&Extensions::new(), &SelectOptions::new())
            .unwrap();
        *counts.entry(chosen.address().to_string()).or_default() += 1;
        done.done(DoneInfo::success());
    }

    let a = counts.get("10.0.0.1:9000").copied().unwrap_or(0);
    let b = counts.get("10.0.0.2:9000").copied().unwrap_or(0);
    assert_eq!(a + b, 1000);
    assert!(a > 300, "node a starved: {:?}", counts);
    assert!(b > 300, "node b starved: {:?}", counts);
}

#[test]
fn test_failing_slow_node_is_avoided() {
    let selector = p2c_selector();
    selector.store(vec![node("bad:9000"), node("good:9000")]);

    let mut late_bad = 0;
    for i in 0..60 {
        let (chosen, done) = selector
            .select(&Extensions::new(), &SelectOptions::new())
            .unwrap();
        if chosen.address() == "bad:9000" {
            thread::sleep(Duration::from_millis(50));
            done.done(DoneInfo::from_error(CallError::DeadlineExceeded));
            if i >= 10 {
                late_bad += 1;
            }
        } else {
            thread::sleep(Duration::from_millis(5));
            done.done(DoneInfo::success());
        }
    }

    let nodes = selector.weighted_nodes();
    let bad = nodes.iter().find(|n| n.address() == "bad:9000").unwrap();
    let good = nodes.iter().find(|n| n.address() == "good:9000").unwrap();
    assert!(bad.weight() < good.weight());
    assert!(bad.success_rate() < good.success_rate());
    // 测试总时长远小于探测阈值，坏节点不会再被选中
    assert!(late_bad <= 1, "bad node picked {} times late", late_bad);
}

fn weighted_node(address: &str, weight: i64) -> Arc<dyn Node> {
    let instance = ServiceInstance::new(address, "greeter").with_weight(weight);
    ServiceNode::new("grpc", address, Some(instance)).into_node()
}

fn wrr_sequence(selector: &Selector, n: usize) -> Vec<String> {
    (0..n)
        .map(|_| {
            let (chosen, done) = selector
                .select(&Extensions::new(), &SelectOptions::new())
                .unwrap();
            done.done(DoneInfo::success());
            chosen.address().to_string()
        })
        .collect()
}

#[test]
fn test_wrr_state_restarts_with_each_generation() {
    let selector = SelectorBuilder::from_config(
        SelectorConfig::new().with_strategy(LoadBalanceStrategy::WeightedRoundRobin),
    )
    .build();
    let full = || {
        vec![
            weighted_node("a:1", 5),
            weighted_node("b:1", 1),
            weighted_node("c:1", 1),
        ]
    };
    let expected = vec!["a:1", "a:1", "b:1", "a:1", "c:1", "a:1", "a:1"];

    selector.store(full());
    assert_eq!(wrr_sequence(&selector, 3), expected[..3].to_vec());

    // 旧节点全部下线，只剩一个新节点
    selector.store(vec![weighted_node("d:1", 3)]);
    assert_eq!(wrr_sequence(&selector, 4), vec!["d:1"; 4]);

    // 旧地址重新上线，轮询从头开始，不沿用上一代的当前权重
    selector.store(full());
    assert_eq!(wrr_sequence(&selector, 7), expected);
}
