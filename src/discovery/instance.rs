//! 服务实例定义

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

/// 元数据中声明权重的键
pub const WEIGHT_METADATA_KEY: &str = "weight";

/// 服务实例
///
/// 由服务发现层产出，一个实例可以同时暴露多个协议的端点。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ServiceInstance {
    /// 实例 ID（唯一标识）
    pub id: String,

    /// 服务名（如 "message-orchestrator"）
    pub name: String,

    /// 版本
    pub version: String,

    /// 元数据（用于过滤和路由）
    pub metadata: HashMap<String, String>,

    /// 端点列表，如 `grpc://10.0.0.1:9000`、`http://10.0.0.1:8000`
    pub endpoints: Vec<String>,
}

impl ServiceInstance {
    /// 创建新的服务实例
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// 设置版本
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 添加端点
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    /// 设置声明权重（写入元数据 `weight`）
    pub fn with_weight(self, weight: i64) -> Self {
        self.with_metadata(WEIGHT_METADATA_KEY, weight.to_string())
    }

    /// 解析声明权重，缺失或无法解析时返回 `None`
    pub fn declared_weight(&self) -> Option<i64> {
        self.metadata
            .get(WEIGHT_METADATA_KEY)
            .and_then(|v| v.trim().parse::<i64>().ok())
    }
}
