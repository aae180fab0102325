//! 日志初始化

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{Result, SelectorError};

/// 安装全局 tracing subscriber
///
/// `RUST_LOG` 存在时优先使用，否则使用配置中的级别。重复初始化返回 `Config` 错误。
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(&config.level);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| SelectorError::config(format!("failed to install logger: {}", e)))
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
