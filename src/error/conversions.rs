//! 错误类型转换实现
//!
//! 提供各种错误类型之间的转换

use super::{CallError, SelectorError};
use std::io;
use tonic::Status;

impl From<io::Error> for SelectorError {
    fn from(err: io::Error) -> Self {
        SelectorError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for SelectorError {
    fn from(err: toml::de::Error) -> Self {
        SelectorError::Config(format!("TOML 解析错误: {}", err))
    }
}

impl From<SelectorError> for Status {
    fn from(err: SelectorError) -> Self {
        let message = err.to_string();
        match err {
            SelectorError::NoAvailable => Status::unavailable(message),
            SelectorError::InvalidEndpoint(_) => Status::invalid_argument(message),
            SelectorError::Discovery(_) | SelectorError::WatcherClosed => {
                Status::unavailable(message)
            }
            SelectorError::Config(_) | SelectorError::Io(_) => Status::internal(message),
        }
    }
}

impl From<CallError> for Status {
    fn from(err: CallError) -> Self {
        let message = err.to_string();
        if err.is_unavailable() {
            return Status::unavailable(message);
        }
        match err {
            CallError::DeadlineExceeded => Status::deadline_exceeded(message),
            CallError::Canceled => Status::cancelled(message),
            CallError::Status(_) => Status::unknown(message),
            CallError::Network(_) => Status::unavailable(message),
        }
    }
}
