//! 端点解析

use http::Uri;

use crate::error::{Result, SelectorError};

/// 从端点列表中取出第一个协议匹配的地址（`host:port`）
///
/// 没有匹配的协议时返回 `Ok(None)`；任一端点无法解析时返回 `InvalidEndpoint`。
pub fn parse_endpoint(endpoints: &[String], scheme: &str) -> Result<Option<String>> {
    for endpoint in endpoints {
        let uri: Uri = endpoint
            .parse()
            .map_err(|e| SelectorError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

        let Some(uri_scheme) = uri.scheme_str() else {
            return Err(SelectorError::InvalidEndpoint(format!(
                "{}: missing scheme",
                endpoint
            )));
        };

        if uri_scheme.eq_ignore_ascii_case(scheme) {
            return match uri.authority() {
                Some(authority) => Ok(Some(authority.to_string())),
                None => Err(SelectorError::InvalidEndpoint(format!(
                    "{}: missing authority",
                    endpoint
                ))),
            };
        }
    }
    Ok(None)
}
