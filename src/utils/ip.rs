//! 客户端 IP 提取
//!
//! 限流按客户端 IP 计数。只有连接来自可信代理（或未配置时来自私有地址）才读取
//! X-Forwarded-For，公网直连使用 peer 地址。

use std::net::{IpAddr, SocketAddr};

use actix_web::http::header::HeaderMap;
use tracing::trace;

/// 私有地址或回环
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            // fc00::/7 ULA, fe80::/10 link-local
            v6.is_loopback() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
    }
}

/// 解析 `ip` 或 `ip:port`
fn parse_addr(value: &str) -> Option<IpAddr> {
    value
        .parse::<SocketAddr>()
        .map(|s| s.ip())
        .or_else(|_| value.parse::<IpAddr>())
        .ok()
}

/// 单个 IP 或 CIDR 是否包含 `ip`
fn proxy_matches(ip: &IpAddr, rule: &str) -> bool {
    let Some((network, prefix)) = rule.split_once('/') else {
        return rule.parse::<IpAddr>().is_ok_and(|p| p == *ip);
    };
    let (Ok(network), Ok(prefix)) = (network.parse::<IpAddr>(), prefix.parse::<u32>()) else {
        return false;
    };

    match (ip, network) {
        (IpAddr::V4(ip), IpAddr::V4(net)) if prefix <= 32 => {
            let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
            u32::from(*ip) & mask == u32::from(net) & mask
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) if prefix <= 128 => {
            let mask = u128::MAX.checked_shl(128 - prefix).unwrap_or(0);
            u128::from(*ip) & mask == u128::from(net) & mask
        }
        _ => false,
    }
}

pub fn is_trusted_proxy(peer: &str, trusted_proxies: &[String]) -> bool {
    let Some(ip) = parse_addr(peer) else {
        return false;
    };
    trusted_proxies.iter().any(|rule| proxy_matches(&ip, rule))
}

/// X-Forwarded-For 第一个地址，其次 X-Real-IP
pub fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
        })
}

/// 决定用于限流的客户端地址
pub fn resolve_client_ip(
    peer: Option<&str>,
    headers: &HeaderMap,
    trusted_proxies: &[String],
) -> Option<String> {
    let peer = peer?;

    let trust_forwarded = if trusted_proxies.is_empty() {
        parse_addr(peer).is_some_and(|ip| is_private_or_local(&ip))
    } else {
        is_trusted_proxy(peer, trusted_proxies)
    };

    if trust_forwarded && let Some(real_ip) = forwarded_ip(headers) {
        trace!("Client IP via proxy {}: {}", peer, real_ip);
        return Some(real_ip);
    }

    Some(
        parse_addr(peer)
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| peer.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    fn headers_with_xff(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-forwarded-for"),
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn test_private_detection() {
        assert!(is_private_or_local(&"10.0.0.1".parse().unwrap()));
        assert!(is_private_or_local(&"127.0.0.1".parse().unwrap()));
        assert!(is_private_or_local(&"fd00::1".parse().unwrap()));
        assert!(!is_private_or_local(&"8.8.8.8".parse().unwrap()));
        assert!(!is_private_or_local(&"2001:4860:4860::8888".parse().unwrap()));
    }

    #[test]
    fn test_trusted_proxy_rules() {
        let rules = vec!["192.168.1.0/24".to_string(), "10.0.0.1".to_string()];
        assert!(is_trusted_proxy("192.168.1.50:4431", &rules));
        assert!(is_trusted_proxy("10.0.0.1", &rules));
        assert!(!is_trusted_proxy("192.168.2.1", &rules));
        assert!(!is_trusted_proxy("garbage", &rules));
    }

    #[test]
    fn test_public_peer_ignores_forwarded_header() {
        let headers = headers_with_xff("1.2.3.4");
        assert_eq!(
            resolve_client_ip(Some("8.8.8.8:5000"), &headers, &[]).as_deref(),
            Some("8.8.8.8")
        );
    }

    #[test]
    fn test_private_peer_uses_forwarded_header() {
        let headers = headers_with_xff("1.2.3.4, 10.0.0.2");
        assert_eq!(
            resolve_client_ip(Some("127.0.0.1:5000"), &headers, &[]).as_deref(),
            Some("1.2.3.4")
        );
    }

    #[test]
    fn test_explicit_proxies_override_autodetect() {
        let headers = headers_with_xff("1.2.3.4");
        let proxies = vec!["10.0.0.9".to_string()];
        assert_eq!(
            resolve_client_ip(Some("127.0.0.1"), &headers, &proxies).as_deref(),
            Some("127.0.0.1")
        );
        assert_eq!(
            resolve_client_ip(Some("10.0.0.9"), &headers, &proxies).as_deref(),
            Some("1.2.3.4")
        );
    }
}
