//! # Header Relay
//!
//! Copies inbound headers onto the outbound request, dropping the ones that
//! describe a single hop (connection management, framing, proxy credentials).
//! `Host` is dropped too so the client sets it for the backend's authority.

use axum::http::{HeaderMap, HeaderName};

/// Headers never relayed to a backend, in lower case
pub const HOP_BY_HOP_HEADERS: [&str; 10] = [
    "host",
    "content-length",
    "transfer-encoding",
    "connection",
    "upgrade",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    // HeaderName is always stored lower-cased
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// Every header of `headers` except the hop-by-hop deny-list
///
/// Each value of a multi-valued header is kept, in its original order.
pub fn relay_headers(headers: &HeaderMap) -> HeaderMap {
    let mut relayed = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if !is_hop_by_hop(name) {
            relayed.append(name.clone(), value.clone());
        }
    }
    relayed
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    #[test]
    fn test_deny_list_is_removed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gateway:8080"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::TE, HeaderValue::from_static("trailers"));
        headers.insert(header::PROXY_AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        headers.insert("proxy-connection", HeaderValue::from_static("keep-alive"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let relayed = relay_headers(&headers);
        assert_eq!(relayed.len(), 2);
        assert_eq!(relayed[header::AUTHORIZATION], "Bearer t");
        assert_eq!(relayed[header::CONTENT_TYPE], "application/json");
        assert!(relayed.get(header::HOST).is_none());
    }

    #[test]
    fn test_multi_valued_headers_keep_order() {
        let mut headers = HeaderMap::new();
        headers.append("x-trace", HeaderValue::from_static("a"));
        headers.append("x-trace", HeaderValue::from_static("b"));
        headers.append("x-trace", HeaderValue::from_static("c"));

        let relayed = relay_headers(&headers);
        let values: Vec<_> = relayed.get_all("x-trace").iter().collect();
        assert_eq!(values, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_deny_list_is_case_insensitive() {
        let name = HeaderName::from_bytes(b"Transfer-Encoding").unwrap();
        assert!(is_hop_by_hop(&name));
        assert!(!is_hop_by_hop(&HeaderName::from_static("x-request-id")));
    }
}
