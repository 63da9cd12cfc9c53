//! Per-request context attached by the correlation layer.

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Request};
use bastion_audit_types::UNKNOWN;
use chrono::Utc;
use std::fmt;
use std::net::SocketAddr;
use uuid::Uuid;

/// Opaque identifier tying every log line of one request together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// `corr-<unix millis>-<9 random hex chars>`.
    pub fn generate() -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("corr-{}-{}", Utc::now().timestamp_millis(), &random[..9]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub source_address: String,
    pub user_agent: String,
}

impl ClientInfo {
    /// Read the client info the correlation layer attached, or derive it
    /// from the request if the layer did not run.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        if let Some(info) = req.extensions().get::<ClientInfo>() {
            return info.clone();
        }
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Self::from_headers(req.headers(), peer)
    }

    /// First hop of `x-forwarded-for`, then `x-real-ip`, then the peer.
    pub fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let source_address = headers
            .get("x-forwarded-for")
            .or_else(|| headers.get("x-real-ip"))
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| UNKNOWN.to_string());

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| UNKNOWN.to_string());

        Self {
            source_address,
            user_agent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_correlation_id_format() {
        let id = CorrelationId::generate();
        let parts: Vec<_> = id.as_str().splitn(3, '-').collect();
        assert_eq!(parts[0], "corr");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert_ne!(id, CorrelationId::generate());
    }

    #[test]
    fn test_forwarded_for_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));

        let info = ClientInfo::from_headers(&headers, Some("127.0.0.1:5000".parse().unwrap()));
        assert_eq!(info.source_address, "203.0.113.7");
        assert_eq!(info.user_agent, "curl/8.0");
    }

    #[test]
    fn test_falls_back_to_peer_then_unknown() {
        let headers = HeaderMap::new();
        let info = ClientInfo::from_headers(&headers, Some("192.0.2.1:443".parse().unwrap()));
        assert_eq!(info.source_address, "192.0.2.1");
        assert_eq!(info.user_agent, UNKNOWN);

        let info = ClientInfo::from_headers(&headers, None);
        assert_eq!(info.source_address, UNKNOWN);
    }

    #[test]
    fn test_attached_info_is_reused() {
        let attached = ClientInfo {
            source_address: "198.51.100.4".into(),
            user_agent: "bastion-test".into(),
        };
        let mut req = Request::new(());
        req.extensions_mut().insert(attached.clone());
        assert_eq!(ClientInfo::from_request(&req), attached);
    }
}
