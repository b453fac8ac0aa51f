use std::fmt::Debug;
use std::net::IpAddr;

use http::Request;
use http::header::USER_AGENT;
use tally_stats::MetricKind;

/// Key recorded when a request carries nothing usable.
pub const UNKNOWN: &str = "Unknown";

/// Client address as seen by a trusted edge proxy (Cloudflare).
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Transport-level peer address of a request.
///
/// Servers (or a small layer in front of the tracker) insert this into the request
/// extensions. With the `axum` feature, axum's `ConnectInfo<SocketAddr>` is also read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(pub IpAddr);

/// Pulls the tracking key out of a request, and names the bucket it is counted in.
pub trait KeyExtractor: Debug + Send + Sync + 'static {
    /// Which family of buckets the key is counted in.
    const KIND: MetricKind;

    /// Prefixes error log lines.
    const COMPONENT: &'static str;

    fn extract<B>(&self, request: &Request<B>) -> String;
}

/// Tracks the client IP address.
///
/// Sources are tried in order, first match wins:
/// 1. `CF-Connecting-IP`, trimmed, if not empty.
/// 2. The first entry of `X-Forwarded-For`, trimmed, if not empty.
/// 3. The transport remote address.
/// 4. [`UNKNOWN`].
///
/// Edge-injected headers are trusted over client supplied forwarding chains, and
/// forwarding chains list the original client first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIp;

impl KeyExtractor for ClientIp {
    const KIND: MetricKind = MetricKind::Ip;
    const COMPONENT: &'static str = "IpTracker";

    fn extract<B>(&self, request: &Request<B>) -> String {
        let headers = request.headers();

        if let Some(ip) = headers
            .get(CF_CONNECTING_IP)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return ip.to_string();
        }

        if let Some(ip) = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return ip.to_string();
        }

        remote_addr(request).unwrap_or_else(|| UNKNOWN.to_string())
    }
}

fn remote_addr<B>(request: &Request<B>) -> Option<String> {
    if let Some(RemoteAddr(ip)) = request.extensions().get::<RemoteAddr>() {
        return Some(ip.to_string());
    }

    #[cfg(feature = "axum")]
    if let Some(axum::extract::ConnectInfo(addr)) = request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
    {
        return Some(addr.ip().to_string());
    }

    None
}

/// Tracks the raw `User-Agent` header.
///
/// The value is recorded verbatim, without trimming or truncation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserAgent;

impl KeyExtractor for UserAgent {
    const KIND: MetricKind = MetricKind::UserAgent;
    const COMPONENT: &'static str = "UserAgentTracker";

    fn extract<B>(&self, request: &Request<B>) -> String {
        request
            .headers()
            .get(USER_AGENT)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}
