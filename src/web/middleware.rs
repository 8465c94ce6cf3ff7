use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::constants::{LOOPBACK_CLIENT_KEY, X_FORWARDED_FOR, X_REAL_IP};

/// Key the rate limiter counts a request against, taken from the proxy headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClientKey(pub(crate) String);

impl ClientKey {
    /// First `x-forwarded-for` entry, else `x-real-ip`, else the loopback placeholder.
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        if let Some(forwarded) = header(X_FORWARDED_FOR) {
            let first = forwarded.split(',').next().unwrap_or(forwarded).trim();
            if !first.is_empty() {
                return Self(first.to_string());
            }
        }
        if let Some(real_ip) = header(X_REAL_IP) {
            return Self(real_ip.to_string());
        }
        Self(LOOPBACK_CLIENT_KEY.to_string())
    }
}

impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let key = Self::from_headers(&parts.headers);
        async move { Ok(key) }
    }
}
