use std::fmt;
use std::sync::Arc;
use url::Url;

/// Request priority (matches Chromium's RequestPriority).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RequestPriority {
    Throttled = 0,
    Idle = 1,
    Lowest = 2,
    Low = 3,
    #[default]
    Medium = 4,
    Highest = 5,
}

/// A request to warm up connections to an origin.
#[derive(Clone, PartialEq, Eq)]
pub struct PreconnectRequest {
    /// Target URL, already upgraded to `https` when HSTS requires it.
    pub url: Url,
    /// The top-level site, used for cookie partitioning.
    pub site_for_cookies: Url,
    /// Number of connections to open.
    pub count: u32,
    /// Whether the connections may carry credentials.
    pub allow_credentials: bool,
    /// Priority for the socket pool.
    pub priority: RequestPriority,
}

impl fmt::Debug for PreconnectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreconnectRequest")
            .field("url", &self.url.as_str())
            .field("site_for_cookies", &self.site_for_cookies.as_str())
            .field("count", &self.count)
            .field("allow_credentials", &self.allow_credentials)
            .field("priority", &self.priority)
            .finish()
    }
}

/// The connection-establishment service.
///
/// Fire-and-forget: implementations must not block, and the predictor never
/// learns whether the connections were opened.
pub trait Preconnect: Send + Sync {
    fn preconnect(&self, request: PreconnectRequest);
}

impl<P: Preconnect + ?Sized> Preconnect for Arc<P> {
    fn preconnect(&self, request: PreconnectRequest) {
        (**self).preconnect(request)
    }
}

/// Connection service that drops every request.
///
/// For embedders that only want DNS prefetching.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreconnect;

impl Preconnect for NoPreconnect {
    fn preconnect(&self, request: PreconnectRequest) {
        tracing::trace!(url = %request.url, "preconnect disabled, dropping request");
    }
}
