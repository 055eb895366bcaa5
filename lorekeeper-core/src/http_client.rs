use crate::rate_limiter::RateLimiterRegistry;
use http_cache_reqwest::{Cache, CacheMode, HttpCache, MokaManager};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use std::sync::Arc;
use std::time::Duration;

pub const USER_AGENT: &str = const_format::formatcp!("lorekeeper/{}", env!("CARGO_PKG_VERSION"));

/// Per-adapter GET timeout per §5: 10s for adapter GETs.
pub const ADAPTER_TIMEOUT: Duration = Duration::from_secs(10);
/// §5: 15s for Wikidata SPARQL / DuckDuckGo.
pub const SPARQL_TIMEOUT: Duration = Duration::from_secs(15);

fn base_client(timeout: Duration) -> reqwest::Client {
    let mut headers = HeaderMap::new();
    headers.insert("User-Agent", HeaderValue::from_static(USER_AGENT));

    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .default_headers(headers)
        .build()
        .expect("failed to build base reqwest client")
}

fn default_cache_middleware() -> Cache<std::sync::Arc<MokaManager>> {
    Cache(HttpCache {
        mode: CacheMode::ForceCache,
        manager: std::sync::Arc::new(MokaManager::default()),
        options: None,
    })
}

/// Builds a provider's HTTP client: retry + response cache + the shared
/// rate-limiter bucket for `provider_name`, mirroring the layering in
/// `utils/api_clients.rs`'s per-provider statics, generalized over one
/// registry instead of N hand-written `OnceCell`s.
pub fn build_client(
    provider_name: &str,
    registry: &Arc<RateLimiterRegistry>,
    timeout: Duration,
) -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder()
        .retry_bounds(Duration::from_secs(1), Duration::from_secs(30))
        .build_with_max_retries(3);

    ClientBuilder::new(base_client(timeout))
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .with(default_cache_middleware())
        .with(registry.middleware(provider_name))
        .build()
}
