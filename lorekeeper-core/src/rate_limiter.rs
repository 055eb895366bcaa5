use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Jitter, Quota, RateLimiter as GovernorLimiter};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use task_local_extensions::Extensions;
use tokio::sync::{Mutex, RwLock};

type Bucket = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// §4.1 rate-limiter registry: one token bucket per provider name, created
/// lazily on first use. Generalizes the teacher's single-bucket
/// `RateLimiterMiddleware` into a registry keyed by provider, the way
/// `utils/api_clients.rs` hand-rolls one static client per provider but
/// collapsed into one owning type instead of N statics. Discogs carries a
/// second, independent dimension (§4.1's "1 req/s + 1000/day") via
/// `discogs_daily`, since governor's token buckets model a single
/// rate/burst pair and can't enforce a short per-second cap and a long
/// rolling-day cap at once without the day bucket's burst swallowing the
/// per-second one.
pub struct RateLimiterRegistry {
    buckets: RwLock<HashMap<String, Arc<Bucket>>>,
    capabilities: HashMap<String, Quota>,
    discogs_daily: DiscogsDailyLimiter,
}

impl RateLimiterRegistry {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            capabilities: default_capabilities(),
            discogs_daily: DiscogsDailyLimiter::new(),
        }
    }

    /// Blocks until a token is available for `provider`. Creation of the
    /// bucket itself is the only mutation the read-heavy registry needs.
    /// Discogs additionally waits on its rolling-24h counter first, so a
    /// day that's already spent its 1000 requests blocks rather than
    /// bursts through the per-second bucket.
    pub async fn wait(&self, provider: &str) {
        if provider == "discogs" {
            self.discogs_daily.wait().await;
        }
        let bucket = self.bucket_for(provider).await;
        let jitter = Jitter::new(Duration::from_millis(0), Duration::from_millis(50));
        bucket.until_ready_with_jitter(jitter).await;
    }

    async fn bucket_for(&self, provider: &str) -> Arc<Bucket> {
        if let Some(bucket) = self.buckets.read().await.get(provider) {
            return bucket.clone();
        }

        let mut buckets = self.buckets.write().await;
        buckets
            .entry(provider.to_string())
            .or_insert_with(|| {
                let quota = self
                    .capabilities
                    .get(provider)
                    .copied()
                    .unwrap_or_else(|| Quota::per_second(NonZeroU32::new(1).unwrap()));
                Arc::new(GovernorLimiter::direct(quota))
            })
            .clone()
    }

    pub fn middleware(self: &Arc<Self>, provider: &str) -> RegistryRateLimiterMiddleware {
        RegistryRateLimiterMiddleware {
            registry: self.clone(),
            provider: provider.to_string(),
        }
    }
}

impl Default for RateLimiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn default_capabilities() -> HashMap<String, Quota> {
    // Documented limits from §4.1: MusicBrainz 1/s, Fanart.tv 3/s, Last.fm
    // 5/s, Discogs 1/s (its 1000/day cap is enforced separately by
    // `DiscogsDailyLimiter`, not by this per-second bucket), AudioDB 2/s,
    // Wikidata 5/s, DuckDuckGo 1/s, Deezer 5/s.
    let mut m = HashMap::new();
    m.insert("musicbrainz".to_string(), Quota::per_second(NonZeroU32::new(1).unwrap()));
    m.insert("fanarttv".to_string(), Quota::per_second(NonZeroU32::new(3).unwrap()));
    m.insert("lastfm".to_string(), Quota::per_second(NonZeroU32::new(5).unwrap()));
    m.insert("discogs".to_string(), Quota::per_second(NonZeroU32::new(1).unwrap()));
    m.insert("audiodb".to_string(), Quota::per_second(NonZeroU32::new(2).unwrap()));
    m.insert("wikidata".to_string(), Quota::per_second(NonZeroU32::new(5).unwrap()));
    m.insert("duckduckgo".to_string(), Quota::per_second(NonZeroU32::new(1).unwrap()));
    m.insert("deezer".to_string(), Quota::per_second(NonZeroU32::new(5).unwrap()));
    m
}

const DISCOGS_DAILY_CAP: u32 = 1000;
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

struct DailyWindow {
    started_at: Instant,
    count: u32,
}

/// Hand-rolled rolling-window counter for Discogs' "1000/day" dimension,
/// grounded on the chorrosion Discogs client's own semaphore+min-interval
/// limiter for the same dimension — governor's token buckets don't model
/// a short per-second cap and a long per-day cap on the same bucket, so
/// this lives alongside the governor bucket rather than inside it.
struct DiscogsDailyLimiter {
    window: Mutex<DailyWindow>,
    capacity: u32,
    period: Duration,
}

impl DiscogsDailyLimiter {
    fn new() -> Self {
        Self::with_capacity_and_period(DISCOGS_DAILY_CAP, DAY)
    }

    fn with_capacity_and_period(capacity: u32, period: Duration) -> Self {
        Self {
            window: Mutex::new(DailyWindow { started_at: Instant::now(), count: 0 }),
            capacity,
            period,
        }
    }

    /// Blocks until a slot opens within the current window, resetting the
    /// window once it has fully elapsed.
    async fn wait(&self) {
        loop {
            let sleep_for = {
                let mut window = self.window.lock().await;
                let elapsed = window.started_at.elapsed();
                if elapsed >= self.period {
                    window.started_at = Instant::now();
                    window.count = 0;
                }
                if window.count < self.capacity {
                    window.count += 1;
                    None
                } else {
                    Some(self.period - elapsed)
                }
            };
            match sleep_for {
                None => return,
                Some(remaining) => tokio::time::sleep(remaining).await,
            }
        }
    }
}

/// A `reqwest_middleware::Middleware` that waits on the shared registry's
/// bucket for its provider before letting the request through, the way
/// `utils/rate_limiter.rs`'s `RateLimiterMiddleware` wraps a single bucket.
pub struct RegistryRateLimiterMiddleware {
    registry: Arc<RateLimiterRegistry>,
    provider: String,
}

#[async_trait::async_trait]
impl Middleware for RegistryRateLimiterMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        self.registry.wait(&self.provider).await;
        next.run(req, extensions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn bucket_is_created_lazily_and_reused() {
        let registry = RateLimiterRegistry::new();
        let start = Instant::now();
        registry.wait("musicbrainz").await;
        registry.wait("musicbrainz").await;
        // musicbrainz is 1/s; the second wait must have incurred delay.
        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test]
    async fn unknown_provider_gets_a_default_bucket() {
        let registry = RateLimiterRegistry::new();
        registry.wait("some-unlisted-provider").await;
    }

    #[tokio::test]
    async fn discogs_daily_limiter_blocks_once_capacity_is_spent() {
        let limiter = DiscogsDailyLimiter::with_capacity_and_period(2, Duration::from_millis(200));
        limiter.wait().await;
        limiter.wait().await;

        let start = Instant::now();
        limiter.wait().await;
        // The third wait exhausts the 2-slot window and must block until
        // the window resets.
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn discogs_daily_limiter_resets_after_the_period_elapses() {
        let limiter = DiscogsDailyLimiter::with_capacity_and_period(1, Duration::from_millis(50));
        limiter.wait().await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        let start = Instant::now();
        limiter.wait().await;
        // A fresh window grants immediately, no blocking.
        assert!(start.elapsed() < Duration::from_millis(30));
    }
}
