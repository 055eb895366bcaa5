pub mod bulk;
pub mod config;
pub mod errors;
pub mod events;
pub mod fixers;
pub mod fs;
pub mod http_client;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod rate_limiter;
pub mod rules;
pub mod settings;
pub mod watcher;

use crate::config::CoreConfig;
use crate::providers::audiodb::AudioDbProvider;
use crate::providers::deezer::DeezerProvider;
use crate::providers::discogs::DiscogsProvider;
use crate::providers::fanarttv::FanartTvProvider;
use crate::providers::lastfm::LastFmProvider;
use crate::providers::musicbrainz::MusicBrainzProvider;
use crate::providers::wikidata::WikidataProvider;
use crate::providers::{Provider, ProviderRegistry};
use crate::rate_limiter::RateLimiterRegistry;
use crate::settings::{InMemoryBackend, NoOpCipher, SettingsStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub use errors::{CoreError, CoreResult};

/// §10.1: a single `init_tracing()` entry point, the renamed-for-this-crate
/// counterpart of the teacher's `enable_default_tracing()`. Reads `LK_LOG`
/// first, falls back to `RUST_LOG`, and defaults to warn-with-info-for-
/// this-crate when neither is set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LK_LOG")
        .unwrap_or_else(|_| EnvFilter::from_default_env())
        .add_directive(LevelFilter::WARN.into())
        .add_directive("lorekeeper_core=info".parse().unwrap());

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default tracing subscriber failed");
}

/// Everything a caller needs to run one curation pass: the provider
/// registry (write-once, §4.2), the orchestrator built over it and the
/// settings store, and the settings store itself for priority/key
/// management. Built from a `CoreConfig` the way the teacher's `App::new`
/// builds `AppState` from `ServerOptions`.
pub struct Core {
    pub providers: Arc<ProviderRegistry>,
    pub settings: Arc<SettingsStore>,
    pub orchestrator: Arc<orchestrator::Orchestrator>,
    pub rate_limiters: Arc<RateLimiterRegistry>,
}

impl Core {
    pub fn new(config: &CoreConfig) -> Self {
        let rate_limiters = Arc::new(RateLimiterRegistry::new());

        let providers: Vec<Arc<dyn Provider>> = vec![
            Arc::new(MusicBrainzProvider::new(&rate_limiters)),
            Arc::new(LastFmProvider::new(&rate_limiters, config.lastfm_key.clone())),
            Arc::new(AudioDbProvider::new(&rate_limiters, config.audiodb_key.clone())),
            Arc::new(DiscogsProvider::new(&rate_limiters, config.discogs_token.clone())),
            Arc::new(WikidataProvider::new(&rate_limiters)),
            Arc::new(FanartTvProvider::new(&rate_limiters, config.fanarttv_key.clone())),
            Arc::new(DeezerProvider::new(&rate_limiters)),
        ];
        let available: BTreeSet<String> = providers.iter().map(|p| p.name().to_string()).collect();
        let provider_registry = Arc::new(ProviderRegistry::new(providers));

        let settings = Arc::new(SettingsStore::new(Box::new(InMemoryBackend::new()), Box::new(NoOpCipher), available));

        let orchestrator = Arc::new(orchestrator::Orchestrator::new(provider_registry.clone(), settings.clone()));

        Self {
            providers: provider_registry,
            settings,
            orchestrator,
            rate_limiters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_wires_every_builtin_provider() {
        let core = Core::new(&CoreConfig::default());
        let mut names = core.providers.names();
        names.sort();
        assert_eq!(
            names,
            vec!["audiodb", "deezer", "discogs", "fanarttv", "lastfm", "musicbrainz", "wikidata"]
        );
    }
}
