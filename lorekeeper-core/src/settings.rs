use crate::errors::CoreResult;
use crate::models::FieldPriority;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;

/// §4.4: secret bytes are opaque to the settings store's callers; encryption
/// is the store's own responsibility through this seam. A concrete cipher
/// is an external collaborator (§1) — only a no-op test cipher ships here.
pub trait SecretCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Vec<u8>;
    fn decrypt(&self, ciphertext: &[u8]) -> Vec<u8>;
}

pub struct NoOpCipher;

impl SecretCipher for NoOpCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        plaintext.to_vec()
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Vec<u8> {
        ciphertext.to_vec()
    }
}

/// §4.4 storage boundary: opaque row get/set/delete plus a transactional
/// pair so key rotation and test-status reset happen atomically. Shaped
/// against the teacher's separation of `Db` (storage) from its callers —
/// a concrete on-disk backend behind this trait is an external
/// collaborator's job (Non-goal: database migrations/CRUD storage).
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    async fn get_row(&self, key: &str) -> Option<Vec<u8>>;
    async fn set_row(&self, key: &str, value: Vec<u8>);
    async fn delete_row(&self, key: &str);

    /// Upserts the encrypted key value and clears the provider's persisted
    /// test-status row in one transaction, returning it to "untested".
    async fn set_key_and_clear_status(&self, key_row: &str, value: Vec<u8>, status_row: &str);
    /// Deletes both the key row and the status row in one transaction.
    async fn delete_key_and_status(&self, key_row: &str, status_row: &str);
}

/// In-process backend guarded by an async mutex over an in-memory map —
/// sufficient to satisfy every `SettingsBackend` contract and fully
/// unit-testable without a real database, per §4.4's ambient note.
#[derive(Default)]
pub struct InMemoryBackend {
    rows: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsBackend for InMemoryBackend {
    async fn get_row(&self, key: &str) -> Option<Vec<u8>> {
        self.rows.lock().await.get(key).cloned()
    }

    async fn set_row(&self, key: &str, value: Vec<u8>) {
        self.rows.lock().await.insert(key.to_string(), value);
    }

    async fn delete_row(&self, key: &str) {
        self.rows.lock().await.remove(key);
    }

    async fn set_key_and_clear_status(&self, key_row: &str, value: Vec<u8>, status_row: &str) {
        let mut rows = self.rows.lock().await;
        rows.insert(key_row.to_string(), value);
        rows.remove(status_row);
    }

    async fn delete_key_and_status(&self, key_row: &str, status_row: &str) {
        let mut rows = self.rows.lock().await;
        rows.remove(key_row);
        rows.remove(status_row);
    }
}

fn key_row(provider: &str) -> String {
    format!("api_key:{provider}")
}

fn status_row(provider: &str) -> String {
    format!("api_key_status:{provider}")
}

fn priority_row(field: &str) -> String {
    format!("priority:{field}")
}

/// §6 default field-priority table, appended on read for any built-in
/// provider not already present in a stored list — new providers become
/// visible without a manual reset.
fn builtin_priority(field: &str) -> Vec<&'static str> {
    match field {
        "biography" => vec!["musicbrainz", "lastfm", "audiodb", "discogs", "wikidata"],
        "genres" => vec!["musicbrainz", "lastfm", "audiodb", "discogs"],
        "styles" => vec!["audiodb", "discogs"],
        "moods" => vec!["audiodb"],
        "members" => vec!["musicbrainz", "wikidata"],
        "formed" => vec!["musicbrainz", "wikidata", "audiodb"],
        "thumb" => vec!["fanarttv", "audiodb", "deezer"],
        "fanart" => vec!["fanarttv", "audiodb"],
        "logo" => vec!["fanarttv", "audiodb"],
        "banner" => vec!["fanarttv", "audiodb"],
        _ => vec![],
    }
}

/// §4.4's provider-facing read surface, built on a `SettingsBackend` +
/// `SecretCipher`.
pub struct SettingsStore {
    backend: Box<dyn SettingsBackend>,
    cipher: Box<dyn SecretCipher>,
    available_providers: BTreeSet<String>,
}

impl SettingsStore {
    pub fn new(
        backend: Box<dyn SettingsBackend>,
        cipher: Box<dyn SecretCipher>,
        available_providers: BTreeSet<String>,
    ) -> Self {
        Self {
            backend,
            cipher,
            available_providers,
        }
    }

    pub async fn get_api_key(&self, provider: &str) -> String {
        match self.backend.get_row(&key_row(provider)).await {
            Some(ciphertext) => {
                String::from_utf8(self.cipher.decrypt(&ciphertext)).unwrap_or_default()
            }
            None => String::new(),
        }
    }

    pub async fn has_api_key(&self, provider: &str) -> bool {
        !self.get_api_key(provider).await.is_empty()
    }

    /// Upserts the key and resets the provider's persisted test status in
    /// one transaction.
    pub async fn set_api_key(&self, provider: &str, value: &str) {
        let ciphertext = self.cipher.encrypt(value.as_bytes());
        self.backend
            .set_key_and_clear_status(&key_row(provider), ciphertext, &status_row(provider))
            .await;
    }

    pub async fn delete_api_key(&self, provider: &str) {
        self.backend
            .delete_key_and_status(&key_row(provider), &status_row(provider))
            .await;
    }

    pub async fn get_priorities(&self) -> Vec<FieldPriority> {
        let fields = [
            "biography", "genres", "styles", "moods", "members", "formed", "thumb", "fanart",
            "logo", "banner",
        ];
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            out.push(self.get_priority(field).await);
        }
        out
    }

    async fn get_priority(&self, field: &str) -> FieldPriority {
        let defaults: Vec<String> = builtin_priority(field).into_iter().map(String::from).collect();

        let stored = self.backend.get_row(&priority_row(field)).await;
        let mut providers = match stored {
            Some(bytes) => serde_json::from_slice::<Vec<String>>(&bytes).unwrap_or_default(),
            None => return FieldPriority {
                field: field.to_string(),
                providers: defaults,
                disabled: BTreeSet::new(),
            },
        };

        for default in &defaults {
            if !providers.contains(default) {
                providers.push(default.clone());
            }
        }

        FieldPriority {
            field: field.to_string(),
            providers,
            disabled: BTreeSet::new(),
        }
    }

    pub async fn set_priority(&self, field: &str, providers: &[String]) -> CoreResult<()> {
        let bytes = serde_json::to_vec(providers)?;
        self.backend.set_row(&priority_row(field), bytes).await;
        Ok(())
    }

    pub fn available_provider_names(&self) -> &BTreeSet<String> {
        &self.available_providers
    }

    /// A web-search-style provider (no auth, e.g. DuckDuckGo) is enabled
    /// once it's in the available-provider set; an authenticated one also
    /// needs a configured key.
    pub async fn is_web_search_enabled(&self, provider: &str) -> bool {
        if !self.available_providers.contains(provider) {
            return false;
        }
        if provider == "duckduckgo" {
            return true;
        }
        self.has_api_key(provider).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SettingsStore {
        SettingsStore::new(
            Box::new(InMemoryBackend::new()),
            Box::new(NoOpCipher),
            ["musicbrainz".to_string(), "lastfm".to_string()]
                .into_iter()
                .collect(),
        )
    }

    #[tokio::test]
    async fn setting_a_key_clears_prior_test_status() {
        let backend = InMemoryBackend::new();
        backend.set_row("api_key_status:lastfm", b"ok".to_vec()).await;

        let store = SettingsStore::new(
            Box::new(backend),
            Box::new(NoOpCipher),
            BTreeSet::new(),
        );
        store.set_api_key("lastfm", "secret").await;
        assert_eq!(store.get_api_key("lastfm").await, "secret");
        assert!(store.backend.get_row("api_key_status:lastfm").await.is_none());
    }

    #[tokio::test]
    async fn deleting_a_key_removes_both_rows_in_one_call() {
        let store = store();
        store.set_api_key("musicbrainz", "x").await;
        store.delete_api_key("musicbrainz").await;
        assert_eq!(store.get_api_key("musicbrainz").await, "");
    }

    #[tokio::test]
    async fn unset_priority_field_returns_builtin_default() {
        let store = store();
        let priority = store.get_priority("biography").await;
        assert_eq!(priority.providers, vec!["musicbrainz", "lastfm", "audiodb", "discogs", "wikidata"]);
    }

    #[tokio::test]
    async fn stored_priority_list_gets_new_builtin_defaults_appended() {
        let store = store();
        store
            .set_priority("biography", &["discogs".to_string()])
            .await
            .unwrap();
        let priority = store.get_priority("biography").await;
        assert_eq!(priority.providers, vec!["discogs", "musicbrainz", "lastfm", "audiodb", "wikidata"]);
    }
}
