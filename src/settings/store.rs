//! Per-window settings cache with confirmed writes.
//!
//! [`SettingsStore::load`] reads every [`SettingKey`] independently: one
//! failing read falls back to that key's default and leaves the others alone.
//! [`SettingsStore::set`] only touches the cache after the backend has
//! confirmed the write.
//!
//! A write confirmed while [`load`](SettingsStore::load) still has that key's
//! read in flight wins: the read's answer predates the write and is dropped.
//!
//! The API key never enters the cache.  The store only remembers whether one
//! is stored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::{ApiKey, Backend, CommandError};

use super::keys::SettingKey;

/// Cached values plus a per-key count of confirmed writes.
#[derive(Default)]
struct Cache {
    values: HashMap<SettingKey, String>,
    writes: HashMap<SettingKey, u64>,
}

impl Cache {
    fn write_count(&self, key: SettingKey) -> u64 {
        self.writes.get(&key).copied().unwrap_or(0)
    }
}

/// Cached settings for one window.
pub struct SettingsStore {
    backend: Arc<dyn Backend>,
    cache: Mutex<Cache>,
    has_secret: AtomicBool,
    loaded: AtomicBool,
}

impl SettingsStore {
    /// Empty store: every key reads as its default until [`load`](Self::load).
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            cache: Mutex::new(Cache::default()),
            has_secret: AtomicBool::new(false),
            loaded: AtomicBool::new(false),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Populate the whole cache.  Never fails.
    pub async fn load(&self) {
        for key in SettingKey::ALL {
            let issued = self.cache().write_count(key);
            let value = match self.backend.get_setting(key.as_str()).await {
                Ok(Some(v)) if !v.is_empty() => v,
                Ok(_) => key.default_value().to_string(),
                Err(e) => {
                    log::warn!("settings: reading '{key}' failed ({e}); using default");
                    key.default_value().to_string()
                }
            };
            let mut cache = self.cache();
            if cache.write_count(key) != issued {
                log::debug!("settings: '{key}' written during load; keeping the confirmed value");
                continue;
            }
            cache.values.insert(key, value);
        }

        self.load_secret_presence().await;
        self.loaded.store(true, Ordering::Release);
        log::debug!("settings: loaded {} keys", SettingKey::ALL.len());
    }

    /// Ask the backend whether an API key is stored.  Absence is `false`, not
    /// an error; so is an unreachable backend.
    pub async fn load_secret_presence(&self) -> bool {
        let present = match self.backend.load_api_key().await {
            Ok(key) => !key.is_empty(),
            Err(CommandError::NotFound(_)) => false,
            Err(e) => {
                log::warn!("settings: cannot check for api key: {e}");
                false
            }
        };
        self.has_secret.store(present, Ordering::Release);
        present
    }

    /// Cached value, or the key's default when nothing was loaded.
    pub fn get(&self, key: SettingKey) -> String {
        self.cache()
            .values
            .get(&key)
            .cloned()
            .unwrap_or_else(|| key.default_value().to_string())
    }

    /// `true` only for the exact string `"true"`.
    pub fn get_bool(&self, key: SettingKey) -> bool {
        self.get(key) == "true"
    }

    pub fn has_secret(&self) -> bool {
        self.has_secret.load(Ordering::Acquire)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Persist `value` and, once confirmed, cache it.
    ///
    /// On rejection the cache keeps its previous value and the error is
    /// returned.
    pub async fn set(&self, key: SettingKey, value: impl Into<String>) -> Result<(), CommandError> {
        let value = value.into();
        self.backend.set_setting(key.as_str(), &value).await?;
        log::debug!("settings: '{key}' confirmed");
        let mut cache = self.cache();
        *cache.writes.entry(key).or_default() += 1;
        cache.values.insert(key, value);
        Ok(())
    }

    /// Flip a boolean key through a confirmed write; returns the new value.
    pub async fn toggle(&self, key: SettingKey) -> Result<bool, CommandError> {
        let next = !self.get_bool(key);
        self.set(key, next.to_string()).await?;
        Ok(next)
    }

    /// Store a new API key.  Presence flips to `true` only after confirmation.
    pub async fn save_secret(&self, value: &str) -> Result<(), CommandError> {
        let key = ApiKey::new(value);
        self.backend.save_api_key(&key).await?;
        self.has_secret.store(!key.is_empty(), Ordering::Release);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulatedBackend;
    use crate::events::EventEmitter;
    use std::time::Duration;

    fn backend() -> Arc<SimulatedBackend> {
        Arc::new(SimulatedBackend::new(EventEmitter::default()))
    }

    #[test]
    fn unloaded_store_reads_defaults() {
        let store = SettingsStore::new(backend());
        for key in SettingKey::ALL {
            assert_eq!(store.get(key), key.default_value());
        }
        assert!(!store.is_loaded());
        assert!(!store.has_secret());
    }

    #[tokio::test]
    async fn load_reads_every_key() {
        let be = backend();
        be.set_setting("language", "es").await.unwrap();
        be.set_setting("dark_mode", "true").await.unwrap();

        let store = SettingsStore::new(be);
        store.load().await;

        assert!(store.is_loaded());
        assert_eq!(store.get(SettingKey::TranscriptionLanguage), "es");
        assert!(store.get_bool(SettingKey::DarkMode));
        assert_eq!(store.get(SettingKey::SttModel), "whisper-large-v3");
    }

    #[tokio::test]
    async fn one_failing_read_only_defaults_that_key() {
        let be = backend();
        for key in SettingKey::ALL {
            be.set_setting(key.as_str(), &format!("custom-{key}"))
                .await
                .unwrap();
        }
        be.fail_reads_of("llm_model");

        let store = SettingsStore::new(be);
        store.load().await;

        for key in SettingKey::ALL {
            if key == SettingKey::LlmModel {
                assert_eq!(store.get(key), key.default_value());
            } else {
                assert_eq!(store.get(key), format!("custom-{key}"));
            }
        }
    }

    #[tokio::test]
    async fn empty_stored_value_counts_as_unset() {
        let be = backend();
        be.set_setting("hotkey", "").await.unwrap();
        let store = SettingsStore::new(be);
        store.load().await;
        assert_eq!(store.get(SettingKey::HotkeyBinding), "Ctrl+Shift+Space");
    }

    #[tokio::test]
    async fn confirmed_write_updates_cache_and_backend() {
        let be = backend();
        let store = SettingsStore::new(be.clone());

        store.set(SettingKey::UiLanguage, "pt").await.unwrap();
        assert_eq!(store.get(SettingKey::UiLanguage), "pt");
        assert_eq!(be.stored_setting("ui_language").as_deref(), Some("pt"));
    }

    #[tokio::test]
    async fn rejected_write_leaves_cache_unchanged() {
        let be = backend();
        let store = SettingsStore::new(be.clone());
        store.set(SettingKey::LlmModel, "mixtral").await.unwrap();

        be.reject_writes(true);
        let err = store.set(SettingKey::LlmModel, "gemma").await.unwrap_err();

        assert!(matches!(err, CommandError::Rejected { .. }));
        assert_eq!(store.get(SettingKey::LlmModel), "mixtral");
    }

    #[tokio::test]
    async fn last_applied_write_wins() {
        let store = SettingsStore::new(backend());
        let (a, b) = tokio::join!(
            store.set(SettingKey::HotkeyBinding, "F8"),
            store.set(SettingKey::HotkeyBinding, "F9"),
        );
        a.unwrap();
        b.unwrap();
        // The simulated backend confirms in call order.
        assert_eq!(store.get(SettingKey::HotkeyBinding), "F9");
    }

    #[tokio::test]
    async fn write_confirmed_during_load_is_not_reverted_by_the_read() {
        let be = backend();
        be.delay_reads_of("stt_model", Duration::from_millis(50));
        let store = SettingsStore::new(be.clone());

        let ((), written) = tokio::join!(store.load(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            store
                .set(SettingKey::SttModel, "whisper-large-v3-turbo")
                .await
        });
        written.unwrap();

        assert_eq!(store.get(SettingKey::SttModel), "whisper-large-v3-turbo");
        assert_eq!(
            be.stored_setting("stt_model").as_deref(),
            Some("whisper-large-v3-turbo")
        );
        // Keys nobody wrote still come from the load.
        assert_eq!(store.get(SettingKey::LlmModel), "llama-3.3-70b-versatile");
        assert!(store.is_loaded());
    }

    #[tokio::test]
    async fn reload_after_a_write_picks_up_the_stored_value() {
        let be = backend();
        let store = SettingsStore::new(be.clone());
        store.set(SettingKey::Autostart, "true").await.unwrap();

        store.load().await;
        assert!(store.get_bool(SettingKey::Autostart));
    }

    #[tokio::test]
    async fn toggle_flips_bool_key() {
        let store = SettingsStore::new(backend());
        assert!(store.toggle(SettingKey::RawMode).await.unwrap());
        assert!(store.get_bool(SettingKey::RawMode));
        assert!(!store.toggle(SettingKey::RawMode).await.unwrap());
    }

    #[tokio::test]
    async fn missing_secret_is_not_an_error() {
        let store = SettingsStore::new(backend());
        assert!(!store.load_secret_presence().await);
    }

    #[tokio::test]
    async fn save_secret_marks_presence_after_confirmation() {
        let be = backend();
        let store = SettingsStore::new(be.clone());

        be.reject_writes(true);
        assert!(store.save_secret("gsk_123").await.is_err());
        assert!(!store.has_secret());

        be.reject_writes(false);
        store.save_secret("gsk_123").await.unwrap();
        assert!(store.has_secret());
        assert!(store.load_secret_presence().await);
    }

    #[tokio::test]
    async fn unreachable_backend_still_yields_full_cache() {
        let be = backend();
        be.set_unreachable(true);
        let store = SettingsStore::new(be);
        store.load().await;
        assert!(store.is_loaded());
        assert_eq!(store.get(SettingKey::UiLanguage), "en");
        assert!(!store.has_secret());
    }
}
