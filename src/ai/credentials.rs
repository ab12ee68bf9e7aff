//! API Credentials and Key Selection
//!
//! The credential is read from its source at every call, never cached by the
//! backend, so a key swapped by the selection hook is used by the next attempt.
//!
//! - [`CredentialSource`]: where the current key comes from
//! - [`KeySelector`]: host hook to detect "no key chosen" and prompt for one

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::types::{CopyError, Result};

// =============================================================================
// Credential Sources
// =============================================================================

/// Provides the API key at call time
pub trait CredentialSource: Send + Sync {
    /// Current key, or `MissingCredential` when none is available
    fn api_key(&self) -> Result<SecretString>;
}

pub type SharedCredentials = Arc<dyn CredentialSource>;

/// Reads the key from environment variables on every call
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    vars: Vec<String>,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self {
            vars: vec![var.into()],
        }
    }

    /// Also try `var` when the earlier variables are unset
    pub fn with_fallback(mut self, var: impl Into<String>) -> Self {
        self.vars.push(var.into());
        self
    }
}

impl CredentialSource for EnvCredentials {
    fn api_key(&self) -> Result<SecretString> {
        self.vars
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| CopyError::MissingCredential(self.vars.join(" / ")))
    }
}

/// Replaceable in-memory key with an optional fallback source
pub struct KeySlot {
    selected: RwLock<Option<SecretString>>,
    fallback: Option<SharedCredentials>,
}

impl KeySlot {
    pub fn new() -> Self {
        Self {
            selected: RwLock::new(None),
            fallback: None,
        }
    }

    pub fn with_fallback(fallback: SharedCredentials) -> Self {
        Self {
            selected: RwLock::new(None),
            fallback: Some(fallback),
        }
    }

    /// Replace the selected key (takes effect on the next call)
    pub fn select(&self, key: SecretString) {
        *self
            .selected
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(key);
    }

    /// Forget the selected key, reverting to the fallback
    pub fn clear(&self) {
        *self
            .selected
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

impl Default for KeySlot {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KeySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let selected = self
            .selected
            .read()
            .map(|s| s.is_some())
            .unwrap_or(false);
        f.debug_struct("KeySlot")
            .field("selected", &selected.then_some("[REDACTED]"))
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

impl CredentialSource for KeySlot {
    fn api_key(&self) -> Result<SecretString> {
        let selected = self
            .selected
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        match (selected, &self.fallback) {
            (Some(key), _) => Ok(key),
            (None, Some(fallback)) => fallback.api_key(),
            (None, None) => Err(CopyError::MissingCredential(
                "no key selected".to_string(),
            )),
        }
    }
}

// =============================================================================
// Key Selection Hook
// =============================================================================

/// Host-provided key selection flow
#[async_trait]
pub trait KeySelector: Send + Sync {
    /// Whether a usable key is currently chosen
    async fn has_selected_key(&self) -> bool;

    /// Let the user pick a different key
    async fn open_select_key(&self) -> Result<()>;
}

pub type SharedKeySelector = Arc<dyn KeySelector>;

/// Selector for hosts without a selection flow
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopKeySelector;

#[async_trait]
impl KeySelector for NoopKeySelector {
    async fn has_selected_key(&self) -> bool {
        true
    }

    async fn open_select_key(&self) -> Result<()> {
        warn!("API key was rejected; no key selection flow available in this host");
        Ok(())
    }
}

/// Prompts on the terminal for a replacement key (input not echoed)
pub struct ConsoleKeySelector {
    slot: Arc<KeySlot>,
}

impl ConsoleKeySelector {
    pub fn new(slot: Arc<KeySlot>) -> Self {
        Self { slot }
    }
}

#[async_trait]
impl KeySelector for ConsoleKeySelector {
    async fn has_selected_key(&self) -> bool {
        self.slot.api_key().is_ok()
    }

    async fn open_select_key(&self) -> Result<()> {
        let entered = tokio::task::spawn_blocking(|| {
            let term = console::Term::stderr();
            term.write_line("Introduce una clave de API de Gemini (no se mostrará):")?;
            term.read_secure_line()
        })
        .await
        .map_err(|e| CopyError::Config(format!("Key prompt task failed: {}", e)))??;

        let entered = entered.trim();
        if entered.is_empty() {
            info!("Key selection skipped");
            return Ok(());
        }

        self.slot.select(SecretString::from(entered.to_string()));
        info!("New API key selected");
        Ok(())
    }
}

/// Navigation-time check: prompt for a key if none is chosen
///
/// Selection failures are logged, not raised; the caller proceeds and any
/// credential problem surfaces from the first real call.
pub async fn ensure_key_selected(selector: &dyn KeySelector) {
    if selector.has_selected_key().await {
        debug!("API key already selected");
        return;
    }

    if let Err(e) = selector.open_select_key().await {
        warn!(error = %e, "Failed to open key selection");
    }
}

/// Expose a key for a request header or query parameter
pub(crate) fn expose(key: &SecretString) -> &str {
    key.expose_secret()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_env_credentials_read_at_call_time() {
        let var = "COPYFORGE_TEST_KEY_READ_AT_CALL_TIME";
        let creds = EnvCredentials::new(var);

        // SAFETY: This test owns its uniquely named variable
        unsafe {
            std::env::remove_var(var);
        }
        assert!(matches!(
            creds.api_key(),
            Err(CopyError::MissingCredential(_))
        ));

        unsafe {
            std::env::set_var(var, "first");
        }
        assert_eq!(expose(&creds.api_key().unwrap()), "first");

        unsafe {
            std::env::set_var(var, "second");
        }
        assert_eq!(expose(&creds.api_key().unwrap()), "second");

        unsafe {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_env_fallback_skips_blank() {
        let primary = "COPYFORGE_TEST_KEY_PRIMARY_BLANK";
        let secondary = "COPYFORGE_TEST_KEY_SECONDARY";
        unsafe {
            std::env::set_var(primary, "  ");
            std::env::set_var(secondary, "backup");
        }
        let creds = EnvCredentials::new(primary).with_fallback(secondary);
        assert_eq!(expose(&creds.api_key().unwrap()), "backup");
        unsafe {
            std::env::remove_var(primary);
            std::env::remove_var(secondary);
        }
    }

    struct FixedKey(&'static str);

    impl CredentialSource for FixedKey {
        fn api_key(&self) -> Result<SecretString> {
            Ok(SecretString::from(self.0.to_string()))
        }
    }

    #[test]
    fn test_key_slot_selection_wins_over_fallback() {
        let slot = KeySlot::with_fallback(Arc::new(FixedKey("from-env")));
        assert_eq!(expose(&slot.api_key().unwrap()), "from-env");

        slot.select(SecretString::from("picked".to_string()));
        assert_eq!(expose(&slot.api_key().unwrap()), "picked");

        slot.clear();
        assert_eq!(expose(&slot.api_key().unwrap()), "from-env");
    }

    #[test]
    fn test_key_slot_debug_redacts() {
        let slot = KeySlot::new();
        slot.select(SecretString::from("super-secret".to_string()));
        let debug = format!("{:?}", slot);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    struct CountingSelector {
        has_key: bool,
        opened: AtomicU32,
    }

    #[async_trait]
    impl KeySelector for CountingSelector {
        async fn has_selected_key(&self) -> bool {
            self.has_key
        }

        async fn open_select_key(&self) -> Result<()> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_ensure_key_selected_prompts_only_when_missing() {
        let with_key = CountingSelector {
            has_key: true,
            opened: AtomicU32::new(0),
        };
        ensure_key_selected(&with_key).await;
        assert_eq!(with_key.opened.load(Ordering::SeqCst), 0);

        let without_key = CountingSelector {
            has_key: false,
            opened: AtomicU32::new(0),
        };
        ensure_key_selected(&without_key).await;
        assert_eq!(without_key.opened.load(Ordering::SeqCst), 1);
    }
}
