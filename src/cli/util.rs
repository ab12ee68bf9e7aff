//! CLI Common Utilities
//!
//! Shared wiring for generation commands: configuration, credentials,
//! backend and studio.

use std::path::PathBuf;
use std::sync::Arc;

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ai::batch::ProgressCallback;
use crate::ai::credentials::{ConsoleKeySelector, EnvCredentials, KeySlot, SharedKeySelector};
use crate::ai::provider::create_backend;
use crate::cli::ui::output::Output;
use crate::config::{Config, ConfigLoader};
use crate::studio::MarketingStudio;
use crate::types::Result;

/// Command execution context
///
/// Created once per invocation; the studio shares `cancel` with the
/// Ctrl-C handler.
#[derive(Clone)]
pub struct CommandContext {
    /// Loaded configuration
    pub config: Config,
    /// Generator facade
    pub studio: MarketingStudio,
    /// Key selection flow (checked before the first call)
    pub selector: SharedKeySelector,
    /// Where generated media is written
    pub output_dir: PathBuf,
}

impl CommandContext {
    pub fn load(cancel: CancellationToken, output_dir: Option<PathBuf>) -> Result<Self> {
        let config = ConfigLoader::load()?;
        Self::from_config(config, cancel, output_dir)
    }

    pub fn from_config(
        config: Config,
        cancel: CancellationToken,
        output_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let env = EnvCredentials::new(config.ai.api_key_env.clone())
            .with_fallback(config.ai.api_key_fallback_env.clone());
        let slot = Arc::new(KeySlot::with_fallback(Arc::new(env)));

        if let Some(key) = config.ai.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            debug!("Using API key from configuration file");
            slot.select(SecretString::from(key.trim().to_string()));
        }

        let selector: SharedKeySelector = Arc::new(ConsoleKeySelector::new(Arc::clone(&slot)));
        let backend = create_backend(&config.ai.provider_config(), slot)?;

        let studio = MarketingStudio::from_config(&config, backend, Arc::clone(&selector))
            .with_cancel(cancel)
            .with_progress(progress_printer());

        let output_dir = output_dir.unwrap_or_else(|| config.output.dir.clone());

        Ok(Self {
            config,
            studio,
            selector,
            output_dir,
        })
    }
}

fn progress_printer() -> ProgressCallback {
    let output = Output::new();
    Arc::new(move |progress| output.progress(progress))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_uses_configured_output_dir() {
        let mut config = Config::default();
        config.output.dir = PathBuf::from("custom-out");
        config.ai.api_key = Some("from-config".to_string());

        let ctx = CommandContext::from_config(config, CancellationToken::new(), None).unwrap();
        assert_eq!(ctx.output_dir, PathBuf::from("custom-out"));

        let ctx = CommandContext::from_config(
            Config::default(),
            CancellationToken::new(),
            Some(PathBuf::from("override")),
        )
        .unwrap();
        assert_eq!(ctx.output_dir, PathBuf::from("override"));
    }

    #[test]
    fn test_context_rejects_unknown_provider() {
        let mut config = Config::default();
        config.ai.provider = "openai".to_string();
        assert!(CommandContext::from_config(config, CancellationToken::new(), None).is_err());
    }
}
