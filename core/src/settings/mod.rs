//! Settings access
//!
//! Settings live in an external key-value store that may be slow, may fail,
//! and may be edited by someone else at any time. Every pass therefore reads
//! them fresh through a [`SettingsReader`], which papers over failures with
//! the last record it managed to read.

mod store;

use std::future::Future;

use seen_types::Settings;
use thiserror::Error;

pub use store::{ConfyStore, MemoryStore};

/// Application name used for the on-disk configuration.
pub const APP_NAME: &str = "seen";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings store unavailable: {0}")]
    Unavailable(String),

    #[error("settings file error: {0}")]
    Confy(#[from] confy::ConfyError),

    #[error("settings task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Asynchronous persistence for [`Settings`].
pub trait SettingsStore: Send + Sync + 'static {
    fn load(&self) -> impl Future<Output = Result<Settings, SettingsError>> + Send;

    fn store(&self, settings: Settings) -> impl Future<Output = Result<(), SettingsError>> + Send;
}

/// Outcome of one fresh read.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsRead {
    pub settings: Settings,
    /// Set when the store failed and a fallback was used.
    pub fault: Option<String>,
}

/// Reads settings for each pass, falling back when the store misbehaves.
///
/// The fallback is the last successfully read record, or the defaults when
/// nothing has been read yet.
#[derive(Debug)]
pub struct SettingsReader<S> {
    store: S,
    last_good: Option<Settings>,
}

impl<S: SettingsStore> SettingsReader<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            last_good: None,
        }
    }

    pub fn last_good(&self) -> Option<Settings> {
        self.last_good
    }

    pub async fn read(&mut self) -> SettingsRead {
        match self.store.load().await {
            Ok(settings) => {
                let settings = settings.normalized();
                self.last_good = Some(settings);
                SettingsRead {
                    settings,
                    fault: None,
                }
            }
            Err(e) => {
                let settings = self.last_good.unwrap_or_default();
                tracing::warn!(error = %e, fallback = ?settings, "Settings read failed, using fallback");
                SettingsRead {
                    settings,
                    fault: Some(e.to_string()),
                }
            }
        }
    }

    /// Persist `settings`; the next [`SettingsReader::read`] reflects the result.
    pub async fn write(&self, settings: Settings) -> Result<(), SettingsError> {
        self.store.store(settings.normalized()).await
    }
}
