use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use seen_types::Settings;
use tokio::sync::RwLock;

use super::{APP_NAME, SettingsError, SettingsStore};

// ─────────────────────────────────────────────────────────────────────────────
// On-disk store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    /// Platform config directory, optionally under a named profile.
    App { profile: Option<String> },
    /// Explicit TOML file.
    File(PathBuf),
}

/// TOML settings file managed by `confy`.
///
/// A missing file is created with the defaults on first load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfyStore {
    location: Location,
}

impl ConfyStore {
    /// The per-user configuration, `profile` selecting an alternate file.
    pub fn app(profile: Option<String>) -> Self {
        Self {
            location: Location::App { profile },
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
        }
    }

    /// Where the settings file lives, resolving the platform directory.
    pub fn path(&self) -> Result<PathBuf, SettingsError> {
        match &self.location {
            Location::App { profile } => Ok(confy::get_configuration_file_path(
                APP_NAME,
                profile.as_deref(),
            )?),
            Location::File(path) => Ok(path.clone()),
        }
    }
}

impl SettingsStore for ConfyStore {
    async fn load(&self) -> Result<Settings, SettingsError> {
        let location = self.location.clone();
        let settings = tokio::task::spawn_blocking(move || match location {
            Location::App { profile } => confy::load::<Settings>(APP_NAME, profile.as_deref()),
            Location::File(path) => confy::load_path::<Settings>(path),
        })
        .await??;
        Ok(settings)
    }

    async fn store(&self, settings: Settings) -> Result<(), SettingsError> {
        let location = self.location.clone();
        tokio::task::spawn_blocking(move || match location {
            Location::App { profile } => confy::store(APP_NAME, profile.as_deref(), settings),
            Location::File(path) => confy::store_path(path, settings),
        })
        .await??;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Shared {
    settings: RwLock<Settings>,
    failing: AtomicBool,
    read_only: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

/// Process-local store, cloneable so a test or REPL can edit it behind the
/// watcher's back. Can be switched into a failing mode.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings: RwLock::new(settings),
                ..Shared::default()
            }),
        }
    }

    /// Make every subsequent load and store fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.shared.failing.store(failing, Ordering::SeqCst);
    }

    /// Make stores fail while loads keep working.
    pub fn set_read_only(&self, read_only: bool) {
        self.shared.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Overwrite the record directly, bypassing the failure switch.
    pub async fn replace(&self, settings: Settings) {
        *self.shared.settings.write().await = settings;
    }

    pub async fn current(&self) -> Settings {
        *self.shared.settings.read().await
    }

    /// Number of load attempts, failed ones included.
    pub fn reads(&self) -> usize {
        self.shared.reads.load(Ordering::SeqCst)
    }

    /// Number of successful stores.
    pub fn writes(&self) -> usize {
        self.shared.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), SettingsError> {
        if self.shared.failing.load(Ordering::SeqCst) {
            return Err(SettingsError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }
}

impl SettingsStore for MemoryStore {
    async fn load(&self) -> Result<Settings, SettingsError> {
        self.shared.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(*self.shared.settings.read().await)
    }

    async fn store(&self, settings: Settings) -> Result<(), SettingsError> {
        self.check()?;
        if self.shared.read_only.load(Ordering::SeqCst) {
            return Err(SettingsError::Unavailable("store is read-only".to_string()));
        }
        *self.shared.settings.write().await = settings;
        self.shared.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
