pub mod dom;
pub mod pass;
pub mod reconcile;
pub mod scheduler;
pub mod selectors;
pub mod settings;
pub mod signals;
pub mod styles;
pub mod toggle;
pub mod watcher;

// Re-exports for convenience
pub use dom::{Document, DomError, Inspect, Mutate, NodeId, Selector};
pub use pass::{CardReport, ControlStatus, PassKind, PassOutput, PassReport, run_pass};
pub use scheduler::{ChangeScheduler, Trigger};
pub use selectors::{HostSelectors, host};
pub use settings::{ConfyStore, MemoryStore, SettingsError, SettingsReader, SettingsStore};
pub use toggle::Placement;
pub use watcher::{TriggerSender, Watcher, WatcherConfig, WatcherHandle, observe_document};
pub use seen_types::*;
