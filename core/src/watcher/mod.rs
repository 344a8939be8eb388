//! Watcher event loop
//!
//! Owns the pass lifecycle. Three trigger sources feed one scheduler:
//!
//! ```text
//!  document mutations ─┐
//!  host navigation ────┼──► ChangeScheduler ──(300 ms quiet)──► pass
//!  safety-net tick ────┘
//!  toggle command ─────────────────────────────────────────────► pass
//! ```
//!
//! A bootstrap pass runs as soon as the loop starts. Every pass reads the
//! settings fresh, so edits made elsewhere show up on the next pass.

mod handle;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use seen_types::{Settings, VisualState};

use crate::dom::{Mutate, NodeId};
use crate::pass::{ControlStatus, PassKind, PassReport, run_pass};
use crate::scheduler::{ChangeScheduler, Trigger};
use crate::selectors::HostSelectors;
use crate::settings::{SettingsReader, SettingsStore};
use crate::toggle::{Placement, find_control, mount_in_toolbar, render_control, wait_for_toolbar};

use handle::Command;
pub use handle::{TriggerSender, WatcherClosed, WatcherHandle, observe_document};

/// Engine timings and placement.
#[derive(Debug, Clone, PartialEq)]
pub struct WatcherConfig {
    /// Quiet period between the last trigger and the pass.
    pub quiet: Duration,
    /// Period of the safety-net trigger.
    pub safety_net: Duration,
    /// How long one toolbar search may take.
    pub toolbar_timeout: Duration,
    pub toolbar_poll: Duration,
    pub placement: Placement,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            quiet: Duration::from_millis(300),
            safety_net: Duration::from_millis(2000),
            toolbar_timeout: Duration::from_secs(15),
            toolbar_poll: Duration::from_millis(250),
            placement: Placement::Toolbar,
        }
    }
}

pub struct Watcher<D, S> {
    doc: Arc<RwLock<D>>,
    reader: SettingsReader<S>,
    selectors: HostSelectors,
    config: WatcherConfig,
    scheduler: ChangeScheduler,
    triggers: mpsc::UnboundedReceiver<Trigger>,
    commands: mpsc::UnboundedReceiver<Command>,
    reports: watch::Sender<Option<Arc<PassReport>>>,
    toolbar_mount: Option<JoinHandle<Option<NodeId>>>,
    seq: u64,
}

impl<D, S> Watcher<D, S>
where
    D: Mutate + Send + Sync + 'static,
    S: SettingsStore,
{
    pub fn new(
        doc: Arc<RwLock<D>>,
        store: S,
        selectors: HostSelectors,
        config: WatcherConfig,
    ) -> (Self, WatcherHandle) {
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = watch::channel(None);

        let watcher = Self {
            doc,
            reader: SettingsReader::new(store),
            selectors,
            scheduler: ChangeScheduler::new(config.quiet),
            config,
            triggers: trigger_rx,
            commands: command_rx,
            reports: report_tx,
            toolbar_mount: None,
            seq: 0,
        };
        let handle = WatcherHandle {
            commands: command_tx,
            triggers: TriggerSender(trigger_tx),
            reports: report_rx,
        };
        (watcher, handle)
    }

    /// Run until shut down or every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!(
            quiet_ms = self.config.quiet.as_millis() as u64,
            safety_net_ms = self.config.safety_net.as_millis() as u64,
            placement = ?self.config.placement,
            "Watcher started"
        );
        self.pass(PassKind::Bootstrap).await;

        let mut safety_net = interval_at(Instant::now() + self.config.safety_net, self.config.safety_net);
        safety_net.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(trigger) = self.triggers.recv() => {
                    self.scheduler.schedule(trigger);
                }
                command = self.commands.recv() => match command {
                    Some(Command::Toggle { reply }) => {
                        let enabled = self.toggle().await;
                        let _ = reply.send(enabled);
                    }
                    Some(Command::Shutdown) | None => break,
                },
                () = self.scheduler.fired() => {
                    let batch = self.scheduler.take();
                    tracing::trace!(?batch, "Quiet period elapsed");
                    self.pass(PassKind::Debounced).await;
                }
                _ = safety_net.tick() => {
                    self.scheduler.schedule(Trigger::SafetyNet);
                }
            }
        }

        if let Some(task) = self.toolbar_mount.take() {
            task.abort();
        }
        tracing::info!(passes = self.seq, "Watcher stopped");
    }

    /// Persist the inverted mode, show it, then reconcile right away.
    async fn toggle(&mut self) -> bool {
        let current = self.reader.read().await.settings;
        let next = current.toggled();
        if let Err(e) = self.reader.write(next).await {
            tracing::warn!(error = %e, enabled = next.enabled, "Could not persist toggle");
        }
        {
            let mut doc = self.doc.write().await;
            if let Some(control) = find_control(&*doc)
                && let Err(e) = render_control(&mut *doc, control, &next)
            {
                tracing::debug!(error = %e, "Toggle control vanished before render");
            }
        }
        // The pass re-reads the store, so a failed write reverts the control.
        self.pass(PassKind::Toggle).await.settings.enabled
    }

    async fn pass(&mut self, kind: PassKind) -> Arc<PassReport> {
        let read = self.reader.read().await;
        let output = {
            let mut doc = self.doc.write().await;
            run_pass(&mut *doc, &self.selectors, &read.settings, self.config.placement)
        };
        if output.control == ControlStatus::AwaitingToolbar {
            self.mount_when_ready(read.settings);
        }

        self.seq += 1;
        let report = Arc::new(PassReport::new(self.seq, kind, read, output));
        let hidden = report.output.count(VisualState::Hidden);
        let dimmed = report.output.count(VisualState::Dimmed);
        match kind {
            PassKind::Debounced => tracing::debug!(
                seq = report.seq,
                cards = report.output.cards.len(),
                hidden,
                dimmed,
                skipped = report.output.skipped,
                "Pass complete"
            ),
            PassKind::Bootstrap | PassKind::Toggle => tracing::info!(
                seq = report.seq,
                ?kind,
                enabled = report.settings.enabled,
                cards = report.output.cards.len(),
                hidden,
                dimmed,
                skipped = report.output.skipped,
                "Pass complete"
            ),
        }
        self.reports.send_replace(Some(Arc::clone(&report)));
        report
    }

    /// Start a toolbar search unless one is already running.
    fn mount_when_ready(&mut self, settings: Settings) {
        if self.toolbar_mount.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let doc = Arc::clone(&self.doc);
        let selectors = self.selectors.clone();
        let limit = self.config.toolbar_timeout;
        let poll = self.config.toolbar_poll;

        self.toolbar_mount = Some(tokio::spawn(async move {
            let Some(toolbar) = wait_for_toolbar(&doc, &selectors, limit, poll).await else {
                tracing::debug!(
                    timeout_ms = limit.as_millis() as u64,
                    "Toolbar not found, retrying on a later pass"
                );
                return None;
            };
            let mut guard = doc.write().await;
            if let Some(existing) = find_control(&*guard) {
                return Some(existing);
            }
            match mount_in_toolbar(&mut *guard, toolbar, &settings) {
                Ok(control) => {
                    tracing::debug!(%control, "Toggle control mounted in toolbar");
                    Some(control)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Toolbar vanished before mount");
                    None
                }
            }
        }));
    }
}
