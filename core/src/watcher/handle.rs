use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

use crate::dom::Document;
use crate::pass::PassReport;
use crate::scheduler::Trigger;

#[derive(Debug)]
pub(crate) enum Command {
    /// Flip hide/dim mode; replies with the mode in effect afterwards.
    Toggle { reply: oneshot::Sender<bool> },
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("watcher is not running")]
pub struct WatcherClosed;

/// Feeds triggers into a running watcher.
///
/// Separate from [`WatcherHandle`] so a document observer can hold one
/// without keeping the watcher alive.
#[derive(Debug, Clone)]
pub struct TriggerSender(pub(crate) mpsc::UnboundedSender<Trigger>);

impl TriggerSender {
    /// Returns `false` once the watcher has stopped.
    pub fn send(&self, trigger: Trigger) -> bool {
        self.0.send(trigger).is_ok()
    }
}

/// Register a mutation observer on `doc` that reports every effective write.
pub fn observe_document(doc: &mut Document, triggers: TriggerSender) {
    doc.observe(move || {
        triggers.send(Trigger::Mutation);
    });
}

/// Control side of a running watcher.
///
/// The watcher stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct WatcherHandle {
    pub(crate) commands: mpsc::UnboundedSender<Command>,
    pub(crate) triggers: TriggerSender,
    pub(crate) reports: watch::Receiver<Option<Arc<PassReport>>>,
}

impl WatcherHandle {
    /// Toggle hide/dim mode and wait for the resulting pass.
    pub async fn toggle(&self) -> Result<bool, WatcherClosed> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Toggle { reply })
            .map_err(|_| WatcherClosed)?;
        response.await.map_err(|_| WatcherClosed)
    }

    /// Ask the loop to stop after the current pass.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    /// Signal a completed host navigation.
    pub fn navigated(&self) -> bool {
        self.triggers.send(Trigger::Navigation)
    }

    pub fn triggers(&self) -> TriggerSender {
        self.triggers.clone()
    }

    /// Subscribe to pass reports.
    pub fn reports(&self) -> watch::Receiver<Option<Arc<PassReport>>> {
        self.reports.clone()
    }

    /// Most recent pass report, if any pass has run yet.
    pub fn latest(&self) -> Option<Arc<PassReport>> {
        self.reports.borrow().clone()
    }
}
