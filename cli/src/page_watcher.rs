use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use seen_core::Document;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;

/// Load a saved page from disk.
pub async fn load_page(path: &Path) -> Result<Document, String> {
    let markup = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    Document::parse(&markup).map_err(|e| format!("Failed to parse {}: {e}", path.display()))
}

/// Re-read the page and swap it into the shared document.
///
/// The swap notifies the document's observers, which is what schedules the
/// next pass.
pub async fn reload(path: &Path, doc: &RwLock<Document>) -> Result<(), String> {
    let fresh = load_page(path).await?;
    doc.write().await.replace_contents(fresh);
    Ok(())
}

/// Whether a filesystem event touches the page file.
fn is_page_event(page: &Path, event: &Event) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == page.file_name())
}

/// Start watching the page file and reloading it into `doc` on change.
///
/// The parent directory is watched rather than the file, so editors that
/// replace the file on save keep working.
pub fn init_watcher(page: PathBuf, doc: Arc<RwLock<Document>>) -> Result<JoinHandle<()>, String> {
    let page = page
        .canonicalize()
        .map_err(|e| format!("Cannot watch {}: {e}", page.display()))?;
    let dir = page
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| format!("{} has no parent directory", page.display()))?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let filter_page = page.clone();
    let mut watcher = RecommendedWatcher::new(
        move |result: notify::Result<Event>| match result {
            Ok(event) if is_page_event(&filter_page, &event) => {
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Page watcher error"),
        },
        notify::Config::default(),
    )
    .map_err(|e| format!("Failed to start page watcher: {e}"))?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| format!("Failed to watch {}: {e}", dir.display()))?;

    tracing::info!(page = %page.display(), "Watching page file");

    let handle = tokio::spawn(async move {
        // Keep the watcher alive for as long as the task runs.
        let _watcher = watcher;
        while rx.recv().await.is_some() {
            // Editors often emit several events per save.
            while rx.try_recv().is_ok() {}
            match reload(&page, &doc).await {
                Ok(()) => tracing::debug!(page = %page.display(), "Page reloaded"),
                Err(e) => tracing::warn!(error = %e, "Page reload failed, keeping previous tree"),
            }
        }
    });
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use seen_core::{Inspect, host};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[test]
    fn test_only_page_events_count() {
        let page = Path::new("/tmp/pages/home.xhtml");
        let modify = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(page.to_path_buf());
        let create = Event::new(EventKind::Create(CreateKind::File)).add_path(page.to_path_buf());
        let other = Event::new(EventKind::Modify(ModifyKind::Any)).add_path("/tmp/pages/other.xhtml".into());
        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(page.to_path_buf());

        assert!(is_page_event(page, &modify));
        assert!(is_page_event(page, &create));
        assert!(!is_page_event(page, &other));
        assert!(!is_page_event(page, &removed));
    }

    #[tokio::test]
    async fn test_reload_swaps_tree_and_notifies() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.xhtml");
        std::fs::write(&path, "<html><body><ytd-video-renderer/></body></html>").unwrap();

        let mut doc = load_page(&path).await.unwrap();
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        doc.observe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let doc = RwLock::new(doc);

        std::fs::write(
            &path,
            "<html><body><ytd-video-renderer/><ytd-playlist-video-renderer/></body></html>",
        )
        .unwrap();
        reload(&path, &doc).await.unwrap();

        let guard = doc.read().await;
        assert_eq!(guard.query_all(guard.root(), &host().cards).len(), 2);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_broken_page_keeps_previous_tree() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.xhtml");
        std::fs::write(&path, "<html><body><ytd-video-renderer/></body></html>").unwrap();
        let doc = RwLock::new(load_page(&path).await.unwrap());

        std::fs::write(&path, "<html><body>").unwrap();
        assert!(reload(&path, &doc).await.is_err());

        let guard = doc.read().await;
        assert_eq!(guard.query_all(guard.root(), &host().cards).len(), 1);
    }
}
