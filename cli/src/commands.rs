use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use seen_core::formatting::{describe_signal, format_pct, toggle_label, truncate};
use seen_core::{
    ConfyStore, Document, HostSelectors, PassKind, PassReport, Placement, Settings, SettingsReader,
    SettingsStore, VisualState, Watcher, WatcherConfig, WatcherHandle, observe_document, run_pass,
};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::page_watcher;

// ─────────────────────────────────────────────────────────────────────────────
// One-shot commands
// ─────────────────────────────────────────────────────────────────────────────

/// Run a single pass over a saved page and print what it decided.
pub async fn scan(
    page: &Path,
    store: ConfyStore,
    selectors: &HostSelectors,
    placement: Placement,
    json: bool,
    out: Option<&Path>,
) -> Result<(), String> {
    let mut doc = page_watcher::load_page(page).await?;
    let read = SettingsReader::new(store).read().await;
    let output = run_pass(&mut doc, selectors, &read.settings, placement);
    let report = PassReport::new(1, PassKind::Bootstrap, read, output);

    if json {
        let text = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{text}");
    } else {
        print!("{}", format_report(&report));
    }

    if let Some(out) = out {
        write_markup(&doc.to_markup(), out).await?;
        println!("Annotated page written to {}", out.display());
    }
    Ok(())
}

pub async fn show_config(store: &ConfyStore) -> Result<(), String> {
    let settings = store.load().await.map_err(|e| e.to_string())?;
    let path = store.path().map_err(|e| e.to_string())?;
    println!("Settings file: {}", path.display());
    print!("{}", format_settings(&settings));
    Ok(())
}

/// Apply the given changes to the persisted settings.
pub async fn update_config(
    store: &ConfyStore,
    enabled: Option<bool>,
    threshold: Option<f64>,
    grid_columns: Option<i64>,
) -> Result<Settings, String> {
    let current = store.load().await.map_err(|e| e.to_string())?;
    let updated = apply_changes(current, enabled, threshold, grid_columns);
    if updated != current {
        store.store(updated).await.map_err(|e| e.to_string())?;
        tracing::info!(?updated, "Settings updated");
    }
    Ok(updated)
}

fn apply_changes(
    mut settings: Settings,
    enabled: Option<bool>,
    threshold: Option<f64>,
    grid_columns: Option<i64>,
) -> Settings {
    if let Some(enabled) = enabled {
        settings.enabled = enabled;
    }
    if let Some(threshold) = threshold {
        settings = settings.with_threshold(threshold);
    }
    if let Some(columns) = grid_columns {
        settings = settings.with_grid_columns(columns);
    }
    settings
}

pub async fn write_markup(markup: &str, out: &Path) -> Result<(), String> {
    tokio::fs::write(out, markup)
        .await
        .map_err(|e| format!("Failed to write {}: {e}", out.display()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Formatting
// ─────────────────────────────────────────────────────────────────────────────

pub fn format_settings(settings: &Settings) -> String {
    format!(
        "  mode:         {}\n  threshold:    {}\n  grid columns: {}\n",
        toggle_label(settings.enabled),
        format_pct(settings.threshold),
        settings.grid_columns
    )
}

/// Human-readable pass report, one line per card.
pub fn format_report(report: &PassReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Pass {} ({:?}): {}, threshold {}",
        report.seq,
        report.kind,
        toggle_label(report.settings.enabled),
        format_pct(report.settings.threshold)
    );
    if let Some(fault) = &report.settings_fault {
        let _ = writeln!(out, "  settings unavailable, using fallback: {fault}");
    }
    for card in &report.output.cards {
        let _ = writeln!(
            out,
            "  {:<6} {:<28} {:>5}  {:<7} {}",
            card.card.to_string(),
            card.tag,
            describe_signal(&card.signal),
            card.state.as_str(),
            truncate(&card.title, 48)
        );
    }
    let _ = writeln!(
        out,
        "{} cards: {} hidden, {} dimmed, {} normal, {} skipped",
        report.output.cards.len(),
        report.output.count(VisualState::Hidden),
        report.output.count(VisualState::Dimmed),
        report.output.count(VisualState::Normal),
        report.output.skipped
    );
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Watch session
// ─────────────────────────────────────────────────────────────────────────────

/// A running watcher over a page file, plus its helper tasks.
pub struct Session {
    pub doc: Arc<RwLock<Document>>,
    pub handle: WatcherHandle,
    pub store: ConfyStore,
    watcher_task: JoinHandle<()>,
    helpers: Vec<JoinHandle<()>>,
}

impl Session {
    pub async fn start(
        page: PathBuf,
        out: Option<PathBuf>,
        store: ConfyStore,
        selectors: HostSelectors,
        config: WatcherConfig,
    ) -> Result<Self, String> {
        if let Some(out) = &out
            && same_file(&page, out)
        {
            return Err("--out must differ from the watched page".to_string());
        }

        let doc = Arc::new(RwLock::new(page_watcher::load_page(&page).await?));
        let (watcher, handle) = Watcher::new(Arc::clone(&doc), store.clone(), selectors, config);
        observe_document(&mut *doc.write().await, handle.triggers());

        let watcher_task = tokio::spawn(watcher.run());
        let mut helpers = vec![page_watcher::init_watcher(page, Arc::clone(&doc))?];
        if let Some(out) = out {
            helpers.push(spawn_markup_writer(&handle, Arc::clone(&doc), out));
        }

        Ok(Self {
            doc,
            handle,
            store,
            watcher_task,
            helpers,
        })
    }

    pub async fn shutdown(self) {
        self.handle.shutdown();
        for helper in &self.helpers {
            helper.abort();
        }
        if let Err(e) = self.watcher_task.await {
            tracing::warn!(error = %e, "Watcher task ended abnormally");
        }
    }

    pub async fn toggle(&self) -> Result<(), String> {
        let enabled = self.handle.toggle().await.map_err(|e| e.to_string())?;
        println!("{}", toggle_label(enabled));
        Ok(())
    }

    /// Persist a new threshold; the next pass picks it up.
    pub async fn set_threshold(&self, value: f64) -> Result<(), String> {
        let settings = update_config(&self.store, None, Some(value), None).await?;
        println!("Threshold set to {}", format_pct(settings.threshold));
        Ok(())
    }

    pub fn navigate(&self) -> Result<(), String> {
        if self.handle.navigated() {
            Ok(())
        } else {
            Err("Watcher is not running".to_string())
        }
    }

    pub fn report(&self, json: bool) -> Result<(), String> {
        let Some(report) = self.handle.latest() else {
            println!("No pass has run yet");
            return Ok(());
        };
        if json {
            let text = serde_json::to_string_pretty(&*report).map_err(|e| e.to_string())?;
            println!("{text}");
        } else {
            print!("{}", format_report(&report));
        }
        Ok(())
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Rewrite `out` after every pass.
fn spawn_markup_writer(handle: &WatcherHandle, doc: Arc<RwLock<Document>>, out: PathBuf) -> JoinHandle<()> {
    let mut reports = handle.reports();
    tokio::spawn(async move {
        while reports.changed().await.is_ok() {
            // Serialize under the guard, write after releasing it.
            let markup = doc.read().await.to_markup();
            if let Err(e) = write_markup(&markup, &out).await {
                tracing::warn!(error = %e, "Could not write annotated page");
            }
        }
    })
}
