//! Remote Catalog Client: the server-side file list panel.
//!
//! Fetch failures stay inside the panel and never reach the transcript.
//! Selecting an entry only rewrites the host's text field.

use std::sync::{Arc, Mutex};

use parley_core::{CatalogPanel, FileCatalogEntry, Host};
use parley_render::View;
use parley_transport::Transport;

pub struct CatalogClient {
    transport: Arc<dyn Transport>,
    panel: Mutex<CatalogPanel>,
}

impl CatalogClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport, panel: Mutex::new(CatalogPanel::default()) }
    }

    pub fn panel(&self) -> CatalogPanel {
        self.panel.lock().unwrap().clone()
    }

    /// Fetch the file list, showing a loading state first
    pub async fn refresh(&self, view: &dyn View) -> CatalogPanel {
        self.show(CatalogPanel::Loading, view);

        let panel = match self.transport.list_files().await {
            Ok(entries) => {
                tracing::debug!(count = entries.len(), "file catalog loaded");
                CatalogPanel::Entries(entries)
            }
            Err(e) => {
                tracing::warn!(error = %e, "file catalog fetch failed");
                CatalogPanel::Failed(e.to_string())
            }
        };

        self.show(panel.clone(), view);
        panel
    }

    /// Write the entry's instruction into the host's text field
    pub fn select(&self, entry: &FileCatalogEntry, host: &dyn Host) {
        host.set_text(&entry.instruction());
    }

    /// Select by zero-based position in the current panel
    pub fn select_index(&self, position: usize, host: &dyn Host) -> Option<FileCatalogEntry> {
        let entry = self.panel.lock().unwrap().entries().get(position).cloned()?;
        self.select(&entry, host);
        Some(entry)
    }

    fn show(&self, panel: CatalogPanel, view: &dyn View) {
        view.catalog_changed(&panel);
        *self.panel.lock().unwrap() = panel;
    }
}
