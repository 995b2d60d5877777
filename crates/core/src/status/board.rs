//! Synchronized status table.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::types::{Cell, Slot, StatusRow, Symbol};
use super::StatusSink;
use crate::config::{ArtifactKind, PipelineConfig};

/// Status grid keyed by topic and slot, shared by every worker.
pub struct StatusBoard {
    columns: Vec<ArtifactKind>,
    order: Vec<String>,
    rows: Mutex<HashMap<String, StatusRow>>,
}

impl StatusBoard {
    /// Creates a board for `layout` (topic key and the artifact kinds that apply to it).
    ///
    /// `columns` lists every artifact column; cells for kinds a topic does not
    /// use start as [`Symbol::NotApplicable`] and stay that way.
    pub fn new(layout: &[(String, Vec<ArtifactKind>)], columns: Vec<ArtifactKind>) -> Self {
        let mut rows = HashMap::new();
        let mut order = Vec::with_capacity(layout.len());

        for (key, applicable) in layout {
            let artifacts = columns
                .iter()
                .map(|kind| {
                    let cell = if applicable.contains(kind) {
                        Cell::new(Symbol::NotDone, "Pending...")
                    } else {
                        Cell::new(Symbol::NotApplicable, "N/A")
                    };
                    (*kind, cell)
                })
                .collect();

            rows.insert(
                key.clone(),
                StatusRow {
                    key: key.clone(),
                    notebook: Cell::new(Symbol::NotDone, "Waiting..."),
                    research: Cell::new(Symbol::NotDone, "Pending..."),
                    artifacts,
                    message: "Waiting...".to_string(),
                },
            );
            order.push(key.clone());
        }

        Self {
            columns,
            order,
            rows: Mutex::new(rows),
        }
    }

    /// Builds the board for every topic of a configuration.
    pub fn for_config(config: &PipelineConfig) -> Self {
        let layout: Vec<(String, Vec<ArtifactKind>)> = config
            .topics
            .iter()
            .map(|topic| {
                let kinds = config
                    .effective_artifacts(topic)
                    .iter()
                    .map(|spec| spec.kind)
                    .collect();
                (topic.key.clone(), kinds)
            })
            .collect();
        Self::new(&layout, config.all_artifact_kinds())
    }

    pub fn columns(&self) -> &[ArtifactKind] {
        &self.columns
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StatusRow>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Rows in topic order.
    pub fn snapshot(&self) -> Vec<StatusRow> {
        let rows = self.lock();
        self.order
            .iter()
            .filter_map(|key| rows.get(key).cloned())
            .collect()
    }

    /// Row of a single topic.
    pub fn row(&self, key: &str) -> Option<StatusRow> {
        self.lock().get(key).cloned()
    }

    /// Plain-text rendering of the current table.
    pub fn render(&self) -> String {
        super::render::render_table(&self.columns, &self.snapshot())
    }
}

impl StatusSink for StatusBoard {
    fn update(&self, key: &str, slot: Slot, symbol: Symbol, message: Option<&str>) {
        let mut rows = self.lock();
        let Some(row) = rows.get_mut(key) else {
            debug!("Status update for unknown topic {}", key);
            return;
        };

        let cell = match slot {
            Slot::Message => {
                if let Some(text) = message {
                    row.message = text.to_string();
                }
                return;
            }
            Slot::Notebook => &mut row.notebook,
            Slot::Research => &mut row.research,
            Slot::Artifact(kind) => match row.artifacts.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, cell)) => cell,
                None => return,
            },
        };

        if cell.symbol == Symbol::NotApplicable {
            return;
        }
        cell.symbol = symbol;
        if let Some(text) = message {
            cell.message = text.to_string();
        }
    }
}
