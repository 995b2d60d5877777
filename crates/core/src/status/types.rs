//! Status table types.

use serde::Serialize;
use std::fmt;

use crate::config::ArtifactKind;

/// Column of the status table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "slot", content = "kind")]
pub enum Slot {
    Notebook,
    Research,
    /// Free-text "last action" column.
    Message,
    Artifact(ArtifactKind),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Notebook => f.write_str("notebook"),
            Slot::Research => f.write_str("research"),
            Slot::Message => f.write_str("msg"),
            Slot::Artifact(kind) => write!(f, "{}", kind),
        }
    }
}

/// Progress symbol shown in a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    Done,
    Pending,
    NotDone,
    Polling,
    /// The column does not apply to the topic. Cells holding it never change.
    NotApplicable,
}

impl Symbol {
    pub fn glyph(&self) -> &'static str {
        match self {
            Symbol::Done => "✔",
            Symbol::Pending => "●",
            Symbol::NotDone => "✘",
            Symbol::Polling => "⧖",
            Symbol::NotApplicable => "─",
        }
    }
}

/// Symbol plus the last message attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub symbol: Symbol,
    pub message: String,
}

impl Cell {
    pub fn new(symbol: Symbol, message: impl Into<String>) -> Self {
        Self {
            symbol,
            message: message.into(),
        }
    }
}

/// Snapshot of one topic's row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    pub key: String,
    pub notebook: Cell,
    pub research: Cell,
    /// One cell per table column, in column order.
    pub artifacts: Vec<(ArtifactKind, Cell)>,
    pub message: String,
}

impl StatusRow {
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Cell> {
        self.artifacts
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, cell)| cell)
    }

    pub fn cell(&self, slot: Slot) -> Option<&Cell> {
        match slot {
            Slot::Notebook => Some(&self.notebook),
            Slot::Research => Some(&self.research),
            Slot::Message => None,
            Slot::Artifact(kind) => self.artifact(kind),
        }
    }
}
