//! Status reporting.
//!
//! Workers report progress through the [`StatusSink`] contract: a symbol and
//! optional message per (topic, slot). [`StatusBoard`] is the shared,
//! lock-guarded table behind it; how the table is shown is up to the caller.

mod board;
mod render;
mod types;

pub use board::StatusBoard;
pub use render::render_table;
pub use types::{Cell, Slot, StatusRow, Symbol};

/// Receiver of per-topic progress updates.
pub trait StatusSink: Send + Sync {
    /// Sets the symbol of a slot, and its message when one is given.
    ///
    /// For [`Slot::Message`] only the message is used.
    fn update(&self, key: &str, slot: Slot, symbol: Symbol, message: Option<&str>);

    /// Sets the free-text "last action" of a topic.
    fn message(&self, key: &str, text: &str) {
        self.update(key, Slot::Message, Symbol::Pending, Some(text));
    }
}
