//! Execution coordinator.
//!
//! Spawns one [`TopicPipeline`](crate::pipeline::TopicPipeline) per topic on a
//! bounded pool, refreshes the status board on a timer and gathers every
//! topic's result into a [`RunSummary`].

mod runner;
mod types;

pub use runner::Coordinator;
pub use types::{RefreshCallback, RunSummary, TopicReport, TopicSummary};
