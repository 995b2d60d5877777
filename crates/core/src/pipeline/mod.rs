//! Per-topic pipeline.
//!
//! Each topic moves through its stages strictly in order:
//! - **Workspace resolution**: verify the known workspace or create one
//! - **Source ingestion**: add declared sources and wait until they are visible
//! - **Chat configuration**: apply the chat settings
//! - **Research**: start or resume discovery, then import its results
//! - **Artifacts**: request generation and poll the batch status
//! - **Download**: fetch every finished artifact to the output root
//!
//! Any stage may end the topic early with an [`AbortReason`].

pub mod commands;
mod config;
mod runner;
mod types;

pub use config::TimingConfig;
pub use runner::TopicPipeline;
pub use types::{AbortReason, PipelineError, PipelineStage, TopicOutcome};
