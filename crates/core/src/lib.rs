pub mod client;
pub mod config;
pub mod coordinator;
pub mod extract;
pub mod pipeline;
pub mod state;
pub mod status;
pub mod testing;

pub use client::{CliClient, ClientConfig, CommandClient, CommandRequest};
pub use config::{
    load_config, load_config_from_str, validate_config, ArtifactKind, ArtifactSpec, ConfigError,
    PipelineConfig, Topic,
};
pub use coordinator::{Coordinator, RunSummary, TopicReport};
pub use pipeline::{AbortReason, PipelineError, TimingConfig, TopicOutcome, TopicPipeline};
pub use state::{PersistentState, StageToken, StateError, StateStore};
pub use status::{Slot, StatusBoard, StatusSink, Symbol};
