use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::client::ClientConfig;
use crate::pipeline::TimingConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub topics: Vec<Topic>,
    /// Artifacts generated for every topic that does not declare its own list.
    #[serde(default)]
    pub artifacts: Vec<ArtifactSpec>,
    #[serde(default)]
    pub research_mode: ResearchMode,
    #[serde(default)]
    pub research_source: ResearchSource,
    /// Redo research, artifacts and downloads even if they were completed before.
    #[serde(default)]
    pub research_force: bool,
    #[serde(default = "default_download")]
    pub download: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Default artifact language. Empty disables the `--language` flag.
    #[serde(default = "default_language")]
    pub language: String,
    /// Default artifact focus prompt.
    #[serde(default)]
    pub focus_prompt: Option<String>,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    /// Upper bound on topics running at once (0 = one slot per topic).
    #[serde(default)]
    pub max_concurrent_topics: usize,
}

fn default_download() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_language() -> String {
    "en".to_string()
}

fn default_state_path() -> PathBuf {
    PathBuf::from("state.json")
}

impl PipelineConfig {
    /// Creates a configuration for the given topics with every other field defaulted.
    pub fn with_topics(topics: Vec<Topic>) -> Self {
        Self {
            topics,
            artifacts: Vec::new(),
            research_mode: ResearchMode::default(),
            research_source: ResearchSource::default(),
            research_force: false,
            download: default_download(),
            output_dir: default_output_dir(),
            language: default_language(),
            focus_prompt: None,
            client: ClientConfig::default(),
            timing: TimingConfig::default(),
            state_path: default_state_path(),
            max_concurrent_topics: 0,
        }
    }

    /// Artifacts that apply to a topic: its own list if declared, the global list otherwise.
    pub fn effective_artifacts<'a>(&'a self, topic: &'a Topic) -> &'a [ArtifactSpec] {
        topic.artifacts.as_deref().unwrap_or(&self.artifacts)
    }

    /// Every artifact kind used by any topic, in first-seen order.
    pub fn all_artifact_kinds(&self) -> Vec<ArtifactKind> {
        let mut kinds = Vec::new();
        let per_topic = self
            .topics
            .iter()
            .filter_map(|t| t.artifacts.as_ref())
            .flatten();
        for spec in self.artifacts.iter().chain(per_topic) {
            if !kinds.contains(&spec.kind) {
                kinds.push(spec.kind);
            }
        }
        kinds
    }
}

/// A unit of work driven through the pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Topic {
    pub key: String,
    pub title: String,
    /// Discovery query for research. Topics without one are sources-only.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Explicit workspace id; wins over the one recorded in state.
    #[serde(default)]
    pub notebook_id: Option<String>,
    #[serde(default)]
    pub chat: Option<ChatConfig>,
    /// Per-topic artifact list. `None` inherits the global list.
    #[serde(default)]
    pub artifacts: Option<Vec<ArtifactSpec>>,
}

impl Topic {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            query: None,
            sources: Vec::new(),
            notebook_id: None,
            chat: None,
            artifacts: None,
        }
    }

    /// The research query, treating an empty string as absent.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.trim().is_empty())
    }

    /// The configured workspace id, treating an empty string as absent.
    pub fn notebook_id(&self) -> Option<&str> {
        self.notebook_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// An input ingested into a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// URL, file path, text body, drive document id or video link.
    pub value: String,
    /// Title for text sources.
    #[serde(default)]
    pub title: Option<String>,
}

impl Source {
    pub fn new(kind: SourceKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            title: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Url,
    File,
    Text,
    Drive,
    Youtube,
}

/// Generated deliverable kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Audio,
    Video,
    SlideDeck,
    Report,
    Flashcards,
    Quiz,
    MindMap,
    Infographic,
    DataTable,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 9] = [
        ArtifactKind::Audio,
        ArtifactKind::Video,
        ArtifactKind::SlideDeck,
        ArtifactKind::Report,
        ArtifactKind::Flashcards,
        ArtifactKind::Quiz,
        ArtifactKind::MindMap,
        ArtifactKind::Infographic,
        ArtifactKind::DataTable,
    ];

    /// Name used in configuration, state and batch-status payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Audio => "audio",
            ArtifactKind::Video => "video",
            ArtifactKind::SlideDeck => "slide_deck",
            ArtifactKind::Report => "report",
            ArtifactKind::Flashcards => "flashcards",
            ArtifactKind::Quiz => "quiz",
            ArtifactKind::MindMap => "mind_map",
            ArtifactKind::Infographic => "infographic",
            ArtifactKind::DataTable => "data_table",
        }
    }

    /// Subcommand of `create` that generates this kind.
    pub fn create_subcommand(&self) -> &'static str {
        match self {
            ArtifactKind::SlideDeck => "slides",
            ArtifactKind::MindMap => "mindmap",
            ArtifactKind::DataTable => "data-table",
            other => other.as_str(),
        }
    }

    /// Subcommand of `download` that fetches this kind.
    pub fn download_subcommand(&self) -> String {
        self.as_str().replace('_', "-")
    }

    /// File extension (with leading dot) of the downloaded file.
    pub fn file_extension(&self) -> &'static str {
        match self {
            ArtifactKind::Audio => ".m4a",
            ArtifactKind::Video => ".mp4",
            ArtifactKind::SlideDeck => ".pdf",
            ArtifactKind::Report => ".md",
            ArtifactKind::Flashcards | ArtifactKind::Quiz | ArtifactKind::MindMap => ".json",
            ArtifactKind::Infographic => ".png",
            ArtifactKind::DataTable => ".csv",
        }
    }

    /// Directory under the output root that collects this kind.
    pub fn output_subdir(&self) -> String {
        match self {
            ArtifactKind::Quiz => "quizzes".to_string(),
            ArtifactKind::Flashcards => "flashcards".to_string(),
            other => format!("{}s", other.as_str()),
        }
    }

    /// Whether completed artifacts of this kind accept revision instructions.
    pub fn supports_revision(&self) -> bool {
        matches!(self, ArtifactKind::SlideDeck)
    }

    /// Human readable column label.
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown artifact kind: {}", s))
    }
}

/// How one artifact is generated, post-processed and downloaded.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtifactSpec {
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    /// Extra `--<name> <value>` flags passed to the create command.
    #[serde(default)]
    pub flags: BTreeMap<String, FlagValue>,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Restrict generation to these source ids.
    #[serde(default)]
    pub source_ids: Vec<String>,
    /// New title applied once the artifact completes.
    #[serde(default)]
    pub rename: Option<String>,
    #[serde(default)]
    pub revision_instructions: Vec<RevisionInstruction>,
}

impl ArtifactSpec {
    pub fn new(kind: ArtifactKind) -> Self {
        Self {
            kind,
            flags: BTreeMap::new(),
            focus: None,
            language: None,
            source_ids: Vec::new(),
            rename: None,
            revision_instructions: Vec::new(),
        }
    }
}

/// Scalar value of an artifact flag.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{}", b),
            FlagValue::Integer(i) => write!(f, "{}", i),
            FlagValue::Float(x) => write!(f, "{}", x),
            FlagValue::Text(s) => f.write_str(s),
        }
    }
}

/// One revision applied to a completed slide deck.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RevisionInstruction {
    /// 1-based slide number.
    pub slide: u32,
    pub instruction: String,
}

/// Chat behaviour configured on the workspace.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub goal: ChatGoal,
    /// Required when `goal` is `custom`.
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub response_length: ResponseLength,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatGoal {
    #[default]
    Default,
    LearningGuide,
    Custom,
}

impl ChatGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatGoal::Default => "default",
            ChatGoal::LearningGuide => "learning_guide",
            ChatGoal::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseLength {
    #[default]
    Default,
    Longer,
    Shorter,
}

impl ResponseLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseLength::Default => "default",
            ResponseLength::Longer => "longer",
            ResponseLength::Shorter => "shorter",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchMode {
    #[default]
    Fast,
    Deep,
}

impl ResearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchMode::Fast => "fast",
            ResearchMode::Deep => "deep",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchSource {
    #[default]
    Web,
    Drive,
}

impl ResearchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchSource::Web => "web",
            ResearchSource::Drive => "drive",
        }
    }
}
