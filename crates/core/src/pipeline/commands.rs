//! External command vocabulary.
//!
//! Builders for every action the pipeline issues, with their per-call
//! timeouts, plus the text signals read back from the responses.

use std::path::Path;
use std::time::Duration;

use crate::client::{CommandRequest, DEFAULT_TIMEOUT};
use crate::config::{
    ArtifactKind, ArtifactSpec, ChatConfig, ChatGoal, ResearchMode, ResearchSource,
    RevisionInstruction, Source, SourceKind,
};

pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(30);
pub const SOURCE_ADD_TIMEOUT: Duration = Duration::from_secs(120);
pub const RESEARCH_STATUS_TIMEOUT: Duration = Duration::from_secs(60);
/// Deep research can take a while to accept the request.
pub const RESEARCH_START_TIMEOUT: Duration = Duration::from_secs(360);
pub const RESEARCH_IMPORT_TIMEOUT: Duration = Duration::from_secs(120);
pub const ARTIFACT_CREATE_TIMEOUT: Duration = Duration::from_secs(180);
pub const STUDIO_STATUS_TIMEOUT: Duration = Duration::from_secs(60);
pub const REVISE_TIMEOUT: Duration = Duration::from_secs(180);
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

const UNTITLED_TEXT: &str = "Untitled Text";

fn request(args: Vec<String>, timeout: Duration) -> CommandRequest {
    CommandRequest::new(args).with_timeout(timeout)
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn verify_notebook(notebook_id: &str) -> CommandRequest {
    request(words(&["get", "notebook", notebook_id]), VERIFY_TIMEOUT)
}

pub fn create_notebook(title: &str) -> CommandRequest {
    request(words(&["create", "notebook", title]), DEFAULT_TIMEOUT)
}

pub fn add_source(notebook_id: &str, source: &Source) -> CommandRequest {
    let mut args = words(&["source", "add", notebook_id]);
    let flag = match source.kind {
        SourceKind::Url => "--url",
        SourceKind::File => "--file",
        SourceKind::Text => "--text",
        SourceKind::Drive => "--drive",
        SourceKind::Youtube => "--youtube",
    };
    args.push(flag.to_string());
    args.push(source.value.clone());
    if source.kind == SourceKind::Text {
        args.push("--title".to_string());
        args.push(
            source
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNTITLED_TEXT.to_string()),
        );
    }
    request(args, SOURCE_ADD_TIMEOUT)
}

pub fn configure_chat(notebook_id: &str, chat: &ChatConfig) -> CommandRequest {
    let mut args = words(&[
        "chat",
        "configure",
        notebook_id,
        "--goal",
        chat.goal.as_str(),
        "--response-length",
        chat.response_length.as_str(),
    ]);
    if chat.goal == ChatGoal::Custom {
        if let Some(prompt) = chat.prompt.as_deref().filter(|p| !p.is_empty()) {
            args.push("--prompt".to_string());
            args.push(prompt.to_string());
        }
    }
    request(args, DEFAULT_TIMEOUT)
}

/// Initial research status check.
pub fn research_status(notebook_id: &str) -> CommandRequest {
    request(words(&["research", "status", notebook_id]), RESEARCH_STATUS_TIMEOUT)
}

/// Non-blocking research status check used while polling.
pub fn poll_research_status(notebook_id: &str) -> CommandRequest {
    request(
        words(&["research", "status", notebook_id, "--max-wait", "0"]),
        RESEARCH_STATUS_TIMEOUT,
    )
}

pub fn start_research(
    notebook_id: &str,
    query: &str,
    mode: ResearchMode,
    source: ResearchSource,
    force: bool,
) -> CommandRequest {
    let mut args = words(&[
        "research",
        "start",
        "--mode",
        mode.as_str(),
        "--source",
        source.as_str(),
        "--notebook-id",
        notebook_id,
    ]);
    if force {
        args.push("--force".to_string());
    }
    args.push(query.to_string());
    request(args, RESEARCH_START_TIMEOUT)
}

pub fn import_research(notebook_id: &str, task_id: Option<&str>) -> CommandRequest {
    let mut args = words(&["research", "import", notebook_id]);
    if let Some(task) = task_id {
        args.push(task.to_string());
    }
    request(args, RESEARCH_IMPORT_TIMEOUT)
}

/// Creation request for one artifact.
///
/// Focus and language fall back to the global defaults; an empty value omits the flag.
pub fn create_artifact(
    notebook_id: &str,
    spec: &ArtifactSpec,
    default_focus: Option<&str>,
    default_language: &str,
) -> CommandRequest {
    let mut args = words(&["create", spec.kind.create_subcommand(), notebook_id, "--confirm"]);

    for (name, value) in &spec.flags {
        args.push(format!("--{}", name.replace('_', "-")));
        args.push(value.to_string());
    }

    let focus = spec.focus.as_deref().or(default_focus).filter(|f| !f.is_empty());
    if let Some(focus) = focus {
        args.push("--focus".to_string());
        args.push(focus.to_string());
    }

    let language = spec
        .language
        .as_deref()
        .filter(|l| !l.is_empty())
        .unwrap_or(default_language);
    if !language.is_empty() {
        args.push("--language".to_string());
        args.push(language.to_string());
    }

    if !spec.source_ids.is_empty() {
        args.push("--source-ids".to_string());
        args.push(spec.source_ids.join(","));
    }

    request(args, ARTIFACT_CREATE_TIMEOUT)
}

/// Batch status of every artifact in the workspace, as JSON.
pub fn studio_status(notebook_id: &str) -> CommandRequest {
    request(words(&["studio", "status", notebook_id, "--json"]), STUDIO_STATUS_TIMEOUT)
}

pub fn revise_slides(artifact_id: &str, instructions: &[RevisionInstruction]) -> CommandRequest {
    let mut args = words(&["slides", "revise", artifact_id, "--confirm"]);
    for revision in instructions {
        args.push("--slide".to_string());
        args.push(format!("{} {}", revision.slide, revision.instruction));
    }
    request(args, REVISE_TIMEOUT)
}

pub fn rename_artifact(notebook_id: &str, artifact_id: &str, title: &str) -> CommandRequest {
    request(
        words(&["studio", "rename", notebook_id, artifact_id, title]),
        DEFAULT_TIMEOUT,
    )
}

pub fn download_artifact(notebook_id: &str, kind: ArtifactKind, output: &Path) -> CommandRequest {
    let mut args = vec![
        "download".to_string(),
        kind.download_subcommand(),
        notebook_id.to_string(),
        "--output".to_string(),
        output.to_string_lossy().into_owned(),
    ];
    if kind == ArtifactKind::SlideDeck {
        args.push("--format".to_string());
        args.push("pdf".to_string());
    }
    request(args, DOWNLOAD_TIMEOUT)
}

/// Whether a verification response says the workspace is gone.
pub fn notebook_missing(output: &str) -> bool {
    output.is_empty() || output.contains("Error") || output.to_lowercase().contains("not found")
}

/// Whether a workspace listing mentions sources.
pub fn sources_present(output: &str) -> bool {
    output.to_lowercase().contains("source")
}

/// Whether the initial research status asks for a new run.
pub fn research_needs_start(output: &str) -> bool {
    output.is_empty() || output.to_lowercase().contains("no research found")
}

pub fn research_completed(output: &str) -> bool {
    output.to_lowercase().contains("status: completed")
}

pub fn research_failed(output: &str) -> bool {
    output.to_lowercase().contains("failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FlagValue, ResponseLength};

    const ID: &str = "nb-1";

    #[test]
    fn test_add_source_shapes() {
        let url = add_source(ID, &Source::new(SourceKind::Url, "https://a.b"));
        assert_eq!(url.args, vec!["source", "add", ID, "--url", "https://a.b"]);
        assert_eq!(url.timeout, SOURCE_ADD_TIMEOUT);

        let text = add_source(ID, &Source::new(SourceKind::Text, "body"));
        assert_eq!(
            text.args,
            vec!["source", "add", ID, "--text", "body", "--title", "Untitled Text"]
        );

        let mut titled = Source::new(SourceKind::Text, "body");
        titled.title = Some("Notes".to_string());
        assert_eq!(add_source(ID, &titled).args.last().unwrap(), "Notes");

        let yt = add_source(ID, &Source::new(SourceKind::Youtube, "https://youtu.be/x"));
        assert_eq!(yt.args[3], "--youtube");
        let drive = add_source(ID, &Source::new(SourceKind::Drive, "doc123"));
        assert_eq!(drive.args[3..], ["--drive", "doc123"]);
    }

    #[test]
    fn test_chat_prompt_only_for_custom_goal() {
        let mut chat = ChatConfig {
            goal: ChatGoal::LearningGuide,
            prompt: Some("ignored".to_string()),
            response_length: ResponseLength::Longer,
        };
        assert_eq!(
            configure_chat(ID, &chat).args,
            vec!["chat", "configure", ID, "--goal", "learning_guide", "--response-length", "longer"]
        );

        chat.goal = ChatGoal::Custom;
        let args = configure_chat(ID, &chat).args;
        assert_eq!(args[args.len() - 2..], ["--prompt", "ignored"]);
    }

    #[test]
    fn test_start_research() {
        let req = start_research(ID, "rust async", ResearchMode::Deep, ResearchSource::Web, true);
        assert_eq!(
            req.args,
            vec![
                "research", "start", "--mode", "deep", "--source", "web", "--notebook-id", ID,
                "--force", "rust async"
            ]
        );
        assert_eq!(req.timeout, RESEARCH_START_TIMEOUT);

        let req = start_research(ID, "q", ResearchMode::Fast, ResearchSource::Drive, false);
        assert!(!req.args.contains(&"--force".to_string()));
    }

    #[test]
    fn test_import_research_task_is_optional() {
        assert_eq!(import_research(ID, None).args, vec!["research", "import", ID]);
        assert_eq!(
            import_research(ID, Some("t-1")).args,
            vec!["research", "import", ID, "t-1"]
        );
    }

    #[test]
    fn test_create_artifact_flags_and_defaults() {
        let mut spec = ArtifactSpec::new(ArtifactKind::SlideDeck);
        spec.flags.insert("format".to_string(), FlagValue::Text("detailed".to_string()));
        spec.flags.insert("slide_count".to_string(), FlagValue::Integer(12));
        spec.source_ids = vec!["s1".to_string(), "s2".to_string()];

        let req = create_artifact(ID, &spec, Some("beginners"), "en");
        assert_eq!(
            req.args,
            vec![
                "create", "slides", ID, "--confirm", "--format", "detailed", "--slide-count", "12",
                "--focus", "beginners", "--language", "en", "--source-ids", "s1,s2"
            ]
        );
        assert_eq!(req.timeout, ARTIFACT_CREATE_TIMEOUT);
    }

    #[test]
    fn test_create_artifact_overrides() {
        let mut spec = ArtifactSpec::new(ArtifactKind::Audio);
        spec.focus = Some("history".to_string());
        spec.language = Some("de".to_string());
        let req = create_artifact(ID, &spec, Some("global"), "en");
        assert_eq!(
            req.args,
            vec!["create", "audio", ID, "--confirm", "--focus", "history", "--language", "de"]
        );

        let plain = create_artifact(ID, &ArtifactSpec::new(ArtifactKind::MindMap), None, "");
        assert_eq!(plain.args, vec!["create", "mindmap", ID, "--confirm"]);
    }

    #[test]
    fn test_revise_slides() {
        let instructions = vec![
            RevisionInstruction { slide: 1, instruction: "Shorter title".to_string() },
            RevisionInstruction { slide: 4, instruction: "Add a diagram".to_string() },
        ];
        assert_eq!(
            revise_slides("art-9", &instructions).args,
            vec!["slides", "revise", "art-9", "--confirm", "--slide", "1 Shorter title", "--slide", "4 Add a diagram"]
        );
    }

    #[test]
    fn test_download_artifact() {
        let req = download_artifact(ID, ArtifactKind::SlideDeck, Path::new("out/slide_decks/k.pdf"));
        assert_eq!(
            req.args,
            vec!["download", "slide-deck", ID, "--output", "out/slide_decks/k.pdf", "--format", "pdf"]
        );
        let req = download_artifact(ID, ArtifactKind::DataTable, Path::new("t.csv"));
        assert_eq!(req.args, vec!["download", "data-table", ID, "--output", "t.csv"]);
    }

    #[test]
    fn test_signals() {
        assert!(notebook_missing(""));
        assert!(notebook_missing("Error: unauthorized"));
        assert!(notebook_missing("Notebook NOT FOUND"));
        assert!(!notebook_missing("Title: Rust\n3 sources"));

        assert!(sources_present("3 Sources"));
        assert!(!sources_present("empty notebook"));

        assert!(research_needs_start(""));
        assert!(research_needs_start("No research found for notebook"));
        assert!(!research_needs_start("Status: in_progress"));

        assert!(research_completed("Status: Completed"));
        assert!(!research_completed("completed tasks: 0"));
        assert!(research_failed("Status: FAILED"));
    }
}
