//! Integration tests for the JSON file repository.

use std::sync::Arc;

use lens_core::defaults::PROCESSING_INTERRUPTED;
use lens_core::{
    intake_files, AcceptPolicy, ContentIdea, Error, FilePatch, FileStatus, IncomingFile,
    NotebookRepository, NotebookUpdate, StoreSnapshot, VisualPatch, Workspace,
};
use lens_store::JsonFileRepository;

fn populated_workspace() -> (Workspace, String) {
    let mut ws = Workspace::default();
    let nb_id = ws.create_notebook("Launch", "Spring Drop").unwrap().id.clone();

    let staged = intake_files(
        vec![
            IncomingFile::new("brief.txt", "text/plain", b"surf season".to_vec()),
            IncomingFile::new("draft.txt", "text/plain", b"half done".to_vec()),
        ],
        &AcceptPolicy::default(),
    );
    let done_id = staged.accepted[0].id.clone();
    ws.update(&nb_id, NotebookUpdate::AddFiles(staged.accepted))
        .unwrap();
    ws.update(
        &nb_id,
        NotebookUpdate::UpdateFile {
            file_id: done_id,
            patch: FilePatch::status(FileStatus::Completed)
                .with_extracted_text(Some("surf season".to_string())),
        },
    )
    .unwrap();

    ws.update(
        &nb_id,
        NotebookUpdate::SetResearchAnalysis(Some("Audience loves surf.".to_string())),
    )
    .unwrap();
    ws.update(
        &nb_id,
        NotebookUpdate::SetIdeas(vec![ContentIdea::generated(
            "idea-1",
            "Catch the first wave",
            "Instagram",
            "Reel",
            "surfer at dawn",
            vec!["#surf".to_string()],
        )]),
    )
    .unwrap();
    ws.update(
        &nb_id,
        NotebookUpdate::UpdateVisual {
            idea_id: "idea-1".to_string(),
            patch: VisualPatch::Started,
        },
    )
    .unwrap();

    (ws, nb_id)
}

#[tokio::test]
async fn test_missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(dir.path().join("absent.json"));
    assert!(repo.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.json");
    std::fs::write(&path, "  \n").unwrap();

    let repo = JsonFileRepository::new(path);
    assert!(repo.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_file_is_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.json");
    std::fs::write(&path, "{\"notebooks\": [").unwrap();

    let err = JsonFileRepository::new(path).load().await.unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[tokio::test]
async fn test_save_and_restore_drops_transient_state() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(dir.path().join("nested/store.json"));
    let (ws, nb_id) = populated_workspace();

    repo.save(&StoreSnapshot::from(&ws)).await.unwrap();
    assert!(!dir.path().join("nested/store.json.tmp").exists());

    let restored = repo.load().await.unwrap().restore();
    assert_eq!(restored.selected_notebook_id.as_deref(), Some(nb_id.as_str()));

    let nb = restored.notebook(&nb_id).unwrap();
    assert_eq!(nb.research_analysis.as_deref(), Some("Audience loves surf."));

    let done = &nb.files[0];
    assert_eq!(done.status, FileStatus::Completed);
    assert!(done.content.is_none());
    assert!(done.extracted_text.is_none());

    // A file still pending at save time cannot resume without its bytes.
    let interrupted = &nb.files[1];
    assert_eq!(interrupted.status, FileStatus::Error);
    assert_eq!(
        interrupted.processing_error.as_deref(),
        Some(PROCESSING_INTERRUPTED)
    );

    let idea = &nb.content_ideas[0];
    assert!(!idea.is_generating_image);
    assert_eq!(idea.hashtags, vec!["#surf".to_string()]);
}

#[tokio::test]
async fn test_stored_document_has_no_file_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let repo = JsonFileRepository::new(&path);
    let (ws, _) = populated_workspace();

    repo.save(&StoreSnapshot::from(&ws)).await.unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(!raw.contains("half done"));
    assert!(!raw.contains("is_generating_image"));
}

#[tokio::test]
async fn test_quota_exceeded_keeps_previous_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let mut small = Workspace::default();
    small.create_notebook("A", "B").unwrap();
    let small = StoreSnapshot::from(&small);
    let limit = serde_json::to_vec(&small).unwrap().len() as u64;

    let repo = JsonFileRepository::new(&path).with_quota(limit);
    repo.save(&small).await.unwrap();

    let (big, _) = populated_workspace();
    let err = repo.save(&StoreSnapshot::from(&big)).await.unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded(_)));

    assert_eq!(repo.load().await.unwrap(), small);
}

#[tokio::test]
async fn test_repository_behind_trait_object() {
    let dir = tempfile::tempdir().unwrap();
    let repo: Arc<dyn NotebookRepository> =
        Arc::new(JsonFileRepository::new(dir.path().join("store.json")));

    let mut ws = Workspace::default();
    ws.create_notebook("Launch", "Spring Drop").unwrap();
    repo.save(&StoreSnapshot::from(&ws)).await.unwrap();

    assert_eq!(repo.load().await.unwrap().notebooks.len(), 1);
}
