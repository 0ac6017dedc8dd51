//! End-to-end tests for the campaign service using mock backends.

use std::sync::Arc;
use std::time::Duration;

use lens_core::defaults::{NO_PROCESSING_NOTE, SYNTHESIS_REQUIRED};
use lens_core::{
    AcceptPolicy, ContentIdea, Error, FileStatus, IdeaAction, IdeaColor, IncomingFile, NotebookRepository,
    ParameterPatch, Tone,
};
use lens_inference::mock::{MockGenerationBackend, MockImageBackend, MockVisionBackend};
use lens_jobs::{
    CampaignService, FileOutcome, PipelineConfig, ServiceConfig, VisualOutcome, WorkspaceEvent,
};
use lens_store::MemoryRepository;
use tokio::sync::broadcast;

const IDEA_NEEDLE: &str = "Creative Content Strategist";
const ANALYSIS: &str = "## Audience\nSurfers who film at dawn.";

fn ideas_json() -> String {
    serde_json::json!([
        {"id": "idea-a", "postText": "Catch the first wave", "platform": "Instagram Post",
         "contentType": "Reel", "visualConceptPrompt": "surfer at sunrise", "hashtags": ["#surf"]},
        {"id": "idea-b", "postText": "Wax on, stress off", "platform": "TikTok Video",
         "contentType": "Short Video", "visualConceptPrompt": "board wax close-up", "hashtags": "#wax"}
    ])
    .to_string()
}

fn generation() -> MockGenerationBackend {
    MockGenerationBackend::new()
        .with_fixed_response(ANALYSIS)
        .with_response_when(IDEA_NEEDLE, ideas_json())
}

const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

fn drain(rx: &mut broadcast::Receiver<WorkspaceEvent>) -> Vec<WorkspaceEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_full_campaign_flow_survives_reload() {
    let repo = Arc::new(MemoryRepository::new());
    let images = MockImageBackend::new().with_image_url("data:image/png;base64,c3VyZg==");
    let service = CampaignService::builder(Arc::new(generation()), Arc::new(images.clone()))
        .with_vision(Arc::new(
            MockVisionBackend::new().with_response("A surfer on a longboard."),
        ))
        .with_repository(repo.clone())
        .build();

    let nb = service.create_notebook("Launch", "Summer Swell").await.unwrap();
    let report = service
        .add_files(
            &nb.id,
            vec![
                IncomingFile::new("brief.txt", "text/plain", b"Dawn patrol content".to_vec()),
                IncomingFile::new("board.jpg", "image/jpeg", JPEG_BYTES.to_vec()),
                IncomingFile::new("teaser.mp4", "video/mp4", vec![0, 0, 0, 0x18]),
            ],
        )
        .await
        .unwrap();
    assert!(report.rejection_message.is_none());
    assert!(report
        .outcomes
        .iter()
        .all(|(_, outcome)| *outcome == FileOutcome::Completed));

    let current = service.notebook(&nb.id).await.unwrap();
    assert_eq!(
        current.files[1].image_analysis.as_deref(),
        Some("A surfer on a longboard.")
    );
    assert_eq!(
        current.files[2].processing_error.as_deref(),
        Some(NO_PROCESSING_NOTE)
    );

    let outcome = service.synthesize_research(&nb.id).await.unwrap();
    assert_eq!(outcome.analysis, ANALYSIS);
    assert_eq!(outcome.items_total, 2);

    let ideas = service.generate_ideas(&nb.id).await.unwrap();
    assert_eq!(ideas.len(), 2);
    assert_eq!(ideas[1].hashtags, vec!["#wax".to_string()]);

    service
        .apply_idea_action(&nb.id, IdeaAction::SetColor("idea-b".into(), IdeaColor::Teal))
        .await
        .unwrap();
    let visual = service.generate_visual(&nb.id, "idea-a").await.unwrap();
    assert_eq!(
        visual,
        VisualOutcome::Generated {
            image_url: "data:image/png;base64,c3VyZg==".to_string()
        }
    );
    assert!(images.get_calls()[0].input.contains("surfer at sunrise"));

    let reloaded = CampaignService::builder(Arc::new(generation()), Arc::new(images))
        .with_repository(repo)
        .build();
    assert_eq!(reloaded.load().await.unwrap(), 1);

    let restored = reloaded.selected_notebook().await.unwrap();
    assert_eq!(restored.research_analysis.as_deref(), Some(ANALYSIS));
    assert_eq!(restored.files.len(), 3);
    assert!(restored.files.iter().all(|f| f.content.is_none()));
    assert_eq!(
        restored.content_ideas[0].generated_image_url.as_deref(),
        Some("data:image/png;base64,c3VyZg==")
    );
    assert_eq!(restored.content_ideas[1].color, IdeaColor::Teal);
}

#[tokio::test]
async fn test_files_processed_one_at_a_time_in_upload_order() {
    let service = CampaignService::builder(
        Arc::new(generation()),
        Arc::new(MockImageBackend::new()),
    )
    .with_vision(Arc::new(MockVisionBackend::new().with_latency_ms(20)))
    .build();
    let nb = service.create_notebook("Launch", "Summer Swell").await.unwrap();
    let mut rx = service.subscribe();

    let report = service
        .add_files(
            &nb.id,
            vec![
                IncomingFile::new("a.jpg", "image/jpeg", JPEG_BYTES.to_vec()),
                IncomingFile::new("b.txt", "text/plain", b"second".to_vec()),
                IncomingFile::new("c.jpg", "image/jpeg", JPEG_BYTES.to_vec()),
            ],
        )
        .await
        .unwrap();

    let lifecycle: Vec<(String, &str)> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            WorkspaceEvent::FileStarted { file_id, .. } => Some((file_id, "started")),
            WorkspaceEvent::FileCompleted { file_id, .. } => Some((file_id, "completed")),
            _ => None,
        })
        .collect();

    let expected: Vec<(String, &str)> = report
        .accepted
        .iter()
        .flat_map(|id| [(id.clone(), "started"), (id.clone(), "completed")])
        .collect();
    assert_eq!(lifecycle, expected);
}

#[tokio::test]
async fn test_rejected_upload_reported_alongside_accepted() {
    let service = CampaignService::builder(
        Arc::new(generation()),
        Arc::new(MockImageBackend::new()),
    )
    .build();
    let nb = service.create_notebook("Launch", "Summer Swell").await.unwrap();
    let mut rx = service.subscribe();

    let report = service
        .add_files(
            &nb.id,
            vec![
                IncomingFile::new("setup.exe", "application/x-msdownload", vec![0x4D, 0x5A]),
                IncomingFile::new("notes.txt", "text/plain", b"keep me".to_vec()),
            ],
        )
        .await
        .unwrap();

    assert_eq!(report.accepted.len(), 1);
    assert!(report.rejection_message.unwrap().contains("setup.exe"));

    let added = drain(&mut rx).into_iter().find_map(|event| match event {
        WorkspaceEvent::FilesAdded { rejected, .. } => Some(rejected),
        _ => None,
    });
    assert_eq!(added, Some(1));
}

#[tokio::test]
async fn test_new_files_invalidate_analysis_and_ideas() {
    let service = CampaignService::builder(
        Arc::new(generation()),
        Arc::new(MockImageBackend::new()),
    )
    .build();
    let nb = service.create_notebook("Launch", "Summer Swell").await.unwrap();
    service
        .add_files(
            &nb.id,
            vec![IncomingFile::new("a.txt", "text/plain", b"first".to_vec())],
        )
        .await
        .unwrap();
    service.synthesize_research(&nb.id).await.unwrap();
    service.generate_ideas(&nb.id).await.unwrap();

    service
        .add_files(
            &nb.id,
            vec![IncomingFile::new("b.txt", "text/plain", b"second".to_vec())],
        )
        .await
        .unwrap();

    let current = service.notebook(&nb.id).await.unwrap();
    assert!(current.research_analysis.is_none());
    assert!(current.content_ideas.is_empty());
    assert_eq!(current.files[1].status, FileStatus::Completed);
}

#[tokio::test]
async fn test_parameter_change_clears_ideas_but_noop_does_not() {
    let service = CampaignService::builder(
        Arc::new(generation()),
        Arc::new(MockImageBackend::new()),
    )
    .build();
    let nb = service.create_notebook("Launch", "Summer Swell").await.unwrap();
    service
        .add_files(
            &nb.id,
            vec![IncomingFile::new("a.txt", "text/plain", b"first".to_vec())],
        )
        .await
        .unwrap();
    service.synthesize_research(&nb.id).await.unwrap();
    service.generate_ideas(&nb.id).await.unwrap();

    let same = ParameterPatch {
        tone: Some(Tone::Casual),
        ..Default::default()
    };
    assert!(!service.update_parameters(&nb.id, same).await.unwrap());
    assert_eq!(service.notebook(&nb.id).await.unwrap().content_ideas.len(), 2);

    let playful = ParameterPatch {
        tone: Some(Tone::Playful),
        ..Default::default()
    };
    assert!(service.update_parameters(&nb.id, playful).await.unwrap());
    let current = service.notebook(&nb.id).await.unwrap();
    assert!(current.content_ideas.is_empty());
    assert_eq!(current.research_analysis.as_deref(), Some(ANALYSIS));
}

#[tokio::test]
async fn test_generate_ideas_without_analysis_keeps_existing_ideas() {
    let service = CampaignService::builder(
        Arc::new(generation()),
        Arc::new(MockImageBackend::new()),
    )
    .build();
    let nb = service.create_notebook("Launch", "Summer Swell").await.unwrap();
    service
        .apply_idea_action(
            &nb.id,
            IdeaAction::Edit {
                id: None,
                draft: lens_core::IdeaDraft {
                    post_text: "Hand written".to_string(),
                    content_type: "Post".to_string(),
                    visual_concept_prompt: "sketch".to_string(),
                    ..Default::default()
                },
            },
        )
        .await
        .unwrap();

    let err = service.generate_ideas(&nb.id).await.unwrap_err();
    assert_eq!(err.detail(), SYNTHESIS_REQUIRED);

    let current = service.notebook(&nb.id).await.unwrap();
    assert_eq!(current.content_ideas.len(), 1);
    assert!(current.content_ideas[0].is_manual);
}

#[tokio::test]
async fn test_malformed_idea_response_leaves_list_empty() {
    let generation = MockGenerationBackend::new()
        .with_fixed_response(ANALYSIS)
        .with_response_when(IDEA_NEEDLE, "Sure! Here are some ideas...");
    let service = CampaignService::builder(Arc::new(generation), Arc::new(MockImageBackend::new()))
        .build();
    let nb = service.create_notebook("Launch", "Summer Swell").await.unwrap();
    service
        .add_files(
            &nb.id,
            vec![IncomingFile::new("a.txt", "text/plain", b"first".to_vec())],
        )
        .await
        .unwrap();
    service.synthesize_research(&nb.id).await.unwrap();
    let mut rx = service.subscribe();

    let err = service.generate_ideas(&nb.id).await.unwrap_err();
    assert!(matches!(err, Error::IdeaGeneration(_)));
    assert!(service
        .notebook(&nb.id)
        .await
        .unwrap()
        .content_ideas
        .is_empty());
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, WorkspaceEvent::IdeaGenerationFailed { .. })));
}

#[tokio::test]
async fn test_synthesis_failure_leaves_no_analysis() {
    let service = CampaignService::builder(
        Arc::new(MockGenerationBackend::new().with_failure("upstream 503")),
        Arc::new(MockImageBackend::new()),
    )
    .build();
    let nb = service.create_notebook("Launch", "Summer Swell").await.unwrap();
    service
        .add_files(
            &nb.id,
            vec![IncomingFile::new("a.txt", "text/plain", b"first".to_vec())],
        )
        .await
        .unwrap();

    let err = service.synthesize_research(&nb.id).await.unwrap_err();
    assert!(matches!(err, Error::Synthesis(_)));
    assert!(err.detail().contains("upstream 503"));
    assert!(service
        .notebook(&nb.id)
        .await
        .unwrap()
        .research_analysis
        .is_none());
}

#[tokio::test]
async fn test_visual_failure_is_recorded_on_idea() {
    let service = CampaignService::builder(
        Arc::new(generation()),
        Arc::new(MockImageBackend::new().with_failure("blocked by safety filters")),
    )
    .build();
    let nb = service.create_notebook("Launch", "Summer Swell").await.unwrap();
    service
        .add_files(
            &nb.id,
            vec![IncomingFile::new("a.txt", "text/plain", b"first".to_vec())],
        )
        .await
        .unwrap();
    service.synthesize_research(&nb.id).await.unwrap();
    service.generate_ideas(&nb.id).await.unwrap();

    let outcome = service.generate_visual(&nb.id, "idea-b").await.unwrap();
    assert_eq!(
        outcome,
        VisualOutcome::Failed {
            error: "blocked by safety filters".to_string()
        }
    );

    let idea: ContentIdea = service
        .notebook(&nb.id)
        .await
        .unwrap()
        .idea("idea-b")
        .cloned()
        .unwrap();
    assert!(!idea.is_generating_image);
    assert!(idea.generated_image_url.is_none());
    assert_eq!(
        idea.image_generation_error.as_deref(),
        Some("blocked by safety filters")
    );
}

#[tokio::test]
async fn test_visual_completing_after_idea_deleted_is_orphaned() {
    let service = CampaignService::builder(
        Arc::new(generation()),
        Arc::new(MockImageBackend::new().with_latency_ms(150)),
    )
    .build();
    let nb = service.create_notebook("Launch", "Summer Swell").await.unwrap();
    service
        .add_files(
            &nb.id,
            vec![IncomingFile::new("a.txt", "text/plain", b"first".to_vec())],
        )
        .await
        .unwrap();
    service.synthesize_research(&nb.id).await.unwrap();
    service.generate_ideas(&nb.id).await.unwrap();
    let mut rx = service.subscribe();

    let (outcome, deleted) = tokio::join!(service.generate_visual(&nb.id, "idea-a"), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        service
            .apply_idea_action(&nb.id, IdeaAction::Delete("idea-a".into()))
            .await
    });

    assert!(deleted.unwrap());
    assert_eq!(outcome.unwrap(), VisualOutcome::Orphaned);
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, WorkspaceEvent::VisualOrphaned { .. })));
    assert_eq!(service.notebook(&nb.id).await.unwrap().content_ideas.len(), 1);
}

#[tokio::test]
async fn test_save_failure_is_broadcast_not_fatal() {
    let repo = Arc::new(MemoryRepository::new().with_quota(8));
    let service = CampaignService::builder(
        Arc::new(generation()),
        Arc::new(MockImageBackend::new()),
    )
    .with_repository(repo.clone())
    .build();
    let mut rx = service.subscribe();

    let nb = service.create_notebook("Launch", "Summer Swell").await.unwrap();
    assert_eq!(service.notebooks().await.len(), 1);

    let failures: Vec<String> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            WorkspaceEvent::PersistFailed { error } => Some(error),
            _ => None,
        })
        .collect();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("bytes"));

    assert!(matches!(service.save().await, Err(Error::QuotaExceeded(_))));
    assert!(repo.load().await.unwrap().is_empty());
    assert_eq!(service.notebook(&nb.id).await.unwrap().name, "Launch");
}

#[tokio::test]
async fn test_images_skip_vision_when_disabled() {
    let vision = MockVisionBackend::new();
    let service = CampaignService::builder(
        Arc::new(generation()),
        Arc::new(MockImageBackend::new()),
    )
    .with_vision(Arc::new(vision.clone()))
    .with_pipeline_config(PipelineConfig::default().with_describe_images(false))
    .with_config(ServiceConfig::default().with_idea_count(2))
    .build();
    let nb = service.create_notebook("Launch", "Summer Swell").await.unwrap();

    service
        .add_files(
            &nb.id,
            vec![IncomingFile::new("a.jpg", "image/jpeg", JPEG_BYTES.to_vec())],
        )
        .await
        .unwrap();

    assert!(vision.get_calls().is_empty());
    let file = &service.notebook(&nb.id).await.unwrap().files[0];
    assert_eq!(file.status, FileStatus::Completed);
    assert_eq!(file.processing_error.as_deref(), Some(NO_PROCESSING_NOTE));
}

#[tokio::test]
async fn test_delete_and_reselect_notebooks() {
    let service = CampaignService::builder(
        Arc::new(generation()),
        Arc::new(MockImageBackend::new()),
    )
    .build();
    let first = service.create_notebook("One", "Alpha").await.unwrap();
    let second = service.create_notebook("Two", "Beta").await.unwrap();

    service.select_notebook(&first.id).await.unwrap();
    assert_eq!(service.selected_notebook().await.unwrap().id, first.id);

    service.delete_notebook(&first.id).await.unwrap();
    assert_eq!(service.selected_notebook().await.unwrap().id, second.id);
    assert!(matches!(
        service.select_notebook(&first.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_untyped_png_upload_is_described() {
    let vision = MockVisionBackend::new().with_response("A surfboard rack at dawn.");
    let service = CampaignService::builder(
        Arc::new(generation()),
        Arc::new(MockImageBackend::new()),
    )
    .with_vision(Arc::new(vision.clone()))
    .build();
    let nb = service.create_notebook("Launch", "Summer Swell").await.unwrap();

    // Uploads that arrive without a MIME type get one guessed before intake.
    let declared = AcceptPolicy::default()
        .guess_type("photo.png", PNG_BYTES)
        .unwrap_or_default();
    service
        .add_files(
            &nb.id,
            vec![IncomingFile::new("photo.png", declared, PNG_BYTES.to_vec())],
        )
        .await
        .unwrap();

    assert_eq!(vision.get_calls().len(), 1);
    let file = &service.notebook(&nb.id).await.unwrap().files[0];
    assert_eq!(file.file_type, "image/png");
    assert!(file.preview.is_some());
    assert_eq!(file.status, FileStatus::Completed);
    assert_eq!(
        file.image_analysis.as_deref(),
        Some("A surfboard rack at dawn.")
    );
}

#[tokio::test]
async fn test_sniffing_describes_png_with_empty_type() {
    let vision = MockVisionBackend::new().with_response("Wetsuits drying on a fence.");
    let service = CampaignService::builder(
        Arc::new(generation()),
        Arc::new(MockImageBackend::new()),
    )
    .with_vision(Arc::new(vision.clone()))
    .with_config(ServiceConfig::default().with_sniff_content(true))
    .build();
    let nb = service.create_notebook("Launch", "Summer Swell").await.unwrap();

    service
        .add_files(
            &nb.id,
            vec![IncomingFile::new("photo.png", "", PNG_BYTES.to_vec())],
        )
        .await
        .unwrap();

    assert_eq!(vision.get_calls().len(), 1);
    let file = &service.notebook(&nb.id).await.unwrap().files[0];
    assert_eq!(file.file_type, "image/png");
    assert_eq!(
        file.image_analysis.as_deref(),
        Some("Wetsuits drying on a fence.")
    );
}
