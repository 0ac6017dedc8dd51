//! Persistence snapshot format.
//!
//! The records here are what a [`NotebookRepository`](crate::NotebookRepository)
//! stores. Transient state never reaches them: file bytes, previews, extracted
//! text, image analysis and progress messages are dropped from files, and the
//! in-flight flag and last error are dropped from ideas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::defaults::{IDEA_ID_PREFIX, PROCESSING_INTERRUPTED};
use crate::models::{
    new_id, ContentIdea, FileStatus, IdeaColor, Notebook, ParameterSettings,
    RefinementParameters, UploadedFile,
};
use crate::workspace::Workspace;

/// Stored form of an [`UploadedFile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub file_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub status: FileStatus,
    #[serde(default)]
    pub processing_error: Option<String>,
}

/// Stored form of a [`ContentIdea`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub post_text: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub visual_concept_prompt: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub is_selected: bool,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_manual: bool,
    #[serde(default)]
    pub generated_image_url: Option<String>,
    #[serde(default)]
    pub color: IdeaColor,
    #[serde(default)]
    pub refinement: Option<RefinementParameters>,
}

/// Stored form of a [`Notebook`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookRecord {
    pub id: String,
    pub name: String,
    pub campaign_name: String,
    #[serde(default)]
    pub files: Vec<FileRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub parameters: Option<ParameterSettings>,
    #[serde(default)]
    pub content_ideas: Vec<IdeaRecord>,
    #[serde(default)]
    pub research_analysis: Option<String>,
}

/// Everything the repository persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub notebooks: Vec<NotebookRecord>,
    #[serde(default)]
    pub selected_notebook_id: Option<String>,
}

/// Accept either `"#one"` or `["#one", "#two"]`.
fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(tag) => vec![tag],
        OneOrMany::Many(tags) => tags,
        OneOrMany::Null(()) => Vec::new(),
    })
}

impl From<&UploadedFile> for FileRecord {
    fn from(file: &UploadedFile) -> Self {
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
            file_type: file.file_type.clone(),
            size: file.size,
            status: file.status,
            processing_error: file.processing_error.clone(),
        }
    }
}

impl FileRecord {
    /// Rebuild the file. Bytes are gone, so an unfinished file can never be
    /// processed again and is restored as failed.
    pub fn restore(self) -> UploadedFile {
        let (status, processing_error) = if self.status.is_terminal() {
            (self.status, self.processing_error)
        } else {
            (FileStatus::Error, Some(PROCESSING_INTERRUPTED.to_string()))
        };
        UploadedFile {
            id: self.id,
            name: self.name,
            file_type: self.file_type,
            size: self.size,
            content: None,
            preview: None,
            status,
            extracted_text: None,
            image_analysis: None,
            processing_error,
            progress: None,
        }
    }
}

impl From<&ContentIdea> for IdeaRecord {
    fn from(idea: &ContentIdea) -> Self {
        Self {
            id: Some(idea.id.clone()),
            post_text: idea.post_text.clone(),
            platform: idea.platform.clone(),
            content_type: idea.content_type.clone(),
            visual_concept_prompt: idea.visual_concept_prompt.clone(),
            hashtags: idea.hashtags.clone(),
            is_selected: idea.is_selected,
            is_pinned: idea.is_pinned,
            is_manual: idea.is_manual,
            generated_image_url: idea.generated_image_url.clone(),
            color: idea.color,
            refinement: Some(idea.refinement.clone()),
        }
    }
}

impl IdeaRecord {
    pub fn restore(self) -> ContentIdea {
        ContentIdea {
            id: self.id.unwrap_or_else(|| new_id(IDEA_ID_PREFIX)),
            post_text: self.post_text,
            platform: self.platform,
            content_type: self.content_type,
            visual_concept_prompt: self.visual_concept_prompt,
            hashtags: self.hashtags,
            is_selected: self.is_selected,
            is_pinned: self.is_pinned,
            is_manual: self.is_manual,
            generated_image_url: self.generated_image_url,
            image_generation_error: None,
            is_generating_image: false,
            color: self.color,
            refinement: self.refinement.unwrap_or_default(),
        }
    }
}

impl From<&Notebook> for NotebookRecord {
    fn from(nb: &Notebook) -> Self {
        Self {
            id: nb.id.clone(),
            name: nb.name.clone(),
            campaign_name: nb.campaign_name.clone(),
            files: nb.files.iter().map(FileRecord::from).collect(),
            created_at: nb.created_at,
            updated_at: nb.updated_at,
            parameters: Some(nb.parameters),
            content_ideas: nb.content_ideas.iter().map(IdeaRecord::from).collect(),
            research_analysis: nb.research_analysis.clone(),
        }
    }
}

impl NotebookRecord {
    pub fn restore(self) -> Notebook {
        Notebook {
            id: self.id,
            name: self.name,
            campaign_name: self.campaign_name,
            files: self.files.into_iter().map(FileRecord::restore).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            parameters: self.parameters.unwrap_or_default(),
            content_ideas: self
                .content_ideas
                .into_iter()
                .map(IdeaRecord::restore)
                .collect(),
            research_analysis: self.research_analysis,
        }
    }
}

impl From<&Workspace> for StoreSnapshot {
    fn from(ws: &Workspace) -> Self {
        Self {
            notebooks: ws.notebooks.iter().map(NotebookRecord::from).collect(),
            selected_notebook_id: ws.selected_notebook_id.clone(),
        }
    }
}

impl StoreSnapshot {
    /// Rebuild the workspace. A selection pointing at a missing notebook is dropped.
    pub fn restore(self) -> Workspace {
        let notebooks: Vec<Notebook> = self
            .notebooks
            .into_iter()
            .map(NotebookRecord::restore)
            .collect();
        let selected_notebook_id = self
            .selected_notebook_id
            .filter(|id| notebooks.iter().any(|nb| &nb.id == id));
        Workspace {
            notebooks,
            selected_notebook_id,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notebooks.is_empty()
    }
}
