//! Workspace reducer.
//!
//! [`Notebook::apply`] is the only way notebook state changes. It stamps
//! `updated_at` and performs every derived reset, so callers never have to
//! remember that new files invalidate the analysis or that new parameters
//! invalidate the ideas.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ideas::{apply_idea_action, IdeaAction};
use crate::models::{ContentIdea, FilePatch, Notebook, ParameterPatch, UploadedFile, VisualPatch};

/// A state change for one notebook.
#[derive(Debug, Clone)]
pub enum NotebookUpdate {
    AddFiles(Vec<UploadedFile>),
    RemoveFile(String),
    UpdateFile { file_id: String, patch: FilePatch },
    UpdateParameters(ParameterPatch),
    SetResearchAnalysis(Option<String>),
    SetIdeas(Vec<ContentIdea>),
    Ideas(IdeaAction),
    UpdateVisual { idea_id: String, patch: VisualPatch },
}

impl NotebookUpdate {
    /// Short operation name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            NotebookUpdate::AddFiles(_) => "add_files",
            NotebookUpdate::RemoveFile(_) => "remove_file",
            NotebookUpdate::UpdateFile { .. } => "update_file",
            NotebookUpdate::UpdateParameters(_) => "update_parameters",
            NotebookUpdate::SetResearchAnalysis(_) => "set_research_analysis",
            NotebookUpdate::SetIdeas(_) => "set_ideas",
            NotebookUpdate::Ideas(_) => "idea_action",
            NotebookUpdate::UpdateVisual { .. } => "update_visual",
        }
    }
}

impl Notebook {
    /// Apply an update.
    ///
    /// Returns `Ok(false)` when the update had no target (unknown file or idea)
    /// or changed nothing; `updated_at` is only stamped on real changes.
    pub fn apply(&mut self, update: NotebookUpdate) -> Result<bool> {
        let changed = match update {
            NotebookUpdate::AddFiles(files) => {
                if files.is_empty() {
                    false
                } else {
                    self.files.extend(files);
                    self.invalidate_analysis();
                    true
                }
            }
            NotebookUpdate::RemoveFile(file_id) => {
                let before = self.files.len();
                self.files.retain(|f| f.id != file_id);
                if self.files.len() == before {
                    false
                } else {
                    self.invalidate_analysis();
                    true
                }
            }
            NotebookUpdate::UpdateFile { file_id, patch } => {
                match self.files.iter_mut().find(|f| f.id == file_id) {
                    Some(file) => {
                        file.apply(patch)?;
                        true
                    }
                    None => false,
                }
            }
            NotebookUpdate::UpdateParameters(patch) => {
                let changed = self.parameters.apply(patch);
                if changed {
                    self.content_ideas.clear();
                }
                changed
            }
            NotebookUpdate::SetResearchAnalysis(analysis) => {
                self.research_analysis = analysis;
                self.content_ideas.clear();
                true
            }
            NotebookUpdate::SetIdeas(ideas) => {
                self.content_ideas = ideas;
                true
            }
            NotebookUpdate::Ideas(action) => apply_idea_action(&mut self.content_ideas, action)?,
            NotebookUpdate::UpdateVisual { idea_id, patch } => {
                match self.content_ideas.iter_mut().find(|i| i.id == idea_id) {
                    Some(idea) => {
                        idea.apply_visual(patch);
                        true
                    }
                    None => false,
                }
            }
        };

        if changed {
            self.updated_at = Utc::now();
        }
        Ok(changed)
    }

    fn invalidate_analysis(&mut self) {
        self.research_analysis = None;
        self.content_ideas.clear();
    }
}

/// All notebooks plus the current selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workspace {
    pub notebooks: Vec<Notebook>,
    pub selected_notebook_id: Option<String>,
}

impl Workspace {
    /// Create a notebook with default parameters and select it.
    pub fn create_notebook(&mut self, name: &str, campaign_name: &str) -> Result<&Notebook> {
        let name = name.trim();
        let campaign_name = campaign_name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Notebook name is required.".to_string()));
        }
        if campaign_name.is_empty() {
            return Err(Error::InvalidInput("Campaign name is required.".to_string()));
        }

        let notebook = Notebook::new(name, campaign_name);
        self.selected_notebook_id = Some(notebook.id.clone());
        self.notebooks.push(notebook);
        let index = self.notebooks.len() - 1;
        Ok(&self.notebooks[index])
    }

    pub fn select_notebook(&mut self, id: &str) -> Result<()> {
        if self.notebook(id).is_none() {
            return Err(Error::NotFound(format!("Notebook {}", id)));
        }
        self.selected_notebook_id = Some(id.to_string());
        Ok(())
    }

    /// Delete a notebook and its children. When it was selected, the first
    /// remaining notebook becomes selected.
    pub fn delete_notebook(&mut self, id: &str) -> Result<Notebook> {
        let index = self
            .notebooks
            .iter()
            .position(|nb| nb.id == id)
            .ok_or_else(|| Error::NotFound(format!("Notebook {}", id)))?;
        let removed = self.notebooks.remove(index);

        if self.selected_notebook_id.as_deref() == Some(id) {
            self.selected_notebook_id = self.notebooks.first().map(|nb| nb.id.clone());
        }
        Ok(removed)
    }

    pub fn notebook(&self, id: &str) -> Option<&Notebook> {
        self.notebooks.iter().find(|nb| nb.id == id)
    }

    pub fn notebook_mut(&mut self, id: &str) -> Option<&mut Notebook> {
        self.notebooks.iter_mut().find(|nb| nb.id == id)
    }

    pub fn selected_notebook(&self) -> Option<&Notebook> {
        self.selected_notebook_id
            .as_deref()
            .and_then(|id| self.notebook(id))
    }

    /// Apply an update to a notebook. `Ok(false)` when the notebook is gone.
    pub fn update(&mut self, notebook_id: &str, update: NotebookUpdate) -> Result<bool> {
        match self.notebook_mut(notebook_id) {
            Some(notebook) => notebook.apply(update),
            None => Ok(false),
        }
    }
}
