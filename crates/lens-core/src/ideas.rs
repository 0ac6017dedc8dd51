//! Idea list state machine.
//!
//! Every operation is a pure transformation of a notebook's idea list. Pinned
//! and unpinned ideas form two partitions: reordering swaps an idea with its
//! neighbour inside the same partition, so the relative order of the two
//! partitions never mixes.

use crate::defaults::IDEA_ID_PREFIX;
use crate::error::Result;
use crate::models::{new_id, ContentIdea, IdeaColor, IdeaDraft, RefinementPatch};

/// A user action on the idea list.
#[derive(Debug, Clone, PartialEq)]
pub enum IdeaAction {
    ToggleSelect(String),
    TogglePin(String),
    SetColor(String, IdeaColor),
    MoveUp(String),
    MoveDown(String),
    /// Edit an existing idea (`id: Some`) or create a manual one (`id: None`).
    Edit {
        id: Option<String>,
        draft: IdeaDraft,
    },
    Delete(String),
    /// Discard every unselected idea.
    KeepSelected,
    /// Discard every selected idea.
    DiscardSelected,
    UpdateRefinement(String, RefinementPatch),
}

impl IdeaAction {
    /// The idea this action targets, if it targets a single one.
    pub fn target(&self) -> Option<&str> {
        match self {
            IdeaAction::ToggleSelect(id)
            | IdeaAction::TogglePin(id)
            | IdeaAction::SetColor(id, _)
            | IdeaAction::MoveUp(id)
            | IdeaAction::MoveDown(id)
            | IdeaAction::Delete(id)
            | IdeaAction::UpdateRefinement(id, _) => Some(id),
            IdeaAction::Edit { id, .. } => id.as_deref(),
            IdeaAction::KeepSelected | IdeaAction::DiscardSelected => None,
        }
    }
}

/// Apply an action. Returns `Ok(false)` when nothing changed (unknown id,
/// disabled move, no matching ideas).
pub fn apply_idea_action(ideas: &mut Vec<ContentIdea>, action: IdeaAction) -> Result<bool> {
    let changed = match action {
        IdeaAction::ToggleSelect(id) => with_idea(ideas, &id, |idea| {
            idea.is_selected = !idea.is_selected;
        }),
        IdeaAction::TogglePin(id) => with_idea(ideas, &id, |idea| {
            idea.is_pinned = !idea.is_pinned;
        }),
        IdeaAction::SetColor(id, color) => with_idea(ideas, &id, |idea| idea.color = color),
        IdeaAction::MoveUp(id) => move_idea(ideas, &id, Direction::Up),
        IdeaAction::MoveDown(id) => move_idea(ideas, &id, Direction::Down),
        IdeaAction::Edit { id: Some(id), draft } => {
            let draft = draft.validated()?;
            with_idea(ideas, &id, |idea| draft.merge_into(idea))
        }
        IdeaAction::Edit { id: None, draft } => {
            let draft = draft.validated()?;
            ideas.push(draft.into_manual_idea(new_id(IDEA_ID_PREFIX)));
            true
        }
        IdeaAction::Delete(id) => retain_changed(ideas, |idea| idea.id != id),
        IdeaAction::KeepSelected => retain_changed(ideas, |idea| idea.is_selected),
        IdeaAction::DiscardSelected => retain_changed(ideas, |idea| !idea.is_selected),
        IdeaAction::UpdateRefinement(id, patch) => {
            with_idea(ideas, &id, |idea| idea.refinement.apply(patch))
        }
    };
    Ok(changed)
}

fn with_idea(ideas: &mut [ContentIdea], id: &str, f: impl FnOnce(&mut ContentIdea)) -> bool {
    match ideas.iter_mut().find(|i| i.id == id) {
        Some(idea) => {
            f(idea);
            true
        }
        None => false,
    }
}

fn retain_changed(ideas: &mut Vec<ContentIdea>, keep: impl FnMut(&ContentIdea) -> bool) -> bool {
    let before = ideas.len();
    ideas.retain(keep);
    ideas.len() != before
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

/// Index of the neighbour in the same pin partition.
fn neighbour(ideas: &[ContentIdea], id: &str, direction: Direction) -> Option<(usize, usize)> {
    let index = ideas.iter().position(|i| i.id == id)?;
    let pinned = ideas[index].is_pinned;
    let other = match direction {
        Direction::Up => ideas[..index].iter().rposition(|i| i.is_pinned == pinned),
        Direction::Down => ideas[index + 1..]
            .iter()
            .position(|i| i.is_pinned == pinned)
            .map(|offset| index + 1 + offset),
    }?;
    Some((index, other))
}

fn move_idea(ideas: &mut [ContentIdea], id: &str, direction: Direction) -> bool {
    match neighbour(ideas, id, direction) {
        Some((index, other)) => {
            ideas.swap(index, other);
            true
        }
        None => false,
    }
}

/// Whether "move up" is enabled for this idea.
pub fn can_move_up(ideas: &[ContentIdea], id: &str) -> bool {
    neighbour(ideas, id, Direction::Up).is_some()
}

/// Whether "move down" is enabled for this idea.
pub fn can_move_down(ideas: &[ContentIdea], id: &str) -> bool {
    neighbour(ideas, id, Direction::Down).is_some()
}

/// Split into (pinned, unpinned), each in list order.
pub fn partition(ideas: &[ContentIdea]) -> (Vec<&ContentIdea>, Vec<&ContentIdea>) {
    ideas.iter().partition(|i| i.is_pinned)
}
