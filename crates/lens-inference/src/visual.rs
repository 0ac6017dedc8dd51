//! Visual prompt composition.

use lens_core::{ContentIdea, VisualStyle};

/// Compose the final image prompt for an idea.
///
/// A non-blank override replaces the base prompt and every refinement.
/// Otherwise non-default lighting and scenery plus any storyboard notes are
/// appended to the base prompt. The notebook's visual style always closes the
/// prompt.
pub fn compose_visual_prompt(idea: &ContentIdea, visual_style: VisualStyle) -> String {
    let refinement = &idea.refinement;

    let mut prompt = match refinement.prompt_override() {
        Some(custom) => custom.to_string(),
        None => {
            let mut parts = Vec::new();
            if let Some(lighting) = refinement.effective_lighting() {
                parts.push(format!("lighting: {}", lighting));
            }
            if let Some(scenery) = refinement.effective_scenery() {
                parts.push(format!("scenery: {}", scenery));
            }
            if !refinement.storyboard_notes.is_empty() {
                parts.push(format!("details: {}", refinement.storyboard_notes));
            }

            if parts.is_empty() {
                idea.visual_concept_prompt.clone()
            } else {
                format!("{}, {}", idea.visual_concept_prompt, parts.join(", "))
            }
        }
    };

    prompt.push_str(", visual style: ");
    prompt.push_str(visual_style.label());
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea() -> ContentIdea {
        ContentIdea::generated("idea-1", "text", "Instagram", "Post", "a cozy cafe", vec![])
    }

    #[test]
    fn test_defaults_add_only_style() {
        assert_eq!(
            compose_visual_prompt(&idea(), VisualStyle::Bold),
            "a cozy cafe, visual style: Bold"
        );
    }

    #[test]
    fn test_refinements_are_appended_in_order() {
        let mut idea = idea();
        idea.refinement.lighting = "Golden Hour".to_string();
        idea.refinement.scenery = "Urban Street".to_string();
        idea.refinement.storyboard_notes = "steam rising from cups".to_string();
        assert_eq!(
            compose_visual_prompt(&idea, VisualStyle::Natural),
            "a cozy cafe, lighting: Golden Hour, scenery: Urban Street, details: steam rising from cups, visual style: Natural"
        );
    }

    #[test]
    fn test_custom_choices_are_skipped() {
        let mut idea = idea();
        idea.refinement.lighting = "Custom".to_string();
        idea.refinement.scenery = "Lush Forest".to_string();
        assert_eq!(
            compose_visual_prompt(&idea, VisualStyle::Minimalist),
            "a cozy cafe, scenery: Lush Forest, visual style: Minimalist"
        );
    }

    #[test]
    fn test_override_ignores_refinements() {
        let mut idea = idea();
        idea.refinement.lighting = "Neon Glow".to_string();
        idea.refinement.storyboard_notes = "rain".to_string();
        idea.refinement.custom_prompt_override = "  neon cityscape, wide shot ".to_string();
        assert_eq!(
            compose_visual_prompt(&idea, VisualStyle::Futuristic),
            "neon cityscape, wide shot, visual style: Futuristic"
        );
    }
}
