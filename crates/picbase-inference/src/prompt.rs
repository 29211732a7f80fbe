//! Prompt construction for image annotation.

use picbase_core::AnnotationContext;

/// Instruction sent with every image.
pub const ANNOTATION_PROMPT: &str = "Analyze this image and respond with a single JSON object \
and nothing else. Use exactly these keys:
- \"title\": a short title of at most eight words
- \"description\": two or three sentences describing the key objects, people, activities or \
scene, including notable colors and composition
- \"caption\": one short sentence suitable as a caption
- \"categories\": 1 to 5 broad lowercase categories such as nature, people, animal, food, \
technology, vehicle, building, art, sport, indoor, outdoor
- \"tags\": 3 to 8 specific lowercase keywords";

/// Build the full prompt, appending any user-provided context.
pub fn build_prompt(context: &AnnotationContext) -> String {
    let mut prompt = ANNOTATION_PROMPT.to_string();

    if let Some(description) = non_blank(context.description.as_deref()) {
        prompt.push_str("\n\nAdditional context provided by user: ");
        prompt.push_str(description);
    }
    if let Some(link) = non_blank(context.link.as_deref()) {
        prompt.push_str("\n\nRelated link context: ");
        prompt.push_str(link);
    }
    prompt
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
