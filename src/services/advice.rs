//! Prompt templates and post-processing for generated advice.

/// Maximum number of recommendations returned to the client.
const MAX_RECOMMENDATIONS: usize = 3;

/// Lines at or below this length are treated as headers/noise, not advice.
const MIN_LINE_LENGTH: usize = 10;

/// Generic advice returned when generation yields nothing usable.
pub const DEFAULT_RECOMMENDATIONS: [&str; 3] = [
    "Monitor the affected plants closely for any changes in symptoms.",
    "Consult with a local agricultural extension office for specific treatment options.",
    "Document the damage with photos for insurance or record-keeping purposes.",
];

/// Prompt for the low-confidence vision fallback.
pub fn vision_fallback_prompt(crop_type: &str) -> String {
    format!(
        "Analyze this image of a {} leaf. What is the specific agricultural damage \
         or disease (like 'Hail Damage', 'Rust', 'Aphids', 'Drought')? Respond with \
         only the name of the damage or 'Unknown'.",
        crop_type
    )
}

/// Clean a free-text damage label coming back from the vision model.
pub fn clean_vision_label(raw: &str) -> String {
    raw.trim().replace("Looks like ", "")
}

/// Prompt asking for severity-aware agronomist advice.
pub fn recommendation_prompt(crop_type: &str, damage_type: &str, severity: f64) -> String {
    format!(
        "Act as an expert agronomist.\n\
         My '{}' plant has been diagnosed with '{}' at a **severity of {:.1}%**.\n\
         \n\
         In simple, practical terms for a farmer, what does this mean and what are \
         the top 3 actionable steps I should take right now, **considering this \
         severity level**?\n\
         \n\
         Be concise and use bullet points for the steps. Do not include markdown \
         formatting.",
        crop_type, damage_type, severity
    )
}

/// Extract up to 3 advisory lines from generated text.
///
/// Bullet markers and list numbering are stripped; short leftovers (headers,
/// stray punctuation) are discarded. An empty result falls back to
/// [`DEFAULT_RECOMMENDATIONS`].
pub fn parse_recommendations(text: &str) -> Vec<String> {
    let recommendations: Vec<String> = text
        .lines()
        .map(str::trim)
        .map(|line| {
            line.trim_start_matches(|c: char| {
                matches!(c, '•' | '-' | '*' | '.' | ' ') || c.is_ascii_digit()
            })
        })
        .map(str::trim)
        .filter(|line| line.len() > MIN_LINE_LENGTH)
        .take(MAX_RECOMMENDATIONS)
        .map(str::to_string)
        .collect();

    if recommendations.is_empty() {
        DEFAULT_RECOMMENDATIONS
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bulleted_lines() {
        let text = "Here is what you should do:\n\
                    • Apply a copper-based fungicide within 48 hours.\n\
                    - Remove and destroy the worst-affected leaves.\n\
                    * Improve air circulation between rows.\n\
                    1. Re-check the field after the next rainfall.";
        let recs = parse_recommendations(text);
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0], "Here is what you should do:");
        assert_eq!(recs[1], "Apply a copper-based fungicide within 48 hours.");
        assert_eq!(recs[2], "Remove and destroy the worst-affected leaves.");
    }

    #[test]
    fn short_lines_are_discarded() {
        let text = "Steps:\n• Spray.\n• Water the crop early in the morning to reduce stress.";
        let recs = parse_recommendations(text);
        assert_eq!(
            recs,
            vec!["Water the crop early in the morning to reduce stress."]
        );
    }

    #[test]
    fn empty_text_falls_back_to_defaults() {
        let recs = parse_recommendations("");
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0], DEFAULT_RECOMMENDATIONS[0]);
    }

    #[test]
    fn unusable_text_falls_back_to_defaults() {
        let recs = parse_recommendations("ok\n- yes\n123\n•••");
        assert_eq!(recs.len(), 3);
        assert_eq!(recs, DEFAULT_RECOMMENDATIONS.to_vec());
    }

    #[test]
    fn never_returns_more_than_three() {
        let text = (1..10)
            .map(|i| format!("- Recommendation number {} with enough detail to keep.", i))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(parse_recommendations(&text).len(), 3);
    }

    #[test]
    fn vision_label_cleanup_strips_prefix() {
        assert_eq!(clean_vision_label("  Looks like Rust \n"), "Rust");
        assert_eq!(clean_vision_label("Drought"), "Drought");
    }

    #[test]
    fn recommendation_prompt_embeds_context() {
        let prompt = recommendation_prompt("Tomato", "Rust", 61.25);
        assert!(prompt.contains("'Tomato'"));
        assert!(prompt.contains("'Rust'"));
        assert!(prompt.contains("severity of 61.2%"));
    }
}
