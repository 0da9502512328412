// src/ai/prompts.rs
//! Prompt templates. Pure functions, no failure modes.

use super::AiOutcome;
use crate::utils::render_template;
use std::collections::HashMap;

pub const PROFILE_PROMPT_TEMPLATE: &str = "\nSummarize the following LinkedIn profile into JSON with keys strengths[], tone, niche, voice. Be concise. Text: <<<{{text}}>>>\n";

pub const TRENDS_PROMPT_TEMPLATE: &str = "\nFrom the text below, extract 3-5 concise, non-generic insights as a JSON array 'insights'. Keep each <= 18 words. Text: <<<{{text}}>>>\n";

pub const IMAGE_PROMPT_TEMPLATE: &str = "\nAnalyze the image and provide a concise description and a list of relevant tags in JSON format with keys 'description' and 'tags[]'.\n";

pub const POST_PROMPT_TEMPLATE: &str = "\nUsing the provided information, write a LinkedIn post (<= 200 words) in a professional, friendly tone. End with a short CTA. Return JSON with keys post, hashtags[5-8 relevant tags].\n\nProfile Summary: <<<{{profile_summary}}>>>\nTrend Insights: <<<{{trend_insights}}>>>\nImage Analysis: <<<{{image_analysis}}>>>\n";

pub const MANUAL_CONTEXT_TEMPLATE: &str = "Additional Context: <<<{{manual_context}}>>>\n";

pub const NO_IMAGE_ANALYSIS: &str = "No image analysis provided.";

pub fn build_profile_prompt(text: &str) -> String {
    render_template(PROFILE_PROMPT_TEMPLATE, &HashMap::from([("text", text.to_string())]))
}

pub fn build_trends_prompt(text: &str) -> String {
    render_template(TRENDS_PROMPT_TEMPLATE, &HashMap::from([("text", text.to_string())]))
}

pub fn build_image_prompt() -> String {
    IMAGE_PROMPT_TEMPLATE.to_string()
}

/// Composite prompt; a missing or empty image analysis becomes a placeholder sentence
pub fn build_post_prompt(
    profile_summary: &AiOutcome,
    trend_insights: &AiOutcome,
    image_analysis: Option<&AiOutcome>,
    manual_context: Option<&str>,
) -> String {
    let image_json = match image_analysis {
        Some(analysis) if !analysis.is_empty() => analysis.to_json().to_string(),
        _ => NO_IMAGE_ANALYSIS.to_string(),
    };

    let vars = HashMap::from([
        ("profile_summary", profile_summary.to_json().to_string()),
        ("trend_insights", trend_insights.to_json().to_string()),
        ("image_analysis", image_json),
    ]);
    let mut prompt = render_template(POST_PROMPT_TEMPLATE, &vars);

    if let Some(context) = manual_context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str(&render_template(
            MANUAL_CONTEXT_TEMPLATE,
            &HashMap::from([("manual_context", context.to_string())]),
        ));
    }

    prompt
}
