// src/web/services.rs
//! Request-independent workflows behind the route handlers.

use crate::ai::prompts::{
    build_image_prompt, build_post_prompt, build_profile_prompt, build_trends_prompt,
};
use crate::ai::{AiOutcome, PromptPart, SharedAi, StructuredAi};
use crate::core::database::{DraftStore, Post};
use crate::linkedin::{describe_member, person_urn, LinkedInApi, SharedLinkedIn};
use crate::state::BufferedImage;
use crate::utils::topic_from_text;
use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

pub const MISSING_ANALYSIS_ERROR: &str =
    "Please analyze a profile and trends before generating a post.";
pub const TOPIC_MAX_CHARS: usize = 200;

pub async fn analyze_profile(ai: &dyn StructuredAi, text: &str) -> AiOutcome {
    ai.generate_json(vec![PromptPart::text(build_profile_prompt(text))])
        .await
}

/// Run the trends prompt; a successful analysis also records the topic
pub async fn analyze_trends(
    ai: &dyn StructuredAi,
    store: &DraftStore,
    text: &str,
    source_url: Option<&str>,
) -> AiOutcome {
    let outcome = ai
        .generate_json(vec![PromptPart::text(build_trends_prompt(text))])
        .await;

    if outcome.is_success() {
        let topic = topic_from_text(text, TOPIC_MAX_CHARS);
        let source_url = source_url.map(str::trim).unwrap_or_default();
        if !topic.is_empty() {
            match store.insert_trend(&topic, source_url).await {
                Ok(true) => info!("Recorded trend '{}'", topic),
                Ok(false) => info!("Trend '{}' already recorded", topic),
                Err(e) => warn!("Could not record trend '{}': {:#}", topic, e),
            }
        }
    }

    outcome
}

/// Image parts first, then the fixed prompt text
pub async fn analyze_images(ai: &dyn StructuredAi, images: &[BufferedImage]) -> AiOutcome {
    let mut parts: Vec<PromptPart> = images
        .iter()
        .map(|image| PromptPart::Image {
            mime_type: image.mime_type.clone(),
            data: image.data.clone(),
        })
        .collect();
    parts.push(PromptPart::text(build_image_prompt()));

    ai.generate_json(parts).await
}

pub async fn generate_post(
    ai: &dyn StructuredAi,
    profile_summary: Option<&AiOutcome>,
    trend_insights: Option<&AiOutcome>,
    image_analysis: Option<&AiOutcome>,
    manual_context: Option<&str>,
) -> AiOutcome {
    // An empty `{}` analysis counts as missing
    let profile_summary = profile_summary.filter(|o| !o.is_empty());
    let trend_insights = trend_insights.filter(|o| !o.is_empty());
    let (Some(profile), Some(trends)) = (profile_summary, trend_insights) else {
        info!("Post generation requested before profile and trends were analyzed");
        return AiOutcome::error_with_raw(MISSING_ANALYSIS_ERROR, "");
    };

    let prompt = build_post_prompt(profile, trends, image_analysis, manual_context);
    ai.generate_json(vec![PromptPart::text(prompt)]).await
}

/// `(content, hashtags)` when the generated post has the savable shape
pub fn savable_post(outcome: &AiOutcome) -> Option<(String, String)> {
    let value = outcome.as_success()?;
    let content = value.get("post")?.as_str()?;
    let hashtags = value
        .get("hashtags")?
        .as_array()?
        .iter()
        .map(|tag| match tag {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ");

    Some((content.to_string(), hashtags))
}

/// Insert the generated post as a draft; `None` when there was nothing to save
pub async fn save_generated_post(
    store: &DraftStore,
    generated: Option<&AiOutcome>,
) -> Result<Option<i64>> {
    let Some((content, hashtags)) = generated.and_then(savable_post) else {
        warn!("No valid generated post to save");
        return Ok(None);
    };

    let id = store.insert_post(&content, &hashtags).await?;
    Ok(Some(id))
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShareOutcome {
    Published(Value),
    ImageUploadFailed(String),
    PublishFailed(String),
}

impl ShareOutcome {
    /// Dashboard URL carrying the result flags
    pub fn redirect_target(&self) -> &'static str {
        match self {
            ShareOutcome::Published(_) => "/?linkedin_success=true",
            ShareOutcome::ImageUploadFailed(_) => "/?linkedin_error=true&image_upload_error=true",
            ShareOutcome::PublishFailed(_) => "/?linkedin_error=true",
        }
    }
}

/// Upload every buffered image, then publish. The post is marked posted only
/// when the provider accepted it; store errors are the only `Err`.
pub async fn share_post(
    store: &DraftStore,
    linkedin: &dyn LinkedInApi,
    access_token: &str,
    post: &Post,
    images: &[BufferedImage],
) -> Result<ShareOutcome> {
    let author = match linkedin.person_urn(access_token).await {
        Ok(urn) => urn,
        Err(e) => {
            warn!("Could not resolve LinkedIn member for post {}: {:#}", post.id, e);
            return Ok(ShareOutcome::PublishFailed(format!("{:#}", e)));
        }
    };

    let mut media_urns = Vec::with_capacity(images.len());
    for (index, image) in images.iter().enumerate() {
        match linkedin
            .upload_image(access_token, &author, &image.data, &image.mime_type)
            .await
        {
            Ok(urn) => media_urns.push(urn),
            Err(e) => {
                warn!(
                    "Image {} of {} failed to upload for post {}: {:#}",
                    index + 1,
                    images.len(),
                    post.id,
                    e
                );
                return Ok(ShareOutcome::ImageUploadFailed(format!("{:#}", e)));
            }
        }
    }

    let response = match linkedin
        .publish_post(access_token, &author, &post.content, &media_urns)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!("LinkedIn rejected post {}: {:#}", post.id, e);
            return Ok(ShareOutcome::PublishFailed(format!("{:#}", e)));
        }
    };

    store
        .mark_posted(post.id)
        .await
        .with_context(|| format!("Post {} was published but could not be marked", post.id))?;
    info!("Post {} shared with {} image(s)", post.id, media_urns.len());

    Ok(ShareOutcome::Published(response))
}

/// Background enrichment after login. Resolves the member, summarizes them with
/// the profile prompt and stores the summary. Returns the member URN.
pub async fn enrich_profile(
    ai: SharedAi,
    linkedin: SharedLinkedIn,
    store: DraftStore,
    access_token: String,
) -> Result<Option<String>> {
    let info = linkedin
        .userinfo(&access_token)
        .await
        .context("Failed to fetch LinkedIn userinfo")?;
    let user_id = person_urn(&info.sub);

    let details = match linkedin.profile(&access_token).await {
        Ok(details) => Some(details),
        Err(e) => {
            warn!("Profile details unavailable for {}: {:#}", user_id, e);
            None
        }
    };

    let description = describe_member(&info, details.as_ref());
    if description.trim().is_empty() {
        anyhow::bail!("LinkedIn returned no profile fields for {}", user_id);
    }

    match analyze_profile(ai.as_ref(), &description).await {
        AiOutcome::Success(summary) => {
            store.upsert_user_profile(&user_id, &summary).await?;
            info!("Stored profile summary for {}", user_id);
            Ok(Some(user_id))
        }
        AiOutcome::Failure { error, .. } => {
            anyhow::bail!("Profile analysis failed for {}: {}", user_id, error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::FakeAi;
    use crate::core::database::tests::temp_store;
    use crate::core::database::PostStatus;
    use crate::linkedin::testing::FakeLinkedIn;
    use serde_json::json;
    use std::sync::Arc;

    fn generated() -> AiOutcome {
        AiOutcome::Success(json!({
            "post": "Rust in production, one year in.",
            "hashtags": ["#rust", "#backend"]
        }))
    }

    fn image(mime: &str) -> BufferedImage {
        BufferedImage {
            data: vec![1, 2, 3],
            mime_type: mime.to_string(),
        }
    }

    async fn saved_post(store: &DraftStore) -> Post {
        let id = store.insert_post("Hello network", "#hello").await.unwrap();
        store.get_post(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_generate_requires_profile_and_trends() {
        let ai = FakeAi::returning(generated());
        let trends = AiOutcome::Success(json!({"insights": ["ai"]}));

        let outcome = generate_post(&ai, None, Some(&trends), None, None).await;

        assert_eq!(
            outcome.to_json(),
            json!({"error": MISSING_ANALYSIS_ERROR, "raw_response": ""})
        );
        assert_eq!(ai.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_treats_empty_analysis_as_missing() {
        let ai = FakeAi::returning(generated());
        let profile = AiOutcome::Success(json!({}));
        let trends = AiOutcome::Success(json!({"insights": ["ai"]}));

        let outcome = generate_post(&ai, Some(&profile), Some(&trends), None, None).await;

        assert_eq!(outcome.as_success(), None);
        assert_eq!(
            outcome.to_json(),
            json!({"error": MISSING_ANALYSIS_ERROR, "raw_response": ""})
        );
        assert_eq!(ai.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_builds_composite_prompt() {
        let ai = FakeAi::returning(generated());
        let profile = AiOutcome::Success(json!({"tone": "direct"}));
        let trends = AiOutcome::Success(json!({"insights": ["ai"]}));

        let outcome = generate_post(&ai, Some(&profile), Some(&trends), None, Some("launch week")).await;

        assert_eq!(outcome, generated());
        assert_eq!(ai.call_count(), 1);
        let prompts = ai.prompts.lock().unwrap();
        let PromptPart::Text(prompt) = &prompts[0][0] else {
            panic!("expected a text prompt");
        };
        assert!(prompt.contains("\"tone\":\"direct\""));
        assert!(prompt.contains("launch week"));
    }

    #[tokio::test]
    async fn test_image_parts_precede_prompt() {
        let ai = FakeAi::returning(AiOutcome::Success(json!({"description": "a desk"})));

        analyze_images(&ai, &[image("image/png"), image("image/jpeg")]).await;

        let prompts = ai.prompts.lock().unwrap();
        let parts = &prompts[0];
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], PromptPart::Image { mime_type, .. } if mime_type == "image/png"));
        assert!(matches!(&parts[1], PromptPart::Image { mime_type, .. } if mime_type == "image/jpeg"));
        assert!(matches!(&parts[2], PromptPart::Text(_)));
    }

    #[tokio::test]
    async fn test_trend_recorded_only_on_success() {
        let store = temp_store().await;

        let ok = FakeAi::returning(AiOutcome::Success(json!({"insights": []})));
        analyze_trends(&ok, &store, "Agents everywhere\nmore detail", Some("https://a.example")).await;
        analyze_trends(&ok, &store, "Agents everywhere\nmore detail", Some("https://a.example")).await;

        let failing = FakeAi::returning(AiOutcome::error("quota"));
        analyze_trends(&failing, &store, "Ignored topic", None).await;

        let trends = store.list_trends(10).await.unwrap();
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].topic, "Agents everywhere");
        assert_eq!(trends[0].source_url, "https://a.example");
    }

    #[test]
    fn test_savable_post_shape() {
        assert_eq!(
            savable_post(&generated()),
            Some((
                "Rust in production, one year in.".to_string(),
                "#rust, #backend".to_string()
            ))
        );
        assert_eq!(savable_post(&AiOutcome::error("nope")), None);
        assert_eq!(
            savable_post(&AiOutcome::Success(json!({"post": "x", "hashtags": "#a"}))),
            None
        );
        assert_eq!(savable_post(&AiOutcome::Success(json!({"hashtags": []}))), None);
    }

    #[tokio::test]
    async fn test_save_generated_post() {
        let store = temp_store().await;

        assert_eq!(save_generated_post(&store, None).await.unwrap(), None);

        let id = save_generated_post(&store, Some(&generated())).await.unwrap().unwrap();
        let post = store.get_post(id).await.unwrap().unwrap();
        assert_eq!(post.hashtags, "#rust, #backend");
        assert_eq!(post.status, PostStatus::Draft);
    }

    #[tokio::test]
    async fn test_share_without_images_has_no_media() {
        let store = temp_store().await;
        let post = saved_post(&store).await;
        let linkedin = FakeLinkedIn::default();

        let outcome = share_post(&store, &linkedin, "tok", &post, &[]).await.unwrap();

        assert!(matches!(outcome, ShareOutcome::Published(_)));
        assert_eq!(outcome.redirect_target(), "/?linkedin_success=true");
        let published = linkedin.published.lock().unwrap();
        let content = &published[0]["specificContent"]["com.linkedin.ugc.ShareContent"];
        assert_eq!(content["shareMediaCategory"], "NONE");
        assert!(content.get("media").is_none());
        assert_eq!(published[0]["author"], "urn:li:person:member42");

        let post = store.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Posted);
        assert!(post.posted_at.is_some());
    }

    #[tokio::test]
    async fn test_share_with_images_attaches_media() {
        let store = temp_store().await;
        let post = saved_post(&store).await;
        let linkedin = FakeLinkedIn::default();

        let images = [image("image/png"), image("image/jpeg")];
        let outcome = share_post(&store, &linkedin, "tok", &post, &images).await.unwrap();

        assert!(matches!(outcome, ShareOutcome::Published(_)));
        let published = linkedin.published.lock().unwrap();
        let content = &published[0]["specificContent"]["com.linkedin.ugc.ShareContent"];
        assert_eq!(content["shareMediaCategory"], "IMAGE");
        assert_eq!(content["media"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_share_aborts_on_partial_upload_failure() {
        let store = temp_store().await;
        let post = saved_post(&store).await;
        let linkedin = FakeLinkedIn {
            fail_upload_at: Some(2),
            ..Default::default()
        };

        let images = [image("image/png"), image("image/png"), image("image/png")];
        let outcome = share_post(&store, &linkedin, "tok", &post, &images).await.unwrap();

        assert!(matches!(outcome, ShareOutcome::ImageUploadFailed(_)));
        assert_eq!(
            outcome.redirect_target(),
            "/?linkedin_error=true&image_upload_error=true"
        );
        assert_eq!(linkedin.uploads.lock().unwrap().len(), 1);
        assert!(linkedin.published.lock().unwrap().is_empty());

        let post = store.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Draft);
        assert!(post.posted_at.is_none());
    }

    #[tokio::test]
    async fn test_share_publish_failure_leaves_draft() {
        let store = temp_store().await;
        let post = saved_post(&store).await;
        let linkedin = FakeLinkedIn {
            fail_publish: true,
            ..Default::default()
        };

        let outcome = share_post(&store, &linkedin, "tok", &post, &[]).await.unwrap();

        assert!(matches!(outcome, ShareOutcome::PublishFailed(_)));
        assert_eq!(outcome.redirect_target(), "/?linkedin_error=true");
        let post = store.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Draft);
    }

    #[tokio::test]
    async fn test_enrichment_stores_summary() {
        let store = temp_store().await;
        let summary = json!({"expertise": ["mathematics"]});
        let ai: SharedAi = Arc::new(FakeAi::returning(AiOutcome::Success(summary.clone())));
        let linkedin: SharedLinkedIn = Arc::new(FakeLinkedIn::default());

        let user_id = enrich_profile(ai, linkedin, store.clone(), "tok".to_string())
            .await
            .unwrap();

        assert_eq!(user_id.as_deref(), Some("urn:li:person:member42"));
        let profile = store
            .get_user_profile("urn:li:person:member42")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.profile_summary, summary);
    }

    #[tokio::test]
    async fn test_enrichment_fails_on_ai_error() {
        let store = temp_store().await;
        let ai: SharedAi = Arc::new(FakeAi::returning(AiOutcome::error("quota exceeded")));
        let linkedin: SharedLinkedIn = Arc::new(FakeLinkedIn::default());

        let err = enrich_profile(ai, linkedin, store.clone(), "tok".to_string())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("quota exceeded"));
        assert!(store
            .get_user_profile("urn:li:person:member42")
            .await
            .unwrap()
            .is_none());
    }
}
