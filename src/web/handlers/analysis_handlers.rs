// src/web/handlers/analysis_handlers.rs
use crate::ai::{AiOutcome, SharedAi};
use crate::core::database::DraftStore;
use crate::state::{BufferedImage, SessionStore};
use crate::web::services;
use crate::web::session::Session;
use crate::web::types::*;

use rocket::form::Form;
use rocket::response::Redirect;
use rocket::State;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

const DEFAULT_IMAGE_MIME: &str = "application/octet-stream";

pub async fn analyze_profile_handler(
    form: Form<TextForm>,
    session: Session<'_>,
    ai: &State<SharedAi>,
    sessions: &State<SessionStore>,
) -> Redirect {
    info!("Analyzing profile for session {}", session.id());
    let outcome = services::analyze_profile(ai.inner().as_ref(), &form.text).await;
    sessions
        .write(session.id(), |state| state.profile_summary = Some(outcome))
        .await;
    Redirect::to("/")
}

pub async fn analyze_trends_handler(
    form: Form<TrendForm>,
    session: Session<'_>,
    ai: &State<SharedAi>,
    sessions: &State<SessionStore>,
    store: &State<DraftStore>,
) -> Redirect {
    info!("Analyzing trends for session {}", session.id());
    let outcome = services::analyze_trends(
        ai.inner().as_ref(),
        store.inner(),
        &form.text,
        form.source_url.as_deref(),
    )
    .await;
    sessions
        .write(session.id(), |state| state.trend_insights = Some(outcome))
        .await;
    Redirect::to("/")
}

/// Read each upload out of Rocket's temp storage into memory
async fn buffer_uploads(upload: &ImageUploadForm<'_>) -> anyhow::Result<Vec<BufferedImage>> {
    let mut images = Vec::with_capacity(upload.images.len());

    for file in &upload.images {
        let mime_type = file
            .content_type()
            .map(|ct| ct.to_string())
            .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());

        let reader = file.open().await?;
        tokio::pin!(reader);
        let mut data = Vec::with_capacity(file.len() as usize);
        reader.read_to_end(&mut data).await?;

        images.push(BufferedImage { data, mime_type });
    }

    Ok(images)
}

pub async fn analyze_images_handler(
    upload: Form<ImageUploadForm<'_>>,
    session: Session<'_>,
    ai: &State<SharedAi>,
    sessions: &State<SessionStore>,
) -> Redirect {
    let (analysis, images) = match buffer_uploads(&upload).await {
        Ok(images) if images.is_empty() => (AiOutcome::error("No images uploaded"), Vec::new()),
        Ok(images) => {
            info!(
                "Analyzing {} image(s) for session {}",
                images.len(),
                session.id()
            );
            let analysis = services::analyze_images(ai.inner().as_ref(), &images).await;
            (analysis, images)
        }
        Err(e) => {
            warn!("Failed to read uploaded images: {:#}", e);
            (AiOutcome::error(format!("{:#}", e)), Vec::new())
        }
    };

    sessions
        .write(session.id(), |state| {
            state.set_image_analysis(analysis, images)
        })
        .await;
    Redirect::to("/")
}

pub async fn generate_post_handler(
    form: Form<GenerateForm>,
    session: Session<'_>,
    ai: &State<SharedAi>,
    sessions: &State<SessionStore>,
) -> Redirect {
    let (profile, trends, images) = sessions
        .read(session.id(), |state| {
            (
                state.profile_summary.clone(),
                state.trend_insights.clone(),
                state.image_analysis.clone(),
            )
        })
        .await;

    let outcome = services::generate_post(
        ai.inner().as_ref(),
        profile.as_ref(),
        trends.as_ref(),
        images.as_ref(),
        form.manual_context.as_deref(),
    )
    .await;

    sessions
        .write(session.id(), |state| state.generated_post = Some(outcome))
        .await;
    Redirect::to("/")
}
