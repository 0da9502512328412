// src/web/handlers/post_handlers.rs
use crate::core::database::DraftStore;
use crate::export::ExportFormat;
use crate::linkedin::SharedLinkedIn;
use crate::state::SessionStore;
use crate::web::services::{self, ShareOutcome};
use crate::web::session::{AuthError, Session};
use crate::web::types::*;

use rocket::form::Form;
use rocket::http::{ContentType, Status};
use rocket::response::Redirect;
use rocket::State;
use tracing::{info, warn};

pub async fn save_post_handler(
    session: Session<'_>,
    sessions: &State<SessionStore>,
    store: &State<DraftStore>,
) -> Result<Redirect, ApiError> {
    let generated = sessions
        .read(session.id(), |state| state.generated_post.clone())
        .await;

    let saved = services::save_generated_post(store.inner(), generated.as_ref())
        .await
        .map_err(|e| internal_error("Failed to save post", &e))?;

    if let Some(id) = saved {
        info!("Saved draft {} for session {}", id, session.id());
        sessions
            .write(session.id(), |state| state.generated_post = None)
            .await;
    }

    Ok(Redirect::to("/"))
}

pub async fn delete_posts_handler(
    form: Form<DeleteForm>,
    store: &State<DraftStore>,
) -> Result<Redirect, ApiError> {
    let deleted = store
        .delete_posts(&form.post_ids)
        .await
        .map_err(|e| internal_error("Failed to delete posts", &e))?;

    info!("Deleted {} post(s)", deleted);
    Ok(Redirect::to("/"))
}

pub async fn mark_posted_handler(id: i64, store: &State<DraftStore>) -> Result<Redirect, ApiError> {
    let updated = store
        .mark_posted(id)
        .await
        .map_err(|e| internal_error("Failed to mark post as posted", &e))?;

    if !updated {
        warn!("Mark posted requested for unknown post {}", id);
    }
    Ok(Redirect::to("/"))
}

pub async fn share_post_handler(
    id: i64,
    session: Session<'_>,
    sessions: &State<SessionStore>,
    store: &State<DraftStore>,
    linkedin: &State<SharedLinkedIn>,
) -> Result<Redirect, ApiError> {
    let access_token = session.access_token().ok_or(AuthError::NotLinked)?;

    let post = store
        .get_post(id)
        .await
        .map_err(|e| internal_error("Failed to load post", &e))?
        .ok_or_else(|| {
            ErrorResponse::new(
                format!("Post {} not found", id),
                "POST_NOT_FOUND",
                &["Refresh the dashboard and pick an existing post"],
            )
            .with_status(Status::NotFound)
        })?;

    let images = sessions
        .read(session.id(), |state| state.images().to_vec())
        .await;

    let outcome = services::share_post(
        store.inner(),
        linkedin.inner().as_ref(),
        &access_token,
        &post,
        &images,
    )
    .await
    .map_err(|e| internal_error("Failed to record shared post", &e))?;

    if let ShareOutcome::Published(response) = &outcome {
        info!("LinkedIn accepted post {}: {}", id, response);
    }
    Ok(Redirect::to(outcome.redirect_target()))
}

pub async fn export_handler(
    format: ExportFormat,
    store: &State<DraftStore>,
) -> Result<FileDownload, ApiError> {
    let posts = store
        .list_posts()
        .await
        .map_err(|e| internal_error("Failed to load posts", &e))?;

    let body = format
        .render(&posts)
        .map_err(|e| internal_error("Failed to render export", &e))?;

    let content_type = match format {
        ExportFormat::Md => ContentType::new("text", "markdown"),
        ExportFormat::Csv => ContentType::CSV,
    };

    info!("Exported {} post(s) as {}", posts.len(), format.filename());
    Ok(FileDownload::new(body, format.filename(), content_type))
}
