// src/web/handlers/system_handlers.rs
use crate::ai::AiOutcome;
use crate::core::database::DraftStore;
use crate::jobs::{JobRecord, JobStatus, JobTracker};
use crate::state::SessionStore;
use crate::web::render::{render_dashboard, DashboardContext};
use crate::web::session::{Session, LINKEDIN_USER_COOKIE};
use crate::web::types::*;

use rocket::response::content::RawHtml;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{info, warn};
use uuid::Uuid;

const RECENT_TRENDS: i64 = 10;

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn job_status_handler(id: &str, jobs: &State<JobTracker>) -> Option<Json<JobRecord>> {
    let id = Uuid::parse_str(id).ok()?;
    jobs.get(id).await.map(Json)
}

/// Member the session is linked as. A finished enrichment job's result is
/// copied into a cookie so it outlives the job record.
fn linked_member(job: Option<&JobRecord>, session: &Session<'_>) -> Option<String> {
    let remembered = session.linked_user();
    let resolved = job
        .filter(|job| job.status == JobStatus::Succeeded)
        .and_then(|job| job.result.clone());

    match resolved {
        Some(user_id) => {
            if remembered.as_deref() != Some(user_id.as_str()) {
                session.set(LINKEDIN_USER_COOKIE, user_id.clone());
            }
            Some(user_id)
        }
        None => remembered,
    }
}

/// Pre-fill the session's profile summary from the stored one when it has none yet
async fn prefill_profile(
    user_id: &str,
    session: &Session<'_>,
    sessions: &SessionStore,
    store: &DraftStore,
) {
    if sessions
        .read(session.id(), |state| state.profile_summary.is_some())
        .await
    {
        return;
    }

    match store.get_user_profile(user_id).await {
        Ok(Some(profile)) => {
            info!("Pre-filling profile summary for {} from store", user_id);
            sessions
                .write(session.id(), |state| {
                    state.profile_summary = Some(AiOutcome::Success(profile.profile_summary))
                })
                .await;
        }
        Ok(None) => {}
        Err(e) => warn!("Could not load stored profile for {}: {:#}", user_id, e),
    }
}

pub async fn dashboard_handler(
    flags: Option<DashboardFlags>,
    session: Session<'_>,
    sessions: &State<SessionStore>,
    store: &State<DraftStore>,
    jobs: &State<JobTracker>,
) -> Result<RawHtml<String>, ApiError> {
    let enrichment = match session.enrichment_job() {
        Some(id) => jobs.get(id).await,
        None => None,
    };
    let linked = session.access_token().is_some();
    let member = if linked {
        linked_member(enrichment.as_ref(), &session)
    } else {
        None
    };
    if let Some(user_id) = &member {
        prefill_profile(user_id, &session, sessions.inner(), store.inner()).await;
    }

    let posts = store
        .list_posts()
        .await
        .map_err(|e| internal_error("Failed to load posts", &e))?;
    let trends = store
        .list_trends(RECENT_TRENDS)
        .await
        .map_err(|e| internal_error("Failed to load trends", &e))?;
    let analysis = sessions.snapshot(session.id()).await;

    let html = render_dashboard(&DashboardContext {
        analysis: &analysis,
        posts: &posts,
        trends: &trends,
        flags: flags.unwrap_or_default(),
        linked,
        member: member.as_deref(),
        enrichment: enrichment.as_ref(),
    })
    .map_err(|e| internal_error("Failed to render dashboard", &e))?;

    Ok(RawHtml(html))
}
