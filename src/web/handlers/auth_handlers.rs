// src/web/handlers/auth_handlers.rs
use crate::ai::SharedAi;
use crate::core::config_manager::LinkedInConfig;
use crate::core::database::DraftStore;
use crate::jobs::JobTracker;
use crate::linkedin::client::authorization_url;
use crate::linkedin::SharedLinkedIn;
use crate::web::services;
use crate::web::session::{
    AuthError, Session, ENRICHMENT_JOB_COOKIE, LINKEDIN_TOKEN_COOKIE, LINKEDIN_USER_COOKIE,
    OAUTH_STATE_COOKIE,
};
use crate::web::types::ApiError;

use rocket::response::Redirect;
use rocket::State;
use tracing::{info, warn};
use uuid::Uuid;

pub const ENRICHMENT_JOB_NAME: &str = "profile-enrichment";

pub async fn login_handler(
    session: Session<'_>,
    config: &State<LinkedInConfig>,
) -> Result<Redirect, ApiError> {
    let state = Uuid::new_v4().simple().to_string();
    let url = authorization_url(config.inner(), &state)
        .map_err(|e| AuthError::Misconfigured(format!("{:#}", e)))?;

    session.set(OAUTH_STATE_COOKIE, state);
    info!("Redirecting session {} to LinkedIn authorization", session.id());
    Ok(Redirect::to(url))
}

#[allow(clippy::too_many_arguments)]
pub async fn callback_handler(
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    session: Session<'_>,
    linkedin: &State<SharedLinkedIn>,
    ai: &State<SharedAi>,
    store: &State<DraftStore>,
    jobs: &State<JobTracker>,
) -> Result<Redirect, ApiError> {
    if let Some(error) = error {
        warn!("LinkedIn authorization declined: {}", error);
        session.remove(OAUTH_STATE_COOKIE);
        return Ok(Redirect::to("/"));
    }

    let expected = session.get(OAUTH_STATE_COOKIE);
    if state.is_none() || state != expected {
        warn!("OAuth state mismatch for session {}", session.id());
        return Err(AuthError::StateMismatch.into());
    }
    session.remove(OAUTH_STATE_COOKIE);

    let code = code.ok_or(AuthError::MissingCode)?;

    let token = linkedin.exchange_code(&code).await.map_err(|e| {
        warn!("LinkedIn token exchange failed: {:#}", e);
        AuthError::TokenExchangeFailed(format!("{:#}", e))
    })?;

    session.set(LINKEDIN_TOKEN_COOKIE, token.access_token.clone());
    session.remove(LINKEDIN_USER_COOKIE);

    let job_id = jobs
        .spawn(
            ENRICHMENT_JOB_NAME,
            services::enrich_profile(
                ai.inner().clone(),
                linkedin.inner().clone(),
                store.inner().clone(),
                token.access_token,
            ),
        )
        .await;
    session.set(ENRICHMENT_JOB_COOKIE, job_id.to_string());

    info!("LinkedIn linked for session {}, enrichment job {}", session.id(), job_id);
    Ok(Redirect::to("/"))
}
