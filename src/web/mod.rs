// src/web/mod.rs
pub mod handlers;
pub mod render;
pub mod services;
pub mod session;
pub mod types;

pub use handlers::*;
pub use types::*;

use crate::ai::{GeminiClient, SharedAi};
use crate::core::config_manager::{ConfigManager, LinkedInConfig};
use crate::core::database::DraftStore;
use crate::export::ExportFormat;
use crate::jobs::{JobRecord, JobTracker};
use crate::linkedin::{LinkedInClient, SharedLinkedIn};
use crate::state::SessionStore;
use session::Session;

use anyhow::Result;
use rocket::data::{Limits, ToByteUnit};
use rocket::form::Form;
use rocket::http::Status;
use rocket::response::content::RawHtml;
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::{catch, catchers, get, post, routes, Build, Request, Rocket, State};
use std::sync::Arc;
use tracing::{error, info};

/// Collaborators the routes pull out of managed state
pub struct AppServices {
    pub ai: SharedAi,
    pub linkedin: SharedLinkedIn,
    pub store: DraftStore,
    pub sessions: SessionStore,
    pub jobs: JobTracker,
}

impl AppServices {
    pub fn new(ai: SharedAi, linkedin: SharedLinkedIn, store: DraftStore) -> Self {
        Self {
            ai,
            linkedin,
            store,
            sessions: SessionStore::new(),
            jobs: JobTracker::new(),
        }
    }
}

#[get("/?<flags..>")]
pub async fn dashboard(
    flags: Option<DashboardFlags>,
    session: Session<'_>,
    sessions: &State<SessionStore>,
    store: &State<DraftStore>,
    jobs: &State<JobTracker>,
) -> Result<RawHtml<String>, ApiError> {
    handlers::dashboard_handler(flags, session, sessions, store, jobs).await
}

#[post("/profile/analyze", data = "<form>")]
pub async fn analyze_profile(
    form: Form<TextForm>,
    session: Session<'_>,
    ai: &State<SharedAi>,
    sessions: &State<SessionStore>,
) -> Redirect {
    handlers::analyze_profile_handler(form, session, ai, sessions).await
}

#[post("/trends/analyze", data = "<form>")]
pub async fn analyze_trends(
    form: Form<TrendForm>,
    session: Session<'_>,
    ai: &State<SharedAi>,
    sessions: &State<SessionStore>,
    store: &State<DraftStore>,
) -> Redirect {
    handlers::analyze_trends_handler(form, session, ai, sessions, store).await
}

#[post("/image/analyze", data = "<upload>")]
pub async fn analyze_images(
    upload: Form<ImageUploadForm<'_>>,
    session: Session<'_>,
    ai: &State<SharedAi>,
    sessions: &State<SessionStore>,
) -> Redirect {
    handlers::analyze_images_handler(upload, session, ai, sessions).await
}

#[post("/post/generate", data = "<form>")]
pub async fn generate_post(
    form: Form<GenerateForm>,
    session: Session<'_>,
    ai: &State<SharedAi>,
    sessions: &State<SessionStore>,
) -> Redirect {
    handlers::generate_post_handler(form, session, ai, sessions).await
}

#[post("/posts/save")]
pub async fn save_post(
    session: Session<'_>,
    sessions: &State<SessionStore>,
    store: &State<DraftStore>,
) -> Result<Redirect, ApiError> {
    handlers::save_post_handler(session, sessions, store).await
}

#[post("/posts/delete", data = "<form>")]
pub async fn delete_posts(
    form: Form<DeleteForm>,
    store: &State<DraftStore>,
) -> Result<Redirect, ApiError> {
    handlers::delete_posts_handler(form, store).await
}

#[post("/posts/<id>/mark_posted")]
pub async fn mark_posted(id: i64, store: &State<DraftStore>) -> Result<Redirect, ApiError> {
    handlers::mark_posted_handler(id, store).await
}

#[post("/posts/<id>/share")]
pub async fn share_post(
    id: i64,
    session: Session<'_>,
    sessions: &State<SessionStore>,
    store: &State<DraftStore>,
    linkedin: &State<SharedLinkedIn>,
) -> Result<Redirect, ApiError> {
    handlers::share_post_handler(id, session, sessions, store, linkedin).await
}

#[get("/export/md")]
pub async fn export_markdown(store: &State<DraftStore>) -> Result<FileDownload, ApiError> {
    handlers::export_handler(ExportFormat::Md, store).await
}

#[get("/export/csv")]
pub async fn export_csv(store: &State<DraftStore>) -> Result<FileDownload, ApiError> {
    handlers::export_handler(ExportFormat::Csv, store).await
}

#[get("/auth/login")]
pub async fn login(
    session: Session<'_>,
    config: &State<LinkedInConfig>,
) -> Result<Redirect, ApiError> {
    handlers::login_handler(session, config).await
}

#[allow(clippy::too_many_arguments)]
#[get("/auth/linkedin/callback?<code>&<state>&<error>")]
pub async fn linkedin_callback(
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    session: Session<'_>,
    linkedin: &State<SharedLinkedIn>,
    ai: &State<SharedAi>,
    store: &State<DraftStore>,
    jobs: &State<JobTracker>,
) -> Result<Redirect, ApiError> {
    handlers::callback_handler(code, state, error, session, linkedin, ai, store, jobs).await
}

#[get("/jobs/<id>")]
pub async fn job_status(id: &str, jobs: &State<JobTracker>) -> Option<Json<JobRecord>> {
    handlers::job_status_handler(id, jobs).await
}

#[get("/health")]
pub async fn health() -> Json<HealthResponse> {
    handlers::health_handler().await
}

// Error catchers

#[catch(400)]
pub fn bad_request(_req: &Request) -> ApiError {
    ErrorResponse::new(
        "Invalid request",
        "BAD_REQUEST",
        &["Check the submitted form fields"],
    )
    .with_status(Status::BadRequest)
}

#[catch(401)]
pub fn unauthorized(_req: &Request) -> ApiError {
    ErrorResponse::new(
        "Authentication required",
        "UNAUTHORIZED",
        &["Log in with LinkedIn from the dashboard first"],
    )
    .with_status(Status::Unauthorized)
}

#[catch(404)]
pub fn not_found(req: &Request) -> ApiError {
    ErrorResponse::new(
        format!("No route for {}", req.uri()),
        "NOT_FOUND",
        &["Return to the dashboard at /"],
    )
    .with_status(Status::NotFound)
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> ApiError {
    ErrorResponse::new(
        "Form data could not be processed",
        "UNPROCESSABLE_ENTITY",
        &["Make sure every required field is filled in"],
    )
    .with_status(Status::UnprocessableEntity)
}

#[catch(500)]
pub fn server_error(_req: &Request) -> ApiError {
    ErrorResponse::new(
        "Internal server error",
        "INTERNAL_ERROR",
        &[
            "Try again in a few moments",
            "Check the server logs if the problem persists",
        ],
    )
    .with_status(Status::InternalServerError)
}

/// Assemble the application without launching it
pub fn build_rocket(config: &ConfigManager, services: AppServices) -> Rocket<Build> {
    let limits = Limits::default()
        .limit("file", 10.mebibytes())
        .limit("data-form", 32.mebibytes());

    let figment = rocket::Config::figment()
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port))
        .merge(("secret_key", config.session_key()))
        .merge(("limits", limits));

    rocket::custom(figment)
        .manage(services.ai)
        .manage(services.linkedin)
        .manage(services.store)
        .manage(services.sessions)
        .manage(services.jobs)
        .manage(config.linkedin.clone())
        .register(
            "/",
            catchers![bad_request, unauthorized, not_found, unprocessable, server_error],
        )
        .mount(
            "/",
            routes![
                dashboard,
                analyze_profile,
                analyze_trends,
                analyze_images,
                generate_post,
                save_post,
                delete_posts,
                mark_posted,
                share_post,
                export_markdown,
                export_csv,
                login,
                linkedin_callback,
                job_status,
                health,
            ],
        )
}

pub async fn start_web_server(config: ConfigManager) -> Result<()> {
    config.ensure_directories().await?;

    let store = DraftStore::new(&config.server.database_path)?;
    if let Err(e) = store.init().await {
        error!("Failed to initialize database: {:#}", e);
        return Err(e);
    }

    let ai: SharedAi = Arc::new(GeminiClient::new(&config.ai)?);
    let linkedin: SharedLinkedIn = Arc::new(LinkedInClient::new(config.linkedin.clone())?);

    info!(
        "Starting Influra ({}) on {}:{}",
        config.environment, config.server.address, config.server.port
    );
    info!("Database: {}", store.location());
    info!("AI model: {}", config.ai.model);

    let _rocket = build_rocket(&config, AppServices::new(ai, linkedin, store))
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Web server terminated with an error: {}", e))?;

    Ok(())
}
