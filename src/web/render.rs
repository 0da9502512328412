// src/web/render.rs
//! Server-rendered dashboard

use crate::ai::AiOutcome;
use crate::core::database::{Post, PostStatus, Trend};
use crate::jobs::{JobRecord, JobStatus};
use crate::state::AnalysisState;
use crate::web::types::DashboardFlags;
use anyhow::{Context, Result};
use askama::Template;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Everything the dashboard shows for one session
pub struct DashboardContext<'a> {
    pub analysis: &'a AnalysisState,
    pub posts: &'a [Post],
    pub trends: &'a [Trend],
    pub flags: DashboardFlags,
    pub linked: bool,
    /// Member URN resolved by profile enrichment
    pub member: Option<&'a str>,
    pub enrichment: Option<&'a JobRecord>,
}

struct PostRow<'a> {
    id: i64,
    status: String,
    created_at: String,
    content: &'a str,
    hashtags: &'a str,
    posted_at: String,
}

impl<'a> From<&'a Post> for PostRow<'a> {
    fn from(post: &'a Post) -> Self {
        let posted_at = match (&post.status, &post.posted_at) {
            (PostStatus::Posted, Some(at)) => at.format(TIMESTAMP_FORMAT).to_string(),
            _ => String::new(),
        };
        Self {
            id: post.id,
            status: post.status.to_string(),
            created_at: post.created_at.format(TIMESTAMP_FORMAT).to_string(),
            content: &post.content,
            hashtags: &post.hashtags,
            posted_at,
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardPage<'a> {
    shared: bool,
    share_failed: bool,
    image_upload_failed: bool,
    linked: bool,
    member: &'a str,
    enrichment_note: String,
    profile_summary: String,
    trend_insights: String,
    image_analysis: String,
    image_count: usize,
    image_types: String,
    generated_post: String,
    can_save: bool,
    posts: Vec<PostRow<'a>>,
    trends: &'a [Trend],
}

fn pretty_json(outcome: Option<&AiOutcome>) -> String {
    outcome
        .and_then(|outcome| serde_json::to_string_pretty(&outcome.to_json()).ok())
        .unwrap_or_default()
}

fn enrichment_note(enrichment: Option<&JobRecord>) -> String {
    match enrichment.map(|job| &job.status) {
        None => String::new(),
        Some(JobStatus::Pending) | Some(JobStatus::Running) => {
            "Profile enrichment in progress.".to_string()
        }
        Some(JobStatus::Succeeded) => "Profile enrichment complete.".to_string(),
        Some(JobStatus::Failed { error }) => format!("Profile enrichment failed: {}", error),
    }
}

impl<'a> DashboardPage<'a> {
    fn new(ctx: &DashboardContext<'a>) -> Self {
        let analysis = ctx.analysis;
        let flags = ctx.flags;
        Self {
            shared: flags.linkedin_success,
            share_failed: flags.linkedin_error,
            image_upload_failed: flags.image_upload_error,
            linked: ctx.linked,
            member: ctx.member.unwrap_or_default(),
            enrichment_note: enrichment_note(ctx.enrichment),
            profile_summary: pretty_json(analysis.profile_summary.as_ref()),
            trend_insights: pretty_json(analysis.trend_insights.as_ref()),
            image_analysis: pretty_json(analysis.image_analysis.as_ref()),
            image_count: analysis.images().len(),
            image_types: analysis.image_mime_types().join(", "),
            generated_post: pretty_json(analysis.generated_post.as_ref()),
            can_save: analysis
                .generated_post
                .as_ref()
                .is_some_and(AiOutcome::is_success),
            posts: ctx.posts.iter().map(PostRow::from).collect(),
            trends: ctx.trends,
        }
    }
}

pub fn render_dashboard(ctx: &DashboardContext<'_>) -> Result<String> {
    DashboardPage::new(ctx)
        .render()
        .context("Failed to render dashboard template")
}
