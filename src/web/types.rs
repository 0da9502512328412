// src/web/types.rs
use rocket::form::FromForm;
use rocket::fs::TempFile;
use rocket::http::{ContentType, Status};
use rocket::response::{self, status, Responder};
use rocket::serde::json::Json;
use rocket::serde::Serialize;
use rocket::{Request, Response};

/// Attachment download; the browser saves it under `filename`
pub struct FileDownload {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: ContentType,
}

impl FileDownload {
    pub fn new(data: impl Into<Vec<u8>>, filename: &str, content_type: ContentType) -> Self {
        Self {
            data: data.into(),
            filename: filename.to_string(),
            content_type,
        }
    }
}

impl<'r> Responder<'r, 'static> for FileDownload {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        Response::build()
            .header(self.content_type)
            .raw_header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", self.filename),
            )
            .sized_body(self.data.len(), std::io::Cursor::new(self.data))
            .ok()
    }
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, error_code: &str, suggestions: &[&str]) -> Self {
        Self {
            success: false,
            error: error.into(),
            error_code: error_code.to_string(),
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_status(self, status: Status) -> ApiError {
        status::Custom(status, Json(self))
    }
}

/// JSON error with an explicit status code
pub type ApiError = status::Custom<Json<ErrorResponse>>;

pub fn internal_error(context: &str, e: &anyhow::Error) -> ApiError {
    tracing::error!("{}: {:#}", context, e);
    ErrorResponse::new(
        format!("{}: {}", context, e),
        "INTERNAL_ERROR",
        &["Try again in a few moments"],
    )
    .with_status(Status::InternalServerError)
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(FromForm)]
pub struct TextForm {
    pub text: String,
}

#[derive(FromForm)]
pub struct TrendForm {
    pub text: String,
    pub source_url: Option<String>,
}

#[derive(FromForm)]
pub struct ImageUploadForm<'f> {
    pub images: Vec<TempFile<'f>>,
}

#[derive(FromForm)]
pub struct GenerateForm {
    pub manual_context: Option<String>,
}

#[derive(FromForm)]
pub struct DeleteForm {
    #[field(default = Vec::new())]
    pub post_ids: Vec<i64>,
}

/// Query flags the share flow redirects back with
#[derive(Debug, Clone, Copy, Default, FromForm)]
pub struct DashboardFlags {
    #[field(default = false)]
    pub linkedin_success: bool,
    #[field(default = false)]
    pub linkedin_error: bool,
    #[field(default = false)]
    pub image_upload_error: bool,
}
