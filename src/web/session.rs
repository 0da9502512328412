// src/web/session.rs
//! Browser session carried in Rocket private (encrypted) cookies.

use crate::web::types::{ApiError, ErrorResponse};
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use std::convert::Infallible;
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "influra_session";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
pub const LINKEDIN_TOKEN_COOKIE: &str = "linkedin_token";
pub const LINKEDIN_USER_COOKIE: &str = "linkedin_user";
pub const ENRICHMENT_JOB_COOKIE: &str = "enrichment_job";

/// Session id plus typed access to the other private cookies.
/// A fresh id is issued on the first request that has none.
pub struct Session<'r> {
    id: String,
    cookies: &'r CookieJar<'r>,
}

// Lax so the cookies survive the top-level redirect back from the provider
fn private_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

impl<'r> Session<'r> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.cookies
            .get_private(name)
            .map(|cookie| cookie.value().to_string())
    }

    pub fn set(&self, name: &'static str, value: impl Into<String>) {
        self.cookies.add_private(private_cookie(name, value.into()));
    }

    pub fn remove(&self, name: &'static str) {
        self.cookies.remove_private(Cookie::build(name).path("/"));
    }

    pub fn access_token(&self) -> Option<String> {
        self.get(LINKEDIN_TOKEN_COOKIE)
    }

    /// Member URN remembered from a finished enrichment job
    pub fn linked_user(&self) -> Option<String> {
        self.get(LINKEDIN_USER_COOKIE)
    }

    pub fn enrichment_job(&self) -> Option<Uuid> {
        self.get(ENRICHMENT_JOB_COOKIE)
            .and_then(|raw| Uuid::parse_str(&raw).ok())
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Session<'r> {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let cookies = request.cookies();

        let id = match cookies.get_private(SESSION_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                debug!("Starting new session {}", id);
                cookies.add_private(private_cookie(SESSION_COOKIE, id.clone()));
                id
            }
        };

        Outcome::Success(Session { id, cookies })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    StateMismatch,
    MissingCode,
    TokenExchangeFailed(String),
    NotLinked,
    Misconfigured(String),
}

impl AuthError {
    pub fn message(&self) -> String {
        match self {
            AuthError::StateMismatch => "OAuth state mismatch".to_string(),
            AuthError::MissingCode => "Authorization code missing from callback".to_string(),
            AuthError::TokenExchangeFailed(detail) => {
                format!("Failed to obtain LinkedIn access token: {}", detail)
            }
            AuthError::NotLinked => "LinkedIn account not connected".to_string(),
            AuthError::Misconfigured(detail) => format!("LinkedIn login unavailable: {}", detail),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::StateMismatch => "OAUTH_STATE_MISMATCH",
            AuthError::MissingCode => "OAUTH_CODE_MISSING",
            AuthError::TokenExchangeFailed(_) => "TOKEN_EXCHANGE_FAILED",
            AuthError::NotLinked => "LINKEDIN_NOT_CONNECTED",
            AuthError::Misconfigured(_) => "OAUTH_MISCONFIGURED",
        }
    }

    pub fn status(&self) -> Status {
        match self {
            AuthError::NotLinked => Status::Unauthorized,
            AuthError::Misconfigured(_) => Status::InternalServerError,
            _ => Status::BadRequest,
        }
    }

    fn suggestions(&self) -> &'static [&'static str] {
        match self {
            AuthError::NotLinked => &["Log in with LinkedIn from the dashboard first"],
            AuthError::Misconfigured(_) => &["Check LINKEDIN_CLIENT_ID and LINKEDIN_REDIRECT_URI"],
            _ => &["Start the login again from the dashboard"],
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        ErrorResponse::new(error.message(), error.code(), error.suggestions())
            .with_status(error.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_mapping() {
        assert_eq!(AuthError::StateMismatch.status(), Status::BadRequest);
        assert_eq!(AuthError::NotLinked.status(), Status::Unauthorized);
        assert_eq!(AuthError::MissingCode.code(), "OAUTH_CODE_MISSING");

        let api: ApiError = AuthError::TokenExchangeFailed("401".to_string()).into();
        assert_eq!(api.0, Status::BadRequest);
        assert_eq!(api.1.error_code, "TOKEN_EXCHANGE_FAILED");
        assert!(api.1.error.ends_with("401"));
        assert!(!api.1.success);
    }
}
