// src/linkedin/client.rs
use super::{
    build_register_upload_payload, build_ugc_payload, AccessToken, LinkedInApi, ProfileDetails,
    UserInfo, SCOPES,
};
use crate::core::config_manager::LinkedInConfig;
use anyhow::{Context, Result};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

pub const AUTHORIZATION_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
pub const TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
pub const API_BASE_URL: &str = "https://api.linkedin.com";

const USERINFO_PATH: &str = "/v2/userinfo";
const PROFILE_PATH: &str = "/v2/me?projection=(id,localizedFirstName,localizedLastName,localizedHeadline)";
const REGISTER_UPLOAD_PATH: &str = "/v2/assets?action=registerUpload";
const UGC_POSTS_PATH: &str = "/v2/ugcPosts";
const RESTLI_VERSION: &str = "2.0.0";
const UPLOAD_MECHANISM_KEY: &str = "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct RegisterUploadResponse {
    value: RegisterUploadValue,
}

#[derive(Debug, Deserialize)]
struct RegisterUploadValue {
    asset: String,
    #[serde(rename = "uploadMechanism")]
    upload_mechanism: UploadMechanism,
}

#[derive(Debug, Deserialize)]
struct UploadMechanism {
    #[serde(rename = "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest")]
    http_request: UploadHttpRequest,
}

#[derive(Debug, Deserialize)]
struct UploadHttpRequest {
    #[serde(rename = "uploadUrl")]
    upload_url: String,
}

pub struct LinkedInClient {
    client: Client,
    config: LinkedInConfig,
    api_base: String,
    token_url: String,
}

impl LinkedInClient {
    pub fn new(config: LinkedInConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            api_base: API_BASE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        })
    }

    /// Point the client at another host, e.g. a local stub
    pub fn with_endpoints(mut self, api_base: &str, token_url: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.token_url = token_url.to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Fail on non-success, logging the provider's body for diagnostics
    async fn ensure_success(response: Response, operation: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!("LinkedIn {} failed with {}: {}", operation, status, error_text);
        anyhow::bail!("LinkedIn {} failed with status {}: {}", operation, status, error_text)
    }
}

/// Authorization URL carrying the anti-forgery `state`
pub fn authorization_url(config: &LinkedInConfig, state: &str) -> Result<String> {
    let scope = SCOPES.join(" ");
    let url = Url::parse_with_params(
        AUTHORIZATION_URL,
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", state),
        ],
    )
    .context("Failed to build authorization URL")?;

    Ok(url.to_string())
}

#[rocket::async_trait]
impl LinkedInApi for LinkedInClient {
    /// The provider wants `client_secret` as a form field, so this is a plain form POST
    async fn exchange_code(&self, code: &str) -> Result<AccessToken> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .context("Failed to call LinkedIn token endpoint")?;

        let token: AccessToken = Self::ensure_success(response, "token exchange")
            .await?
            .json()
            .await
            .context("Failed to parse LinkedIn token response")?;

        info!("Obtained LinkedIn access token");
        Ok(token)
    }

    async fn userinfo(&self, access_token: &str) -> Result<UserInfo> {
        let response = self
            .client
            .get(self.url(USERINFO_PATH))
            .bearer_auth(access_token)
            .send()
            .await
            .context("Failed to call LinkedIn userinfo")?;

        Self::ensure_success(response, "userinfo")
            .await?
            .json()
            .await
            .context("Failed to parse LinkedIn userinfo")
    }

    async fn profile(&self, access_token: &str) -> Result<ProfileDetails> {
        let response = self
            .client
            .get(self.url(PROFILE_PATH))
            .bearer_auth(access_token)
            .header("X-Restli-Protocol-Version", RESTLI_VERSION)
            .send()
            .await
            .context("Failed to call LinkedIn profile")?;

        Self::ensure_success(response, "profile lookup")
            .await?
            .json()
            .await
            .context("Failed to parse LinkedIn profile")
    }

    async fn upload_image(
        &self,
        access_token: &str,
        owner_urn: &str,
        data: &[u8],
        mime_type: &str,
    ) -> Result<String> {
        let response = self
            .client
            .post(self.url(REGISTER_UPLOAD_PATH))
            .bearer_auth(access_token)
            .header("X-Restli-Protocol-Version", RESTLI_VERSION)
            .json(&build_register_upload_payload(owner_urn))
            .send()
            .await
            .context("Failed to register LinkedIn upload")?;

        let registered: RegisterUploadResponse = Self::ensure_success(response, "upload registration")
            .await?
            .json()
            .await
            .with_context(|| format!("Missing {} in registration response", UPLOAD_MECHANISM_KEY))?;

        let upload_url = registered.value.upload_mechanism.http_request.upload_url;
        let asset_urn = registered.value.asset;

        let response = self
            .client
            .put(&upload_url)
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(data.to_vec())
            .send()
            .await
            .context("Failed to upload image bytes to LinkedIn")?;
        Self::ensure_success(response, "image upload").await?;

        info!("Uploaded image to LinkedIn as {}", asset_urn);
        Ok(asset_urn)
    }

    async fn publish_post(
        &self,
        access_token: &str,
        author_urn: &str,
        text: &str,
        media_urns: &[String],
    ) -> Result<Value> {
        let payload = build_ugc_payload(author_urn, text, media_urns);

        let response = self
            .client
            .post(self.url(UGC_POSTS_PATH))
            .bearer_auth(access_token)
            .header("X-Restli-Protocol-Version", RESTLI_VERSION)
            .json(&payload)
            .send()
            .await
            .context("Failed to call LinkedIn UGC endpoint")?;

        let body = Self::ensure_success(response, "post publication")
            .await?
            .text()
            .await
            .context("Failed to read LinkedIn publication response")?;

        info!("Published post to LinkedIn with {} media", media_urns.len());
        if body.trim().is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str(&body).context("Failed to parse LinkedIn publication response")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LinkedInConfig {
        LinkedInConfig {
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:8000/auth/linkedin/callback".to_string(),
        }
    }

    #[test]
    fn test_authorization_url_carries_state_and_scopes() {
        let url = authorization_url(&config(), "state-xyz").unwrap();
        let parsed = Url::parse(&url).unwrap();
        let params: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();

        assert!(url.starts_with(AUTHORIZATION_URL));
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["state"], "state-xyz");
        assert_eq!(params["scope"], "openid profile email w_member_social");
        assert_eq!(
            params["redirect_uri"],
            "http://localhost:8000/auth/linkedin/callback"
        );
    }

    #[test]
    fn test_register_response_parses() {
        let raw = serde_json::json!({
            "value": {
                "asset": "urn:li:digitalmediaAsset:C5",
                "uploadMechanism": {
                    UPLOAD_MECHANISM_KEY: { "uploadUrl": "https://upload.example/abc" }
                }
            }
        });
        let parsed: RegisterUploadResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.value.asset, "urn:li:digitalmediaAsset:C5");
        assert_eq!(
            parsed.value.upload_mechanism.http_request.upload_url,
            "https://upload.example/abc"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        let client = LinkedInClient::new(config())
            .unwrap()
            .with_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9/token");
        assert!(client.userinfo("token").await.is_err());
        assert!(client.exchange_code("code").await.is_err());
    }
}
