// src/linkedin/mod.rs
//! LinkedIn OAuth2 and publishing

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub mod client;

pub use client::LinkedInClient;

pub const SCOPES: &[&str] = &["openid", "profile", "email", "w_member_social"];

const FEEDSHARE_IMAGE_RECIPE: &str = "urn:li:digitalmediaRecipe:feedshare-image";
const SHARE_CONTENT_KEY: &str = "com.linkedin.ugc.ShareContent";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
}

/// OpenID userinfo; `sub` is the member identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
}

/// Projected `/v2/me` fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileDetails {
    #[serde(rename = "localizedFirstName")]
    pub first_name: Option<String>,
    #[serde(rename = "localizedLastName")]
    pub last_name: Option<String>,
    #[serde(rename = "localizedHeadline")]
    pub headline: Option<String>,
}

pub fn person_urn(sub: &str) -> String {
    format!("urn:li:person:{}", sub)
}

/// Plain-text description used as input for the profile prompt
pub fn describe_member(info: &UserInfo, details: Option<&ProfileDetails>) -> String {
    let mut lines = Vec::new();

    let name = info.name.clone().or_else(|| {
        let parts: Vec<&str> = [info.given_name.as_deref(), info.family_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    });
    if let Some(name) = name {
        lines.push(format!("Name: {}", name));
    }

    if let Some(details) = details {
        if let Some(headline) = details.headline.as_deref().filter(|h| !h.is_empty()) {
            lines.push(format!("Headline: {}", headline));
        }
    }

    if let Some(email) = &info.email {
        lines.push(format!("Email: {}", email));
    }

    lines.join("\n")
}

pub fn build_register_upload_payload(owner_urn: &str) -> Value {
    json!({
        "registerUploadRequest": {
            "recipes": [FEEDSHARE_IMAGE_RECIPE],
            "owner": owner_urn,
            "serviceRelationships": [{
                "relationshipType": "OWNER",
                "identifier": "urn:li:userGeneratedContent"
            }]
        }
    })
}

/// UGC envelope; media entries are added only when asset URNs are present
pub fn build_ugc_payload(author_urn: &str, text: &str, media_urns: &[String]) -> Value {
    let mut share_content = json!({
        "shareCommentary": { "text": text },
        "shareMediaCategory": "NONE"
    });

    if !media_urns.is_empty() {
        let media: Vec<Value> = media_urns
            .iter()
            .map(|urn| {
                json!({
                    "status": "READY",
                    "media": urn,
                    "mediaUrn": urn,
                    "categories": ["IMAGE"]
                })
            })
            .collect();
        share_content["media"] = Value::Array(media);
        share_content["shareMediaCategory"] = json!("IMAGE");
    }

    json!({
        "author": author_urn,
        "lifecycleState": "PUBLISHED",
        "specificContent": { SHARE_CONTENT_KEY: share_content },
        "visibility": { "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC" }
    })
}

/// Provider operations used once a member has linked their account
#[rocket::async_trait]
pub trait LinkedInApi: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<AccessToken>;

    async fn userinfo(&self, access_token: &str) -> Result<UserInfo>;

    async fn profile(&self, access_token: &str) -> Result<ProfileDetails>;

    /// Register an upload slot owned by `owner_urn`, PUT the bytes, return the asset URN
    async fn upload_image(
        &self,
        access_token: &str,
        owner_urn: &str,
        data: &[u8],
        mime_type: &str,
    ) -> Result<String>;

    async fn publish_post(
        &self,
        access_token: &str,
        author_urn: &str,
        text: &str,
        media_urns: &[String],
    ) -> Result<Value>;

    async fn person_urn(&self, access_token: &str) -> Result<String> {
        let info = self.userinfo(access_token).await?;
        Ok(person_urn(&info.sub))
    }
}

pub type SharedLinkedIn = Arc<dyn LinkedInApi>;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ugc_payload_without_media() {
        let payload = build_ugc_payload("urn:li:person:1", "Hello", &[]);
        let content = &payload["specificContent"][SHARE_CONTENT_KEY];

        assert_eq!(payload["author"], "urn:li:person:1");
        assert_eq!(payload["lifecycleState"], "PUBLISHED");
        assert_eq!(content["shareCommentary"]["text"], "Hello");
        assert_eq!(content["shareMediaCategory"], "NONE");
        assert!(content.get("media").is_none());
        assert_eq!(
            payload["visibility"]["com.linkedin.ugc.MemberNetworkVisibility"],
            "PUBLIC"
        );
    }

    #[test]
    fn test_ugc_payload_with_media() {
        let urns = vec!["urn:li:digitalmediaAsset:a".to_string(), "urn:li:digitalmediaAsset:b".to_string()];
        let payload = build_ugc_payload("urn:li:person:1", "Hello", &urns);
        let content = &payload["specificContent"][SHARE_CONTENT_KEY];

        assert_eq!(content["shareMediaCategory"], "IMAGE");
        assert_eq!(content["media"].as_array().unwrap().len(), 2);
        assert_eq!(content["media"][1]["mediaUrn"], "urn:li:digitalmediaAsset:b");
        assert_eq!(content["media"][0]["categories"][0], "IMAGE");
    }

    #[test]
    fn test_register_upload_payload_owner() {
        let payload = build_register_upload_payload("urn:li:person:9");
        assert_eq!(payload["registerUploadRequest"]["owner"], "urn:li:person:9");
        assert_eq!(
            payload["registerUploadRequest"]["recipes"][0],
            FEEDSHARE_IMAGE_RECIPE
        );
    }

    #[test]
    fn test_describe_member() {
        let info = UserInfo {
            sub: "x".to_string(),
            name: None,
            given_name: Some("Grace".to_string()),
            family_name: Some("Hopper".to_string()),
            email: None,
            picture: None,
        };
        let details = ProfileDetails {
            headline: Some("Rear Admiral".to_string()),
            ..Default::default()
        };

        assert_eq!(
            describe_member(&info, Some(&details)),
            "Name: Grace Hopper\nHeadline: Rear Admiral"
        );
        assert_eq!(person_urn("x"), "urn:li:person:x");
    }
}
