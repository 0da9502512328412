// src/export.rs
//! Markdown and CSV renderings of saved posts

use crate::core::database::Post;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt::Write as _;

pub const MARKDOWN_FILENAME: &str = "influra_drafts.md";
pub const CSV_FILENAME: &str = "influra_drafts.csv";

const CSV_HEADER: [&str; 6] = ["id", "content", "hashtags", "status", "created_at", "posted_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Md,
    Csv,
}

impl ExportFormat {
    pub fn filename(&self) -> &'static str {
        match self {
            ExportFormat::Md => MARKDOWN_FILENAME,
            ExportFormat::Csv => CSV_FILENAME,
        }
    }

    pub fn render(&self, posts: &[Post]) -> Result<String> {
        match self {
            ExportFormat::Md => Ok(to_markdown(posts)),
            ExportFormat::Csv => to_csv(posts),
        }
    }
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn to_markdown(posts: &[Post]) -> String {
    let mut md = String::from("# LinkedIn Drafts\n\n");

    for post in posts {
        let _ = writeln!(md, "## Draft (ID: {}, Status: {})", post.id, post.status);
        let _ = writeln!(md, "**Created:** {}\n", timestamp(&post.created_at));
        let _ = writeln!(md, "{}\n", post.content);
        let _ = writeln!(md, "**Hashtags:** {}\n", post.hashtags);
        md.push_str("---\n\n");
    }

    md
}

/// Header plus one row per post; nothing at all when there are no posts
pub fn to_csv(posts: &[Post]) -> Result<String> {
    if posts.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for post in posts {
        writer.write_record([
            post.id.to_string(),
            post.content.clone(),
            post.hashtags.clone(),
            post.status.to_string(),
            timestamp(&post.created_at),
            post.posted_at.as_ref().map(timestamp).unwrap_or_default(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::PostStatus;
    use chrono::TimeZone;

    fn post(id: i64, status: PostStatus) -> Post {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        Post {
            id,
            content: "Shipping, finally \"done\"".to_string(),
            hashtags: "#rust, #shipping".to_string(),
            status,
            created_at: created,
            posted_at: (status == PostStatus::Posted)
                .then(|| Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_markdown_layout() {
        let md = to_markdown(&[post(7, PostStatus::Draft)]);
        assert_eq!(
            md,
            "# LinkedIn Drafts\n\n## Draft (ID: 7, Status: draft)\n**Created:** 2024-05-01 09:30:00\n\nShipping, finally \"done\"\n\n**Hashtags:** #rust, #shipping\n\n---\n\n"
        );
    }

    #[test]
    fn test_markdown_empty() {
        assert_eq!(to_markdown(&[]), "# LinkedIn Drafts\n\n");
    }

    #[test]
    fn test_csv_quotes_and_header() {
        let csv = to_csv(&[post(1, PostStatus::Posted)]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,content,hashtags,status,created_at,posted_at"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1,\"Shipping, finally \"\"done\"\"\",\"#rust, #shipping\",posted,2024-05-01 09:30:00,2024-05-02 10:00:00"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_empty_has_no_header() {
        assert_eq!(to_csv(&[]).unwrap(), "");
    }

    #[test]
    fn test_format_parsing() {
        use clap::ValueEnum;
        assert_eq!(ExportFormat::from_str("MD", true).unwrap(), ExportFormat::Md);
        assert_eq!(ExportFormat::from_str("csv", false).unwrap(), ExportFormat::Csv);
        assert!(ExportFormat::from_str("pdf", true).is_err());
        assert_eq!(ExportFormat::Csv.filename(), CSV_FILENAME);
    }
}
