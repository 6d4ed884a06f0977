//! Records persisted by the resource handlers
//!
//! Field names follow the JSON wire format (camelCase).

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_AUTHOR: &str = "anonymous";
pub const NO_ANNOUNCEMENT: &str = "no announcement";

/// Forum post, immutable once appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub content: String,
    pub author: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Post {
    /// Blank or missing authors become [`DEFAULT_AUTHOR`]
    pub fn new(content: String, author: Option<String>) -> Self {
        let author = author
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        Self {
            id: new_id(),
            content,
            author,
            timestamp: now_millis(),
        }
    }
}

/// The site-wide announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub content: String,
    /// ISO-8601, `None` until the first update
    pub updated_at: Option<String>,
}

/// User submission, immutable once appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    /// Trimmed, never empty
    pub message: String,
    pub timestamp: i64,
    pub origin_ip: Option<String>,
}

impl Submission {
    pub fn new(message: &str, origin_ip: Option<String>) -> Self {
        Self {
            id: new_id(),
            message: message.trim().to_string(),
            timestamp: now_millis(),
            origin_ip,
        }
    }
}

/// Time-ordered unique identifier
fn new_id() -> String {
    Uuid::now_v7().to_string()
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time as `2024-05-01T12:00:00.000Z`
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_post_defaults_author() {
        assert_eq!(Post::new("hi".to_string(), None).author, "anonymous");
        assert_eq!(Post::new("hi".to_string(), Some("  ".to_string())).author, "anonymous");
        assert_eq!(Post::new("hi".to_string(), Some(" bob ".to_string())).author, "bob");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Post::new("a".to_string(), None);
        let b = Post::new("a".to_string(), None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_submission_wire_format() {
        let submission = Submission {
            id: "id-1".to_string(),
            message: "hello".to_string(),
            timestamp: 1_700_000_000_000,
            origin_ip: None,
        };
        assert_eq!(
            serde_json::to_value(&submission).unwrap(),
            serde_json::json!({
                "id": "id-1",
                "message": "hello",
                "timestamp": 1_700_000_000_000_i64,
                "originIp": null,
            })
        );
    }

    #[test]
    fn test_submission_trims_message() {
        let submission = Submission::new("  spaced out \n", Some("10.0.0.1".to_string()));
        assert_eq!(submission.message, "spaced out");
    }

    #[test]
    fn test_iso_timestamp_shape() {
        let ts = now_iso8601();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
