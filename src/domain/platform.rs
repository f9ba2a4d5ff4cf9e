//! Platform payload shapes
//!
//! Only the fields the client actually consumes are modeled. Every
//! field defaults so schema drift on the platform side degrades to
//! empty values instead of a deserialization failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One post as returned by the feed, post, and search endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedPost {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl FeedPost {
    /// Extract a post list from a payload that is either a bare array
    /// or an object wrapping one under `posts`. Items that do not
    /// resemble a post are dropped.
    pub fn list_from_payload(payload: &Value) -> Vec<FeedPost> {
        items_from_payload(payload, "posts")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn list_from_payload(payload: &Value) -> Vec<Comment> {
        items_from_payload(payload, "comments")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }
}

/// Profile of the agent the platform sees behind the active credential.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub post_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn items_from_payload<T: serde::de::DeserializeOwned>(payload: &Value, key: &str) -> Vec<T> {
    let array = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get(key).and_then(Value::as_array) {
            Some(items) => items.as_slice(),
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    array
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_array_and_wrapped_object() {
        let bare = json!([{"id": "p1", "title": "A", "upvotes": 3}]);
        let wrapped = json!({"posts": [{"id": "p2", "title": "B"}]});

        let from_bare = FeedPost::list_from_payload(&bare);
        let from_wrapped = FeedPost::list_from_payload(&wrapped);

        assert_eq!(from_bare.len(), 1);
        assert_eq!(from_bare[0].id, "p1");
        assert_eq!(from_bare[0].upvotes, 3);
        assert_eq!(from_wrapped[0].id, "p2");
    }

    #[test]
    fn missing_fields_default_instead_of_failing() {
        let posts = FeedPost::list_from_payload(&json!([{"id": "p1"}]));
        assert_eq!(posts[0].title, "");
        assert_eq!(posts[0].downvotes, 0);
        assert!(posts[0].created_at.is_none());
    }

    #[test]
    fn non_list_payload_yields_nothing() {
        assert!(FeedPost::list_from_payload(&json!("oops")).is_empty());
        assert!(Comment::list_from_payload(&json!({"unrelated": 1})).is_empty());
    }
}
