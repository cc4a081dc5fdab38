//! Remote-owned blog posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::validation::ValidationError;

/// Server-assigned post identifier. Backends hand out either numbers or strings;
/// both are keyed locally by their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostId {
    Num(u64),
    Text(String),
}

impl PostId {
    /// Parse user input, preferring the numeric form.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<u64>() {
            Ok(n) => Self::Num(n),
            Err(_) => Self::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for PostId {
    fn from(value: u64) -> Self {
        Self::Num(value)
    }
}

/// Canonical server representation of a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "body")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Post {
    /// First `max_chars` characters of the content, for list views.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let flat = self.content.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= max_chars {
            return flat;
        }
        let mut out: String = flat.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}

/// Body of a create request: a post minus server-assigned fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPayload {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl PostPayload {
    /// Trim inputs, drop blank optionals and require title and content.
    pub fn normalized(self) -> Result<Self, ValidationError> {
        let title = self.title.trim().to_string();
        let content = self.content.trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::Required("title"));
        }
        if content.is_empty() {
            return Err(ValidationError::Required("content"));
        }
        Ok(Self {
            title,
            content,
            author: non_blank(self.author),
            image_url: non_blank(self.image_url),
        })
    }
}

/// Partial update body. Absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.author.is_none()
            && self.image_url.is_none()
    }

    /// Present title/content must not be blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(&self.title, Some(t) if t.trim().is_empty()) {
            return Err(ValidationError::Required("title"));
        }
        if matches!(&self.content, Some(c) if c.trim().is_empty()) {
            return Err(ValidationError::Required("content"));
        }
        Ok(())
    }

    /// Merge the present fields into `post`.
    ///
    /// The store never calls this for remote posts; it only takes server
    /// representations. Used by fake backends and previews.
    pub fn apply(&self, post: &mut Post) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(content) = &self.content {
            post.content = content.clone();
        }
        if let Some(author) = &self.author {
            post.author = Some(author.clone());
        }
        if let Some(image_url) = &self.image_url {
            post.image_url = Some(image_url.clone());
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_id_accepts_numbers_and_strings() {
        let num: PostId = serde_json::from_str("17").unwrap();
        let text: PostId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(num, PostId::Num(17));
        assert_eq!(text, PostId::Text("abc".to_string()));
        assert_eq!(num.to_string(), "17");
        assert_eq!(PostId::parse(" 42 "), PostId::Num(42));
    }

    #[test]
    fn test_post_reads_body_alias() {
        let post: Post =
            serde_json::from_str(r#"{"id": 1, "title": "Hi", "body": "text", "userId": 3}"#)
                .unwrap();
        assert_eq!(post.content, "text");
        assert!(post.created_at.is_none());
    }

    #[test]
    fn test_payload_requires_title_and_content() {
        let payload = PostPayload {
            title: "  ".to_string(),
            content: "body".to_string(),
            ..PostPayload::default()
        };
        assert_eq!(payload.normalized(), Err(ValidationError::Required("title")));

        let payload = PostPayload {
            title: "Title".to_string(),
            content: "\n".to_string(),
            ..PostPayload::default()
        };
        assert_eq!(
            payload.normalized(),
            Err(ValidationError::Required("content"))
        );
    }

    #[test]
    fn test_payload_drops_blank_optionals() {
        let payload = PostPayload {
            title: " Title ".to_string(),
            content: "Body".to_string(),
            author: Some(" ".to_string()),
            image_url: Some("https://example.com/a.png".to_string()),
        }
        .normalized()
        .unwrap();
        assert_eq!(payload.title, "Title");
        assert!(payload.author.is_none());
        assert!(payload.image_url.is_some());
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = PostPatch {
            title: Some("Updated!".to_string()),
            ..PostPatch::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"title": "Updated!"}));
    }

    #[test]
    fn test_excerpt_truncates_long_content() {
        let post = Post {
            id: PostId::Num(1),
            title: "t".to_string(),
            content: "one two\nthree four".to_string(),
            author: None,
            image_url: None,
            created_at: None,
            updated_at: None,
        };
        assert_eq!(post.excerpt(100), "one two three four");
        assert_eq!(post.excerpt(7), "one two…");
    }
}
