use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder shown for bookmarks saved without a title.
pub const NO_TITLE: &str = "No Title";

/// Represents a saved bookmark as returned by the bookmarks table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    /// The title to show, falling back to [`NO_TITLE`] when it is absent or empty.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => NO_TITLE,
        }
    }
}

/// Insert payload for a new bookmark. Id and timestamp are assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBookmark {
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Storage may key rows by uuid or by bigint; both are carried as strings.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
