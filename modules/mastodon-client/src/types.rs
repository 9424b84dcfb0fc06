use serde::{Deserialize, Serialize};

/// A status from a timeline or a post response.
/// `created_at` stays a raw string; callers parse it leniently.
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub created_at: Option<String>,
    pub url: Option<String>,
    pub account: Account,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub poll: Option<StatusPoll>,
}

/// The posting account attached to a status.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub username: String,
    /// Webfinger-style handle, possibly `user@remote.instance`.
    #[serde(default)]
    pub acct: String,
}

/// A hashtag reference attached to a status.
#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// Poll metadata on a posted status.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusPoll {
    pub id: String,
    #[serde(default)]
    pub options: Vec<StatusPollOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusPollOption {
    pub title: String,
    pub votes_count: Option<u32>,
}

/// Request body for `POST /api/v1/statuses` with a poll attached.
#[derive(Debug, Clone, Serialize)]
pub struct NewStatus {
    pub status: String,
    pub poll: NewPoll,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPoll {
    pub options: Vec<String>,
    /// Seconds until the poll closes.
    pub expires_in: u64,
    pub multiple: bool,
}
