use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A normalized Mastodon post — the universal currency of the pipeline.
/// Transport-specific payloads are converted into this and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Status id, unique per instance.
    pub id: String,
    /// Raw HTML body as returned by the API.
    pub body: String,
    /// Publication time, normalized to UTC. `None` when the source value
    /// could not be parsed — downstream time filtering fails open on it.
    pub created_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
    /// Author handle, lowercase, without the leading `@`.
    pub author: String,
    pub tags: Vec<String>,
}

/// A single answer option in a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    #[serde(default)]
    pub vote_count: u32,
}

impl PollOption {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            vote_count: 0,
        }
    }
}

/// The poll payload itself, as it will be posted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollData {
    pub question: String,
    pub options: Vec<PollOption>,
    pub duration_hours: i64,
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Free-text justification from the generator, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Where a poll sits in the moderation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    Pending,
    Approved,
    Rejected,
    Posted,
    Failed,
}

impl PollStatus {
    pub const ALL: [PollStatus; 5] = [
        PollStatus::Pending,
        PollStatus::Approved,
        PollStatus::Rejected,
        PollStatus::Posted,
        PollStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Posted => "posted",
            Self::Failed => "failed",
        }
    }

    /// The lifecycle state machine. `Failed` re-enters the publish edge so
    /// an operator can re-queue a post action; nothing returns to `Pending`.
    pub fn can_transition_to(&self, next: PollStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Posted)
                | (Self::Approved, Self::Failed)
                | (Self::Failed, Self::Posted)
                | (Self::Failed, Self::Failed)
        )
    }

    /// No outgoing edges at all.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Posted)
    }
}

impl std::fmt::Display for PollStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PollStatus {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "posted" => Ok(Self::Posted),
            "failed" => Ok(Self::Failed),
            _ => Err(anyhow::anyhow!("Unknown poll status: {}", s)),
        }
    }
}

/// Generate a poll id in the `poll_<12 hex>` form used across storage keys.
pub fn generate_poll_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("poll_{}", &hex[..12])
}

/// The aggregate root: a generated poll plus its moderation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollRecord {
    pub id: String,
    pub data: PollData,
    pub status: PollStatus,
    /// Ids of the posts selected as grounding evidence, best first.
    #[serde(default)]
    pub grounding_post_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub moderated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub moderator_notes: String,
    #[serde(default)]
    pub published_poll_ref: Option<String>,
    #[serde(default)]
    pub published_url: Option<String>,
    /// Last publish failure, kept for operator visibility.
    #[serde(default)]
    pub publish_error: Option<String>,
}

impl PollRecord {
    /// Create a fresh pending record with a generated id.
    pub fn new(data: PollData, grounding_post_ids: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_poll_id(),
            data,
            status: PollStatus::Pending,
            grounding_post_ids,
            created_at: now,
            updated_at: now,
            moderated_at: None,
            moderator_notes: String::new(),
            published_poll_ref: None,
            published_url: None,
            publish_error: None,
        }
    }

    /// Stamp `updated_at`. Every lifecycle transition goes through this.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Aggregate counts derived from the status index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollStatistics {
    pub total_polls: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub posted: u64,
    pub failed: u64,
}

impl PollStatistics {
    pub fn count_for(&self, status: PollStatus) -> u64 {
        match status {
            PollStatus::Pending => self.pending,
            PollStatus::Approved => self.approved,
            PollStatus::Rejected => self.rejected,
            PollStatus::Posted => self.posted,
            PollStatus::Failed => self.failed,
        }
    }

    pub fn set_count(&mut self, status: PollStatus, count: u64) {
        match status {
            PollStatus::Pending => self.pending = count,
            PollStatus::Approved => self.approved = count,
            PollStatus::Rejected => self.rejected = count,
            PollStatus::Posted => self.posted = count,
            PollStatus::Failed => self.failed = count,
        }
    }
}
