pub mod error;
pub mod types;

pub use error::{MastodonError, Result};
pub use types::{Account, NewPoll, NewStatus, Status, StatusPoll, Tag};

/// Thin client for the Mastodon REST API: hashtag timelines in,
/// statuses with polls out. All decision logic lives upstream.
pub struct MastodonClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl MastodonClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// The account the token belongs to. Used once at startup to learn the
    /// bot's own handle for self-exclusion.
    pub async fn verify_credentials(&self) -> Result<Account> {
        self.check_token()?;
        let url = format!("{}/api/v1/accounts/verify_credentials", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MastodonError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }

    /// Fetch the public timeline for one hashtag (without the leading `#`).
    pub async fn timeline_hashtag(&self, tag: &str, limit: u32) -> Result<Vec<Status>> {
        self.check_token()?;
        let tag = tag.trim_start_matches('#');
        let url = format!(
            "{}/api/v1/timelines/tag/{}?limit={}",
            self.base_url, tag, limit
        );
        tracing::debug!(tag, limit, "Fetching hashtag timeline");

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MastodonError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let statuses: Vec<Status> = resp.json().await?;
        tracing::debug!(tag, count = statuses.len(), "Fetched statuses");
        Ok(statuses)
    }

    /// Post a status carrying a single-choice poll.
    pub async fn post_poll(
        &self,
        status_text: &str,
        options: Vec<String>,
        expires_in_seconds: u64,
    ) -> Result<Status> {
        self.check_token()?;
        let body = NewStatus {
            status: status_text.to_string(),
            poll: NewPoll {
                options,
                expires_in: expires_in_seconds,
                multiple: false,
            },
        };

        let url = format!("{}/api/v1/statuses", self.base_url);
        tracing::info!(expires_in_seconds, "Posting status with poll");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MastodonError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }

    fn check_token(&self) -> Result<()> {
        if self.token.is_empty() {
            return Err(MastodonError::MissingToken);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = MastodonClient::new("https://stranger.social/", "tok");
        assert_eq!(client.base_url, "https://stranger.social");
    }

    #[tokio::test]
    async fn empty_token_is_rejected_before_any_request() {
        let client = MastodonClient::new("https://stranger.social", "");
        let err = client.timeline_hashtag("uspol", 10).await.unwrap_err();
        assert!(matches!(err, MastodonError::MissingToken));
    }

    #[test]
    fn status_deserializes_from_api_shape() {
        let json = r#"{
            "id": "111",
            "content": "<p>hello</p>",
            "created_at": "2025-11-02T10:00:00.000Z",
            "url": "https://stranger.social/@a/111",
            "account": {"username": "Alice", "acct": "alice@stranger.social"},
            "tags": [{"name": "uspol"}],
            "poll": null
        }"#;
        let status: Status = serde_json::from_str(json).unwrap();
        assert_eq!(status.id, "111");
        assert_eq!(status.account.username, "Alice");
        assert_eq!(status.tags[0].name, "uspol");
    }
}
