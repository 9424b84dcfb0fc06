//! The poll lifecycle controller.
//!
//! Enforces the status state machine and the edit/moderate/delete rules
//! tied to it. A rule breach returns a descriptive StateViolation without
//! touching the record; storage problems surface as Storage errors.
//! Concurrent moderations of the same poll are last-writer-wins by design.

use chrono::Utc;
use tracing::{error, info, warn};

use pollcycle_common::{PollError, PollOption, PollRecord, PollStatus};
use pollcycle_store::PollStore;

use crate::builder::{truncate_chars, MAX_OPTIONS, MAX_OPTION_CHARS, MAX_QUESTION_CHARS, MIN_OPTIONS};
use crate::traits::PollPublisher;

/// Operator edits to a pending poll.
#[derive(Debug, Clone, Default)]
pub struct EditRequest {
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    pub duration_hours: Option<i64>,
}

/// A moderation decision, optionally carrying inline edits.
#[derive(Debug, Clone)]
pub struct ModerationDecision {
    pub approve: bool,
    pub edited_question: Option<String>,
    pub edited_options: Option<Vec<String>>,
    pub moderator_notes: Option<String>,
}

impl ModerationDecision {
    pub fn approve() -> Self {
        Self {
            approve: true,
            edited_question: None,
            edited_options: None,
            moderator_notes: None,
        }
    }

    pub fn reject() -> Self {
        Self {
            approve: false,
            edited_question: None,
            edited_options: None,
            moderator_notes: None,
        }
    }
}

pub struct LifecycleController<S> {
    store: S,
}

impl<S: PollStore> LifecycleController<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn load(&self, poll_id: &str) -> Result<PollRecord, PollError> {
        self.store
            .get_poll(poll_id)
            .await
            .map_err(|e| PollError::Storage(e.to_string()))?
            .ok_or_else(|| PollError::NotFound(poll_id.to_string()))
    }

    async fn save(&self, poll: &PollRecord) -> Result<(), PollError> {
        self.store
            .save_poll(poll)
            .await
            .map_err(|e| PollError::Storage(e.to_string()))
    }

    /// Edit question/options/duration. Pending polls only.
    pub async fn edit_poll(&self, poll_id: &str, edit: EditRequest) -> Result<PollRecord, PollError> {
        let mut poll = self.load(poll_id).await?;

        if poll.status != PollStatus::Pending {
            return Err(PollError::StateViolation(format!(
                "Cannot edit poll with status {}; only pending polls can be edited",
                poll.status
            )));
        }

        if let Some(question) = edit.question {
            poll.data.question = validate_question(&question)?;
        }
        if let Some(options) = edit.options {
            poll.data.options = validate_options(&options)?;
        }
        if let Some(hours) = edit.duration_hours {
            if !(1..=168).contains(&hours) {
                return Err(PollError::Validation(
                    "Duration must be between 1 and 168 hours".to_string(),
                ));
            }
            poll.data.duration_hours = hours;
        }

        poll.touch();
        self.save(&poll).await?;
        Ok(poll)
    }

    /// Approve or reject a pending poll. Approval may apply inline edits.
    pub async fn moderate(
        &self,
        poll_id: &str,
        decision: ModerationDecision,
    ) -> Result<PollRecord, PollError> {
        let mut poll = self.load(poll_id).await?;

        if poll.status != PollStatus::Pending {
            return Err(PollError::StateViolation(format!(
                "Poll {} has already been moderated (status: {})",
                poll.id, poll.status
            )));
        }

        if decision.approve {
            if let Some(question) = decision.edited_question {
                poll.data.question = validate_question(&question)?;
            }
            if let Some(options) = decision.edited_options {
                poll.data.options = validate_options(&options)?;
            }
            poll.status = PollStatus::Approved;
        } else {
            poll.status = PollStatus::Rejected;
        }

        if let Some(notes) = decision.moderator_notes {
            poll.moderator_notes = notes;
        }
        poll.moderated_at = Some(Utc::now());
        poll.touch();
        self.save(&poll).await?;

        info!(poll_id = %poll.id, status = %poll.status, "Poll moderated");
        Ok(poll)
    }

    /// Strict delete: pending polls only.
    pub async fn delete_poll(&self, poll_id: &str) -> Result<(), PollError> {
        let poll = self.load(poll_id).await?;
        if poll.status != PollStatus::Pending {
            return Err(PollError::StateViolation(format!(
                "Cannot delete poll with status {}; only pending polls can be deleted",
                poll.status
            )));
        }
        self.remove(&poll).await
    }

    /// Loose bulk-path delete: anything except posted polls.
    /// Published polls are never retroactively deleted.
    pub async fn purge_poll(&self, poll_id: &str) -> Result<(), PollError> {
        let poll = self.load(poll_id).await?;
        if poll.status == PollStatus::Posted {
            return Err(PollError::StateViolation(
                "Cannot delete posted polls".to_string(),
            ));
        }
        self.remove(&poll).await
    }

    async fn remove(&self, poll: &PollRecord) -> Result<(), PollError> {
        let deleted = self
            .store
            .delete_poll(&poll.id)
            .await
            .map_err(|e| PollError::Storage(e.to_string()))?;
        if !deleted {
            return Err(PollError::NotFound(poll.id.clone()));
        }
        Ok(())
    }

    /// Post an approved poll to the network. Success transitions to
    /// `posted` and records the published reference; failure transitions to
    /// `failed` with the error preserved on the record — the caller reads
    /// the outcome from the returned record's status.
    pub async fn publish(
        &self,
        poll_id: &str,
        publisher: &dyn PollPublisher,
    ) -> Result<PollRecord, PollError> {
        let mut poll = self.load(poll_id).await?;

        if !matches!(poll.status, PollStatus::Approved | PollStatus::Failed) {
            return Err(PollError::StateViolation(format!(
                "Poll must be approved before posting (current status: {})",
                poll.status
            )));
        }

        let options: Vec<String> = poll.data.options.iter().map(|o| o.text.clone()).collect();
        let status_text = if poll.data.hashtags.is_empty() {
            poll.data.question.clone()
        } else {
            format!("{} {}", poll.data.question, poll.data.hashtags.join(" "))
        };

        match publisher
            .publish(&status_text, &options, poll.data.duration_hours)
            .await
        {
            Ok(published) => {
                poll.status = PollStatus::Posted;
                poll.published_poll_ref = published.poll_ref;
                poll.published_url = published.url;
                poll.publish_error = None;
                info!(poll_id = %poll.id, url = ?poll.published_url, "Poll posted");
            }
            Err(e) => {
                poll.status = PollStatus::Failed;
                poll.publish_error = Some(e.to_string());
                error!(poll_id = %poll.id, error = %e, "Publishing poll failed");
            }
        }

        poll.touch();
        if let Err(e) = self.save(&poll).await {
            warn!(poll_id = %poll.id, error = %e, "Failed to persist publish outcome");
            return Err(e);
        }
        Ok(poll)
    }
}

fn validate_question(question: &str) -> Result<String, PollError> {
    let question = truncate_chars(question.trim(), MAX_QUESTION_CHARS);
    if question.is_empty() {
        return Err(PollError::Validation("Question cannot be empty".to_string()));
    }
    Ok(question)
}

fn validate_options(options: &[String]) -> Result<Vec<PollOption>, PollError> {
    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
        return Err(PollError::Validation(
            "Polls must have 2-4 options".to_string(),
        ));
    }
    let validated: Vec<PollOption> = options
        .iter()
        .map(|opt| truncate_chars(opt.trim(), MAX_OPTION_CHARS))
        .filter(|opt| !opt.is_empty())
        .map(PollOption::new)
        .collect();
    if validated.len() != options.len() {
        return Err(PollError::Validation(
            "Options cannot be empty".to_string(),
        ));
    }
    Ok(validated)
}
