//! Candidate validation and PollRecord assembly.
//!
//! Malformed candidates are dropped silently (the cycle continues with the
//! rest); everything that survives gets truncated into platform limits,
//! grounded on the best-scoring posts, and stored as `pending`.

use tracing::debug;

use pollcycle_common::{AppSettings, PollData, PollOption, PollRecord, Post};

use crate::generate::RawCandidate;
use crate::hashtags;
use crate::relevance;

pub const MAX_QUESTION_CHARS: usize = 300;
pub const MAX_OPTION_CHARS: usize = 50;
pub const MAX_OPTIONS: usize = 4;
pub const MIN_OPTIONS: usize = 2;
/// Grounding posts attached to one poll.
pub const MAX_GROUNDING_POSTS: usize = 10;
/// Eligible posts considered for scoring.
pub const SCORING_POOL: usize = 50;
/// Posts taken as evidence when nothing scores above zero.
pub const FALLBACK_GROUNDING: usize = 5;
pub const DEFAULT_DURATION_HOURS: i64 = 24;

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Validate and assemble one candidate into a pending PollRecord.
/// Returns None when the candidate is unusable: empty question, or fewer
/// than two non-empty options after truncation.
pub fn build_candidate(
    raw: RawCandidate,
    eligible_posts: &[Post],
    settings: &AppSettings,
) -> Option<PollRecord> {
    let question = truncate_chars(raw.question.trim(), MAX_QUESTION_CHARS);
    if question.is_empty() {
        debug!("Dropping candidate with empty question");
        return None;
    }

    let options: Vec<PollOption> = raw
        .options
        .iter()
        .map(|opt| truncate_chars(opt.trim(), MAX_OPTION_CHARS))
        .filter(|opt| !opt.is_empty())
        .take(MAX_OPTIONS)
        .map(PollOption::new)
        .collect();
    if options.len() < MIN_OPTIONS {
        debug!(question = %question, "Dropping candidate with fewer than two options");
        return None;
    }

    let duration_hours = match raw.duration_hours {
        Some(hours) if hours.is_finite() => (hours.round() as i64).clamp(1, 168),
        _ => DEFAULT_DURATION_HOURS,
    };

    let grounding = select_grounding(&question, &options, eligible_posts);

    let llm_tags: Vec<String> = raw.hashtags;
    let composed = hashtags::compose(&grounding, &llm_tags, &settings.hashtags);
    let composed = hashtags::enforce_combined_cap(&question, composed);

    let data = PollData {
        question,
        options,
        duration_hours,
        hashtags: composed,
        rationale: raw.rationale,
    };
    let grounding_ids = grounding.iter().map(|p| p.id.clone()).collect();

    Some(PollRecord::new(data, grounding_ids))
}

/// Rank eligible posts against the candidate and pick the evidence set:
/// up to [`MAX_GROUNDING_POSTS`] posts with score > 0 (stable order on
/// ties), or the first [`FALLBACK_GROUNDING`] eligible posts when nothing
/// overlaps lexically — every poll keeps *some* traceable evidence.
fn select_grounding(
    question: &str,
    options: &[PollOption],
    eligible_posts: &[Post],
) -> Vec<Post> {
    let pool = &eligible_posts[..eligible_posts.len().min(SCORING_POOL)];
    let option_texts: Vec<String> = options.iter().map(|o| o.text.clone()).collect();

    let mut scored: Vec<(usize, &Post)> = pool
        .iter()
        .map(|post| (relevance::score(question, &option_texts, post), post))
        .collect();
    // sort_by is stable: ties keep fetch order.
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let grounded: Vec<Post> = scored
        .iter()
        .filter(|(score, _)| *score > 0)
        .take(MAX_GROUNDING_POSTS)
        .map(|(_, post)| (*post).clone())
        .collect();

    if grounded.is_empty() {
        pool.iter().take(FALLBACK_GROUNDING).cloned().collect()
    } else {
        grounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(question: &str, options: &[&str]) -> RawCandidate {
        RawCandidate {
            question: question.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            ..Default::default()
        }
    }

    fn post(id: &str, body: &str) -> Post {
        Post {
            id: id.to_string(),
            body: body.to_string(),
            created_at: None,
            url: None,
            author: "alice".to_string(),
            tags: vec![],
        }
    }

    #[test]
    fn empty_question_is_dropped() {
        let raw = candidate("   ", &["A", "B"]);
        assert!(build_candidate(raw, &[], &AppSettings::default()).is_none());
    }

    #[test]
    fn fewer_than_two_options_is_dropped() {
        let raw = candidate("Q?", &["Only one"]);
        assert!(build_candidate(raw, &[], &AppSettings::default()).is_none());
        let raw = candidate("Q?", &[]);
        assert!(build_candidate(raw, &[], &AppSettings::default()).is_none());
        // Whitespace options do not count.
        let raw = candidate("Q?", &["A", "   "]);
        assert!(build_candidate(raw, &[], &AppSettings::default()).is_none());
    }

    #[test]
    fn question_and_options_are_truncated() {
        let long_question = "q".repeat(400);
        let long_option = "o".repeat(80);
        let raw = candidate(&long_question, &[&long_option, "B"]);
        let poll = build_candidate(raw, &[], &AppSettings::default()).unwrap();
        assert_eq!(poll.data.question.chars().count(), MAX_QUESTION_CHARS);
        assert_eq!(poll.data.options[0].text.chars().count(), MAX_OPTION_CHARS);
    }

    #[test]
    fn options_capped_at_four() {
        let raw = candidate("Q?", &["A", "B", "C", "D", "E", "F"]);
        let poll = build_candidate(raw, &[], &AppSettings::default()).unwrap();
        assert_eq!(poll.data.options.len(), MAX_OPTIONS);
        assert_eq!(poll.data.options[0].text, "A");
        assert_eq!(poll.data.options[3].text, "D");
    }

    #[test]
    fn duration_defaults_and_clamps() {
        let raw = candidate("Q?", &["A", "B"]);
        let poll = build_candidate(raw, &[], &AppSettings::default()).unwrap();
        assert_eq!(poll.data.duration_hours, DEFAULT_DURATION_HOURS);

        let mut raw = candidate("Q?", &["A", "B"]);
        raw.duration_hours = Some(0.0);
        let poll = build_candidate(raw, &[], &AppSettings::default()).unwrap();
        assert_eq!(poll.data.duration_hours, 1);

        let mut raw = candidate("Q?", &["A", "B"]);
        raw.duration_hours = Some(500.0);
        let poll = build_candidate(raw, &[], &AppSettings::default()).unwrap();
        assert_eq!(poll.data.duration_hours, 168);

        let mut raw = candidate("Q?", &["A", "B"]);
        raw.duration_hours = Some(48.0);
        let poll = build_candidate(raw, &[], &AppSettings::default()).unwrap();
        assert_eq!(poll.data.duration_hours, 48);
    }

    #[test]
    fn new_records_start_pending() {
        let raw = candidate("Q?", &["A", "B"]);
        let poll = build_candidate(raw, &[], &AppSettings::default()).unwrap();
        assert_eq!(poll.status, pollcycle_common::PollStatus::Pending);
        assert!(poll.id.starts_with("poll_"));
        assert!(poll.moderated_at.is_none());
    }

    #[test]
    fn grounding_prefers_scoring_posts_capped_at_ten() {
        let mut posts: Vec<Post> = (0..15)
            .map(|i| post(&format!("match-{i}"), "<p>Senate budget vote</p>"))
            .collect();
        posts.push(post("noise", "<p>cat pictures</p>"));

        let raw = candidate("Senate budget vote?", &["Yes", "No"]);
        let poll = build_candidate(raw, &posts, &AppSettings::default()).unwrap();
        assert_eq!(poll.grounding_post_ids.len(), MAX_GROUNDING_POSTS);
        assert!(poll
            .grounding_post_ids
            .iter()
            .all(|id| id.starts_with("match-")));
    }

    #[test]
    fn zero_scores_fall_back_to_first_five() {
        let posts: Vec<Post> = (0..8)
            .map(|i| post(&format!("p{i}"), "<p>completely unrelated chatter</p>"))
            .collect();

        let raw = candidate("Quantum sandwich policy?", &["Yea", "Nay"]);
        let poll = build_candidate(raw, &posts, &AppSettings::default()).unwrap();
        assert_eq!(
            poll.grounding_post_ids,
            vec!["p0", "p1", "p2", "p3", "p4"],
            "fallback keeps fetch order"
        );
    }

    #[test]
    fn grounding_ties_keep_fetch_order() {
        let posts = vec![
            post("first", "<p>budget talk</p>"),
            post("second", "<p>budget talk</p>"),
        ];
        let raw = candidate("Budget?", &["Yes", "No"]);
        let poll = build_candidate(raw, &posts, &AppSettings::default()).unwrap();
        assert_eq!(poll.grounding_post_ids, vec!["first", "second"]);
    }

    #[test]
    fn hashtags_fall_back_to_watchlist() {
        let raw = candidate("Q?", &["A", "B"]);
        let poll = build_candidate(raw, &[], &AppSettings::default()).unwrap();
        assert_eq!(poll.data.hashtags, vec!["#uspol"]);
    }

    #[test]
    fn combined_cap_enforced_after_composition() {
        let mut raw = candidate(&"x".repeat(300), &["A", "B"]);
        raw.hashtags = vec!["#a".repeat(100)];
        let mut settings = AppSettings::default();
        settings.hashtags = vec![];
        let poll = build_candidate(raw, &[], &settings).unwrap();
        assert!(
            poll.data.hashtags.is_empty(),
            "oversized tag must be trimmed away under the 500-char cap"
        );
    }
}
