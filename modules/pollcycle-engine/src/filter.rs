//! Post eligibility filtering — the first pipeline stage.
//!
//! Pure function: the used-post set is only read here; marking posts used
//! happens at build time, so posts dropped for other reasons in one cycle
//! stay eligible grounding candidates in later cycles.

use std::collections::HashSet;

use chrono::{Duration, Utc};

use pollcycle_common::{AppSettings, Post};

/// Result of one filter pass.
#[derive(Debug)]
pub struct FilterOutcome {
    pub eligible: Vec<Post>,
    pub filtered: u32,
}

/// Lowercase a handle and strip a leading `@` for comparison.
fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}

/// Apply the eligibility rules in order; each post is dropped at the first
/// rule it fails:
/// 1. excluded author, or the bot's own handle (unconditional);
/// 2. older than the time window — skipped entirely when the timestamp
///    could not be parsed (fails open);
/// 3. already consumed as grounding evidence, when that exclusion is on.
pub fn filter_posts(
    posts: Vec<Post>,
    settings: &AppSettings,
    used: &HashSet<String>,
    bot_handle: &str,
) -> FilterOutcome {
    let bot = normalize_handle(bot_handle);
    let excluded: HashSet<String> = settings
        .excluded_accounts
        .iter()
        .map(|a| normalize_handle(a))
        .collect();
    let cutoff = Utc::now() - Duration::hours(settings.time_window_hours);

    let mut eligible = Vec::new();
    let mut filtered = 0u32;

    for post in posts {
        let author = normalize_handle(&post.author);

        if (!bot.is_empty() && author == bot) || excluded.contains(&author) {
            filtered += 1;
            continue;
        }

        if let Some(created_at) = post.created_at {
            if created_at < cutoff {
                filtered += 1;
                continue;
            }
        }

        if settings.exclude_used_posts && used.contains(&post.id) {
            filtered += 1;
            continue;
        }

        eligible.push(post);
    }

    FilterOutcome { eligible, filtered }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, author: &str, age_hours: Option<i64>) -> Post {
        Post {
            id: id.to_string(),
            body: "<p>news</p>".to_string(),
            created_at: age_hours.map(|h| Utc::now() - Duration::hours(h)),
            url: None,
            author: author.to_string(),
            tags: vec!["uspol".to_string()],
        }
    }

    #[test]
    fn bot_posts_excluded_regardless_of_config() {
        let settings = AppSettings::default();
        assert!(settings.excluded_accounts.is_empty());

        let posts = vec![post("1", "pollbot", Some(1)), post("2", "alice", Some(1))];
        let outcome = filter_posts(posts, &settings, &HashSet::new(), "@PollBot");
        assert_eq!(outcome.eligible.len(), 1);
        assert_eq!(outcome.eligible[0].id, "2");
        assert_eq!(outcome.filtered, 1);
    }

    #[test]
    fn empty_bot_handle_excludes_nothing() {
        let posts = vec![post("1", "alice", Some(1))];
        let outcome = filter_posts(posts, &AppSettings::default(), &HashSet::new(), "");
        assert_eq!(outcome.eligible.len(), 1);
    }

    #[test]
    fn excluded_accounts_match_case_insensitively_with_at() {
        let mut settings = AppSettings::default();
        settings.excluded_accounts = vec!["@Spammer".to_string()];

        let posts = vec![post("1", "SPAMMER", Some(1)), post("2", "alice", Some(1))];
        let outcome = filter_posts(posts, &settings, &HashSet::new(), "bot");
        assert_eq!(outcome.eligible.len(), 1);
        assert_eq!(outcome.eligible[0].id, "2");
    }

    #[test]
    fn stale_posts_dropped_by_time_window() {
        let settings = AppSettings::default(); // 24h window
        let posts = vec![post("old", "alice", Some(48)), post("new", "bob", Some(2))];
        let outcome = filter_posts(posts, &settings, &HashSet::new(), "bot");
        assert_eq!(outcome.eligible.len(), 1);
        assert_eq!(outcome.eligible[0].id, "new");
    }

    #[test]
    fn unparseable_timestamp_fails_open() {
        let settings = AppSettings::default();
        let posts = vec![post("nodate", "alice", None)];
        let outcome = filter_posts(posts, &settings, &HashSet::new(), "bot");
        assert_eq!(outcome.eligible.len(), 1, "missing timestamp must pass the time rule");
    }

    #[test]
    fn used_posts_dropped_when_exclusion_enabled() {
        let settings = AppSettings::default();
        assert!(settings.exclude_used_posts);

        let used: HashSet<String> = ["1".to_string(), "2".to_string()].into_iter().collect();
        let posts = vec![post("1", "alice", Some(1)), post("2", "bob", Some(1))];
        let outcome = filter_posts(posts, &settings, &used, "bot");
        assert!(outcome.eligible.is_empty());
        assert_eq!(outcome.filtered, 2);
    }

    #[test]
    fn used_posts_kept_when_exclusion_disabled() {
        let mut settings = AppSettings::default();
        settings.exclude_used_posts = false;

        let used: HashSet<String> = ["1".to_string()].into_iter().collect();
        let posts = vec![post("1", "alice", Some(1))];
        let outcome = filter_posts(posts, &settings, &used, "bot");
        assert_eq!(outcome.eligible.len(), 1);
    }

    #[test]
    fn rules_apply_in_order_first_failure_counts() {
        // An excluded author with a stale timestamp is still one drop.
        let mut settings = AppSettings::default();
        settings.excluded_accounts = vec!["spammer".to_string()];

        let posts = vec![post("1", "spammer", Some(999))];
        let outcome = filter_posts(posts, &settings, &HashSet::new(), "bot");
        assert_eq!(outcome.filtered, 1);
    }
}
