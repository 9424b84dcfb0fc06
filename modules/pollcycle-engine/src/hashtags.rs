//! Hashtag composition under the platform's character budgets.
//!
//! Two caps: a 200-char soft budget tuned for typical short questions, and
//! the hard 500-char limit on the full status text (question + hashtags)
//! that must never be exceeded. The soft pass composes; the hard pass
//! re-trims against whatever the actual question left over.

use std::collections::HashSet;

use pollcycle_common::Post;

/// Soft budget for the joined hashtag block.
pub const SOFT_TAG_BUDGET: usize = 200;
/// Stop collecting once the running total reaches this, leaving headroom.
const SOFT_STOP: usize = 190;
/// Hard platform cap on question + " " + hashtags.
pub const COMBINED_CAP: usize = 500;
/// Raw tags collected from grounding posts before length filtering.
const POST_TAG_POOL: usize = 15;
/// Watchlist tags appended as a fallback.
const FALLBACK_TAKE: usize = 3;

/// Canonical form: single leading `#`, no surrounding whitespace.
/// Returns None for tags that are empty once stripped.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let stripped = raw.trim().trim_start_matches('#').trim();
    if stripped.is_empty() {
        return None;
    }
    Some(format!("#{stripped}"))
}

/// Rendered cost of one tag: its characters plus one separator space.
fn rendered_len(tag: &str) -> usize {
    tag.chars().count() + 1
}

/// Merge hashtags from three sources under the soft budget.
///
/// Order matters: grounding-post tags (in post-rank order) first, then
/// model suggestions, then the first few watchlist tags. First occurrence
/// wins; identity is case-insensitive after normalization.
pub fn compose(ranked_posts: &[Post], llm_tags: &[String], fallback_tags: &[String]) -> Vec<String> {
    let mut candidates: Vec<&str> = Vec::new();
    'posts: for post in ranked_posts {
        for tag in &post.tags {
            if candidates.len() >= POST_TAG_POOL {
                break 'posts;
            }
            candidates.push(tag.as_str());
        }
    }
    candidates.extend(llm_tags.iter().map(String::as_str));
    candidates.extend(fallback_tags.iter().take(FALLBACK_TAKE).map(String::as_str));

    let mut seen = HashSet::new();
    let mut composed = Vec::new();
    let mut total = 0usize;

    for raw in candidates {
        if total >= SOFT_STOP {
            break;
        }
        let Some(tag) = normalize_tag(raw) else {
            continue;
        };
        if !seen.insert(tag.to_lowercase()) {
            continue;
        }
        let cost = rendered_len(&tag);
        if total + cost > SOFT_TAG_BUDGET {
            continue;
        }
        total += cost;
        composed.push(tag);
    }

    composed
}

/// Enforce the hard cap on the full status text. When
/// `question + " " + joined_tags` would exceed 500 chars, trailing tags are
/// dropped until the remainder fits the literal budget left by the question.
pub fn enforce_combined_cap(question: &str, tags: Vec<String>) -> Vec<String> {
    if tags.is_empty() {
        return tags;
    }

    let question_chars = question.chars().count();
    let joined: usize =
        tags.iter().map(|t| t.chars().count()).sum::<usize>() + tags.len() - 1;
    if question_chars + 1 + joined <= COMBINED_CAP {
        return tags;
    }

    let budget = COMBINED_CAP.saturating_sub(question_chars + 1);
    let mut kept = Vec::new();
    let mut used = 0usize;
    for tag in tags {
        let cost = tag.chars().count() + if kept.is_empty() { 0 } else { 1 };
        if used + cost > budget {
            break;
        }
        used += cost;
        kept.push(tag);
    }
    kept
}
