//! Lexical relevance scoring for grounding-post selection.
//!
//! Deterministic by construction: no randomness, no external calls.
//! Scores only rank posts; a zero never disqualifies one (the builder's
//! fallback rule handles batches with no lexical overlap).

use std::collections::HashSet;

use pollcycle_common::{html_to_plain_text, Post};

/// Words too common to signal topical overlap.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "be", "been", "in", "on",
    "at", "to", "for", "of", "with", "about", "from", "by", "as", "if", "so", "it", "its", "this",
    "that", "these", "those", "what", "which", "who", "how", "will", "would", "should", "could",
    "do", "does", "did", "have", "has", "had", "not", "no", "you", "your", "we", "our", "they",
    "their", "he", "she", "his", "her",
];

/// Lowercase alphanumeric tokens of length > 1, stop words removed.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .filter(|t| !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Overlap between a candidate poll (question + options) and a post
/// (HTML-stripped body + tags): the size of the token-set intersection.
pub fn score(question: &str, options: &[String], post: &Post) -> usize {
    let mut candidate_text = question.to_string();
    for option in options {
        candidate_text.push(' ');
        candidate_text.push_str(option);
    }

    let mut post_text = html_to_plain_text(&post.body);
    for tag in &post.tags {
        post_text.push(' ');
        post_text.push_str(tag);
    }

    let candidate_tokens = tokenize(&candidate_text);
    let post_tokens = tokenize(&post_text);
    candidate_tokens.intersection(&post_tokens).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(body: &str, tags: &[&str]) -> Post {
        Post {
            id: "p".to_string(),
            body: body.to_string(),
            created_at: None,
            url: None,
            author: "alice".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn tokenize_drops_stop_words_and_short_tokens() {
        let tokens = tokenize("The Senate will vote on a big budget bill");
        assert!(tokens.contains("senate"));
        assert!(tokens.contains("vote"));
        assert!(tokens.contains("budget"));
        assert!(!tokens.contains("the"));
        assert!(!tokens.contains("on"));
        assert!(!tokens.contains("a"));
    }

    #[test]
    fn tokenize_splits_on_punctuation() {
        let tokens = tokenize("shutdown—again? budget/deficit");
        assert!(tokens.contains("shutdown"));
        assert!(tokens.contains("again"));
        assert!(tokens.contains("budget"));
        assert!(tokens.contains("deficit"));
    }

    #[test]
    fn overlapping_terms_raise_the_score() {
        let p = post("<p>Senate passes budget bill after shutdown fight</p>", &[]);
        let s = score(
            "Should the Senate pass the budget bill?",
            &["Yes".to_string(), "No".to_string()],
            &p,
        );
        assert!(s >= 3, "expected senate/budget/bill overlap, got {s}");
    }

    #[test]
    fn tags_count_toward_post_tokens() {
        let p = post("<p>nothing relevant here</p>", &["healthcare"]);
        let s = score("Is healthcare a priority?", &[], &p);
        assert_eq!(s, 1);
    }

    #[test]
    fn html_markup_does_not_score() {
        let p = post("<div class=\"quote\"><p>water policy</p></div>", &[]);
        let s = score("Should the div class change?", &[], &p);
        assert_eq!(s, 0, "markup attributes must not leak into tokens");
    }

    #[test]
    fn unrelated_texts_score_zero() {
        let p = post("<p>cat pictures all day</p>", &[]);
        assert_eq!(score("Should the budget pass?", &[], &p), 0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let p = post("<p>Senate budget vote today</p>", &["uspol"]);
        let options = vec!["Pass it".to_string(), "Block it".to_string()];
        let first = score("Senate budget vote?", &options, &p);
        let second = score("Senate budget vote?", &options, &p);
        assert_eq!(first, second);
    }
}
