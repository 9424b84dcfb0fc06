//! Prompt assembly and generation-output parsing.
//!
//! Models return candidate batches in more than one JSON shape: a bare
//! array, an object wrapping the array under a `polls` key, or an object
//! with the array under some other key. Parsing is a tagged-variant
//! attempt over those shapes so the matched shape can be logged, instead
//! of silent duck-typing.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use llm_client::strip_code_blocks;
use pollcycle_common::{html_to_plain_text, Post};

/// Posts included in one generation prompt.
pub const PROMPT_POST_LIMIT: usize = 50;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that analyzes social media posts \
     and generates engaging poll questions.";

/// One candidate as the model emits it, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCandidate {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub duration_hours: Option<f64>,
    #[serde(default, alias = "reasoning")]
    pub rationale: Option<String>,
}

/// Which JSON shape the generation output matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// A bare JSON array of candidates.
    Array,
    /// An object with the array under `polls`.
    PollsKey,
    /// An object with the array under some other key.
    KeyedArray(String),
}

impl std::fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Array => f.write_str("array"),
            Self::PollsKey => f.write_str("polls_key"),
            Self::KeyedArray(key) => write!(f, "keyed_array({key})"),
        }
    }
}

/// Fill the settings template: `{posts}` becomes the formatted batch of up
/// to [`PROMPT_POST_LIMIT`] posts, HTML stripped.
pub fn build_prompt(posts: &[Post], template: &str) -> String {
    let posts_text = posts
        .iter()
        .take(PROMPT_POST_LIMIT)
        .enumerate()
        .map(|(i, post)| {
            format!(
                "Post {} by @{}:\n{}",
                i + 1,
                post.author,
                html_to_plain_text(&post.body).trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    template.replace("{posts}", &posts_text)
}

/// Parse generation output into candidates plus the shape that matched.
/// Markdown code fences are tolerated; anything that is not valid JSON or
/// carries no candidate array is an error (a generate-stage failure).
/// Non-object array entries are skipped.
pub fn parse_candidates(raw: &str) -> Result<(Vec<RawCandidate>, ResponseShape)> {
    let cleaned = strip_code_blocks(raw);
    let value: Value =
        serde_json::from_str(cleaned).context("Generation output is not valid JSON")?;

    let (items, shape) = match value {
        Value::Array(items) => (items, ResponseShape::Array),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("polls") {
                (items.clone(), ResponseShape::PollsKey)
            } else if let Some((key, items)) = map
                .iter()
                .find_map(|(k, v)| v.as_array().map(|a| (k.clone(), a.clone())))
            {
                (items, ResponseShape::KeyedArray(key))
            } else {
                bail!("Generation output object has no array-valued key");
            }
        }
        other => bail!(
            "Generation output must be an array or object, got {}",
            json_type_name(&other)
        ),
    };

    let candidates = items
        .into_iter()
        .filter(|item| item.is_object())
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    Ok((candidates, shape))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(author: &str, body: &str) -> Post {
        Post {
            id: "p".to_string(),
            body: body.to_string(),
            created_at: None,
            url: None,
            author: author.to_string(),
            tags: vec![],
        }
    }

    #[test]
    fn prompt_includes_author_and_stripped_body() {
        let posts = vec![post("alice", "<p>Budget vote tomorrow</p>")];
        let prompt = build_prompt(&posts, "Posts:\n{posts}\nGo.");
        assert!(prompt.contains("Post 1 by @alice:"));
        assert!(prompt.contains("Budget vote tomorrow"));
        assert!(!prompt.contains("<p>"));
        assert!(prompt.ends_with("Go."));
    }

    #[test]
    fn prompt_caps_the_post_batch() {
        let posts: Vec<Post> = (0..80).map(|i| post(&format!("user{i}"), "hi")).collect();
        let prompt = build_prompt(&posts, "{posts}");
        assert!(prompt.contains("Post 50 by @user49:"));
        assert!(!prompt.contains("Post 51"));
    }

    #[test]
    fn bare_array_shape() {
        let raw = r#"[{"question": "Q?", "options": ["A", "B"]}]"#;
        let (candidates, shape) = parse_candidates(raw).unwrap();
        assert_eq!(shape, ResponseShape::Array);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].question, "Q?");
        assert_eq!(candidates[0].options, vec!["A", "B"]);
    }

    #[test]
    fn polls_key_shape() {
        let raw = r#"{"polls": [{"question": "Q?", "options": ["A", "B"]}]}"#;
        let (candidates, shape) = parse_candidates(raw).unwrap();
        assert_eq!(shape, ResponseShape::PollsKey);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn arbitrary_key_shape() {
        let raw = r#"{"ideas": [{"question": "Q?", "options": ["A", "B"]}]}"#;
        let (candidates, shape) = parse_candidates(raw).unwrap();
        assert_eq!(shape, ResponseShape::KeyedArray("ideas".to_string()));
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn code_fences_are_stripped() {
        let raw = "```json\n[{\"question\": \"Q?\", \"options\": [\"A\", \"B\"]}]\n```";
        let (candidates, shape) = parse_candidates(raw).unwrap();
        assert_eq!(shape, ResponseShape::Array);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn reasoning_alias_maps_to_rationale() {
        let raw = r#"[{"question": "Q?", "options": ["A", "B"], "reasoning": "topical"}]"#;
        let (candidates, _) = parse_candidates(raw).unwrap();
        assert_eq!(candidates[0].rationale.as_deref(), Some("topical"));
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let raw = r#"[{"question": "Q?", "options": ["A", "B"]}, "stray", 42]"#;
        let (candidates, _) = parse_candidates(raw).unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_candidates("polls incoming!").is_err());
    }

    #[test]
    fn object_without_array_is_an_error() {
        assert!(parse_candidates(r#"{"note": "no polls today"}"#).is_err());
    }

    #[test]
    fn scalar_root_is_an_error() {
        assert!(parse_candidates("42").is_err());
    }
}
