use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([\p{L}\p{Mn}\p{Nd}_-]+)").expect("valid regex"));
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\w])@(\w+)").expect("valid regex"));
static BRACKET_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\[(.*?)\]").expect("valid regex"));

/// Extract #hashtags from text. Unicode letters, marks, digits, `_` and `-`
/// are part of a tag. Returns tags without the `#`, case preserved,
/// deduplicated in order of first appearance.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    collect_unique(&HASHTAG_RE, text)
}

/// Extract plain `@handle` mentions (Twitter/Facebook style).
pub fn extract_mentions(text: &str) -> Vec<String> {
    collect_unique(&MENTION_RE, text)
}

/// Extract LinkedIn `@[Display Name]` mentions.
pub fn extract_bracket_mentions(text: &str) -> Vec<String> {
    collect_unique(&BRACKET_MENTION_RE, text)
}

fn collect_unique(re: &Regex, text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    re.captures_iter(text)
        .filter_map(|c| {
            let value = c[1].trim().to_string();
            (!value.is_empty() && seen.insert(value.clone())).then_some(value)
        })
        .collect()
}
