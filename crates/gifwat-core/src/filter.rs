//! Search over the collection and the tag tokenizer shared by every add/edit path.

use crate::Gif;

/// Lowercased, non-empty whitespace-separated terms. Empty for a blank query.
pub fn search_terms(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Every term must hit the url or at least one tag (substring, case-insensitive).
pub fn matches_terms(gif: &Gif, terms: &[String]) -> bool {
    let url = gif.url.to_lowercase();
    let tags: Vec<String> = gif.tags.iter().map(|t| t.to_lowercase()).collect();
    terms
        .iter()
        .all(|term| url.contains(term.as_str()) || tags.iter().any(|t| t.contains(term.as_str())))
}

/// The filtered sequence: a subsequence of `items` in original order.
pub fn filter_gifs<'a>(items: &'a [Gif], query: &str) -> Vec<&'a Gif> {
    let terms = search_terms(query);
    if terms.is_empty() {
        return items.iter().collect();
    }
    items.iter().filter(|g| matches_terms(g, &terms)).collect()
}

/// Whitespace-split tag input with empty tokens dropped.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
