//! Keyword extraction for tiered memory (spec §4.E).
//!
//! Lowercase, segment with `jieba-rs` (a real CJK-aware segmenter — Han
//! runs split into multi-character words like "历史"/"时间轴" rather than
//! one token per ideograph, while Latin runs pass through as ordinary
//! words), strip stopwords and punctuation-only tokens, dedupe preserving
//! first-seen order, cap at `max_keywords`. Falls back to Unicode
//! word-boundary tokenization only if the segmenter yields nothing.

use jieba_rs::Jieba;
use std::collections::HashSet;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "be", "been", "being", "to",
    "of", "in", "on", "at", "for", "with", "by", "from", "as", "that", "this", "it", "its", "into",
    "these", "those", "if", "then", "than", "so", "such", "not", "no", "do", "does", "did",
];

pub const STORE_MAX_KEYWORDS: usize = 5;
pub const QUERY_MAX_KEYWORDS: usize = 10;

fn segmenter() -> &'static Jieba {
    static SEGMENTER: OnceLock<Jieba> = OnceLock::new();
    SEGMENTER.get_or_init(Jieba::new)
}

fn is_meaningful(token: &str, stopwords: &HashSet<&str>) -> bool {
    !token.is_empty() && !stopwords.contains(token) && token.chars().any(|c| c.is_alphanumeric())
}

/// Extracts up to `max_keywords` keywords from `text`. Falls back to
/// Unicode word-boundary tokenization (the spec's documented fallback)
/// only if the primary segmenter produces no tokens at all.
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
    let lowercased = text.to_lowercase();
    let stopwords: HashSet<&str> = STOPWORDS.iter().copied().collect();

    let mut tokens: Vec<String> = segmenter()
        .cut(&lowercased, false)
        .into_iter()
        .map(|w| w.trim().to_string())
        .filter(|w| is_meaningful(w, &stopwords))
        .collect();

    if tokens.is_empty() {
        tokens = lowercased
            .unicode_words()
            .map(|w| w.to_string())
            .filter(|w| is_meaningful(w, &stopwords))
            .collect();
    }

    if tokens.is_empty() {
        tokens = lowercased
            .chars()
            .filter(|c| c.is_alphanumeric())
            .map(|c| c.to_string())
            .collect();
    }

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for token in tokens {
        if seen.insert(token.clone()) {
            result.push(token);
            if result.len() >= max_keywords {
                break;
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_stopwords_and_dedupes() {
        let keywords = extract_keywords("The quick quick fox jumps over the lazy dog", 10);
        assert!(!keywords.contains(&"the".to_string()));
        assert_eq!(keywords.iter().filter(|k| *k == "quick").count(), 1);
    }

    #[test]
    fn respects_max_keywords_cap() {
        let keywords = extract_keywords("alpha beta gamma delta epsilon zeta eta theta", 3);
        assert_eq!(keywords.len(), 3);
    }

    #[test]
    fn handles_cjk_text_without_panicking() {
        let keywords = extract_keywords("数据库连接池管理系统", 5);
        assert!(!keywords.is_empty());
    }

    #[test]
    fn segments_cjk_into_multi_character_words() {
        let keywords = extract_keywords("历史时间轴项目", 10);
        assert!(
            keywords.iter().any(|k| k.chars().count() > 1),
            "expected multi-character segments, got {keywords:?}"
        );
    }

    #[test]
    fn preserves_first_seen_order() {
        let keywords = extract_keywords("zebra apple zebra banana", 10);
        assert_eq!(keywords, vec!["zebra", "apple", "banana"]);
    }
}
