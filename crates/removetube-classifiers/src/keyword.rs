//! Keyword matcher (fast path)
//!
//! Searches the lower-cased content for whole-word occurrences of every topic
//! variation and scores the first qualifying hit by how often it occurs.

use aho_corasick::AhoCorasick;
use removetube_core::{MatchResult, Method};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

use crate::variations::variations;

/// Word-boundary keyword matcher.
///
/// Topics are scanned in caller order and the first variant that clears the
/// minimum confidence wins, even when a later topic would score higher.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordMatcher;

impl KeywordMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Match `content` against `topics`.
    ///
    /// `content` is expected to be truncated already; it is lower-cased here.
    pub fn find(&self, content: &str, topics: &[String], min_confidence: f32) -> MatchResult {
        let start = Instant::now();
        let text = content.to_lowercase();

        // One entry per topic, blank topics carry no variants
        let topic_variants: Vec<Vec<String>> = topics
            .iter()
            .map(|t| {
                if t.trim().is_empty() {
                    Vec::new()
                } else {
                    variations(t)
                }
            })
            .collect();

        let mut pattern_ids: HashMap<&str, usize> = HashMap::new();
        let mut patterns: Vec<&str> = Vec::new();
        for variant in topic_variants.iter().flatten() {
            pattern_ids.entry(variant.as_str()).or_insert_with(|| {
                patterns.push(variant.as_str());
                patterns.len() - 1
            });
        }

        if patterns.is_empty() {
            return MatchResult::miss(Method::Keyword);
        }

        let automaton = match AhoCorasick::new(&patterns) {
            Ok(ac) => ac,
            Err(e) => {
                warn!("Failed to build keyword automaton: {}", e);
                return MatchResult::miss(Method::Keyword);
            }
        };

        let counts = count_whole_words(&automaton, &text, patterns.len());

        for (topic, variants) in topics.iter().zip(&topic_variants) {
            for variant in variants {
                let count = counts[pattern_ids[variant.as_str()]];
                if count == 0 {
                    continue;
                }

                let confidence = confidence_for(count);
                debug!(
                    topic = %topic,
                    variant = %variant,
                    count,
                    confidence,
                    "Keyword variant found"
                );

                if confidence >= min_confidence {
                    debug!("Keyword match in {}us", start.elapsed().as_micros());
                    return MatchResult::hit(topic.clone(), confidence, Method::Keyword);
                }
            }
        }

        MatchResult::miss(Method::Keyword)
    }
}

/// `min(1.0, 0.7 + 0.1 * count)`, computed in tenths so one mention is exactly 0.8
pub fn confidence_for(count: usize) -> f32 {
    (7 + count.min(3)) as f32 / 10.0
}

/// Count non-overlapping whole-word occurrences of every pattern.
///
/// Boundaries follow Python-style `\b` over Unicode `\w` (see
/// [`is_word_char`]), so `_` joins words and accented letters are word
/// characters.
///
/// Overlapping search reports every candidate; candidates that fail the
/// boundary check are dropped and the rest are taken greedily left to right,
/// which is what a `\bpattern\b` scan would count.
fn count_whole_words(automaton: &AhoCorasick, text: &str, pattern_count: usize) -> Vec<usize> {
    let mut spans: Vec<Vec<(usize, usize)>> = vec![Vec::new(); pattern_count];
    for m in automaton.find_overlapping_iter(text) {
        if is_whole_word(text, m.start(), m.end()) {
            spans[m.pattern().as_usize()].push((m.start(), m.end()));
        }
    }

    spans
        .into_iter()
        .map(|mut found| {
            found.sort_unstable();
            let mut count = 0;
            let mut last_end = 0;
            for (s, e) in found {
                if s >= last_end {
                    count += 1;
                    last_end = e;
                }
            }
            count
        })
        .collect()
}

/// Word characters as in Python's Unicode-aware `\w`: letters, digits and `_`
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Boundary on both sides of `text[start..end]`, with the ends of the text
/// counting as non-word characters
fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let matched = &text[start..end];
    let (Some(first), Some(last)) = (matched.chars().next(), matched.chars().next_back()) else {
        return false;
    };

    let before = text[..start].chars().next_back().is_some_and(is_word_char);
    let after = text[end..].chars().next().is_some_and(is_word_char);

    before != is_word_char(first) && is_word_char(last) != after
}
