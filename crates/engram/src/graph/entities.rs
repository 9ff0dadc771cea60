//! Query entity extraction for the graph channel
//!
//! A lightweight heuristic: capitalized words and phrases minus a stopword
//! list. Good enough to seed graph expansion; a deployment can swap in a real
//! NER model upstream and pass entities through the draft instead.

use std::collections::BTreeSet;

const STOPWORDS: &[&str] = &[
    "i", "me", "my", "we", "you", "the", "a", "an", "and", "or", "but", "is", "was", "are",
    "were", "be", "been", "have", "has", "had", "do", "does", "did", "will", "would", "could",
    "should", "can", "may", "might", "this", "that", "these", "those", "it", "its", "what",
    "when", "where", "who", "how", "why",
];

fn is_stopword(word: &str) -> bool {
    let lower = word.to_lowercase();
    STOPWORDS.contains(&lower.as_str())
}

/// Extract entity-like tokens from query text.
///
/// Returns a sorted, deduplicated list: multi-word capitalized phrases first
/// split out, then single capitalized tokens. Sorting keeps downstream
/// traversal deterministic.
pub fn extract_query_entities(text: &str) -> Vec<String> {
    let mut out: BTreeSet<String> = BTreeSet::new();

    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();

    let mut phrase: Vec<&str> = Vec::new();
    for word in words.iter().chain(std::iter::once(&"")) {
        let capitalized = word
            .chars()
            .next()
            .map(|c| c.is_uppercase())
            .unwrap_or(false);
        if capitalized && !is_stopword(word) {
            phrase.push(word);
            continue;
        }
        match phrase.len() {
            0 => {}
            1 => {
                if phrase[0].len() > 1 {
                    out.insert(phrase[0].to_string());
                }
            }
            _ => {
                out.insert(phrase.join(" "));
                for part in &phrase {
                    if part.len() > 1 {
                        out.insert((*part).to_string());
                    }
                }
            }
        }
        phrase.clear();
    }

    out.into_iter().collect()
}
