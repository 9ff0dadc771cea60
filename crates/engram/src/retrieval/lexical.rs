//! Lexical retrieval channel: Okapi BM25 over memory text
//!
//! The index is built per query over the querying user's memories (summary
//! plus raw text) and discarded afterwards; nothing is cached across queries.

use std::collections::HashMap;

use uuid::Uuid;

/// BM25 free parameters. The usual defaults.
const K1: f32 = 1.5;
const B: f32 = 0.75;

pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// In-memory Okapi BM25 index over memory documents.
#[derive(Debug, Default)]
pub struct Bm25Index {
    doc_ids: Vec<Uuid>,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<f32>,
    doc_freq: HashMap<String, u32>,
    avg_doc_len: f32,
}

impl Bm25Index {
    /// Build an index from (memory id, document text) pairs.
    pub fn build(docs: &[(Uuid, String)]) -> Self {
        let mut index = Bm25Index::default();
        for (id, text) in docs {
            let tokens = tokenize(text);
            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *index.doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            index.doc_ids.push(*id);
            index.doc_lens.push(tokens.len() as f32);
            index.term_freqs.push(freqs);
        }
        if !index.doc_lens.is_empty() {
            index.avg_doc_len = index.doc_lens.iter().sum::<f32>() / index.doc_lens.len() as f32;
        }
        index
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.doc_ids.len() as f32;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
        // The +1 inside the log keeps idf non-negative for very common terms.
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Score all documents against the query and return the top-n with
    /// positive scores, descending, id-tie-broken for determinism.
    pub fn search(&self, query: &str, top_n: usize) -> Vec<(Uuid, f32)> {
        if self.is_empty() {
            return Vec::new();
        }
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(Uuid, f32)> = Vec::new();
        for (i, freqs) in self.term_freqs.iter().enumerate() {
            let doc_len = self.doc_lens[i];
            let norm = K1 * (1.0 - B + B * doc_len / self.avg_doc_len.max(1e-6));
            let mut score = 0.0;
            for term in &query_terms {
                let tf = freqs.get(term).copied().unwrap_or(0) as f32;
                if tf == 0.0 {
                    continue;
                }
                score += self.idf(term) * tf * (K1 + 1.0) / (tf + norm);
            }
            if score > 0.0 {
                scored.push((self.doc_ids[i], score));
            }
        }
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(top_n);
        scored
    }
}
