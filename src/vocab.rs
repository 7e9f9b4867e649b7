//! Term ↔ id mapping used for display and term lookups.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::sparse::BowDocument;

/// Bidirectional term table.
pub trait Vocabulary {
    fn len(&self) -> usize;
    fn term(&self, id: usize) -> Option<&str>;
    fn id(&self, term: &str) -> Option<usize>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Vocabulary built from tokenized documents, ids in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dictionary {
    token2id: HashMap<String, usize>,
    id2token: Vec<String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents<D, T>(docs: &[D]) -> Self
    where
        D: AsRef<[T]>,
        T: AsRef<str>,
    {
        let mut dict = Self::new();
        for doc in docs {
            for token in doc.as_ref() {
                dict.add(token.as_ref());
            }
        }
        dict
    }

    /// Id of `token`, registering it if unseen.
    pub fn add(&mut self, token: &str) -> usize {
        if let Some(&id) = self.token2id.get(token) {
            return id;
        }
        let id = self.id2token.len();
        self.id2token.push(token.to_string());
        self.token2id.insert(token.to_string(), id);
        id
    }

    /// Bag of words over known tokens, sorted by id. Unknown tokens are
    /// skipped.
    pub fn doc2bow<T: AsRef<str>>(&self, tokens: &[T]) -> BowDocument {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokens {
            if let Some(&id) = self.token2id.get(token.as_ref()) {
                *counts.entry(id).or_insert(0.0) += 1.0;
            }
        }
        let mut bow: BowDocument = counts.into_iter().collect();
        bow.sort_by_key(|&(id, _)| id);
        bow
    }

    pub fn terms(&self) -> &[String] {
        &self.id2token
    }
}

impl Vocabulary for Dictionary {
    fn len(&self) -> usize {
        self.id2token.len()
    }

    fn term(&self, id: usize) -> Option<&str> {
        self.id2token.get(id).map(String::as_str)
    }

    fn id(&self, term: &str) -> Option<usize> {
        self.token2id.get(term).copied()
    }
}
