//! Author ↔ document relation.
//!
//! Authors get dense ids in the order they are first seen while scanning
//! documents by ascending index. The name table is append-only: an id handed
//! out once refers to the same author for the lifetime of the model.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{AtError, Result};

/// author name -> document indices
pub type AuthorDocs = IndexMap<String, Vec<usize>>;
/// document index -> author names
pub type DocAuthors = BTreeMap<usize, Vec<String>>;

/// Invert an author→documents map.
pub fn doc2author_from(author2doc: &AuthorDocs) -> DocAuthors {
    let mut doc2author = DocAuthors::new();
    for (author, docs) in author2doc {
        for &d in docs {
            let authors = doc2author.entry(d).or_default();
            if !authors.contains(author) {
                authors.push(author.clone());
            }
        }
    }
    doc2author
}

/// Invert a document→authors map. Authors appear in first-seen order.
pub fn author2doc_from(doc2author: &DocAuthors) -> AuthorDocs {
    let mut author2doc = AuthorDocs::new();
    for (&d, authors) in doc2author {
        for author in authors {
            let docs = author2doc.entry(author.clone()).or_default();
            if !docs.contains(&d) {
                docs.push(d);
            }
        }
    }
    author2doc
}

fn same_authors(a: &[String], b: &[String]) -> bool {
    let a: HashSet<&String> = a.iter().collect();
    let b: HashSet<&String> = b.iter().collect();
    a == b
}

/// What a call to [`AuthorIndex::ingest`] added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ingested {
    pub first_doc: usize,
    pub num_docs: usize,
    pub new_authors: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorIndex {
    author2id: HashMap<String, usize>,
    id2author: Vec<String>,
    author2doc: Vec<Vec<usize>>, // by author id, global document indices
    doc2author: Vec<Vec<usize>>, // by global document index, author ids
}

impl AuthorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `num_docs` documents described by either or both maps.
    ///
    /// Document indices in the maps are relative to the new documents. The
    /// whole input is validated before anything is recorded.
    pub fn ingest(
        &mut self,
        num_docs: usize,
        author2doc: Option<&AuthorDocs>,
        doc2author: Option<&DocAuthors>,
    ) -> Result<Ingested> {
        let doc2author: DocAuthors = match (author2doc, doc2author) {
            (None, None) => return Err(AtError::MissingAuthorMaps),
            (Some(a2d), None) => doc2author_from(a2d),
            (None, Some(d2a)) => d2a.clone(),
            (Some(a2d), Some(d2a)) => {
                let derived = doc2author_from(a2d);
                let docs: HashSet<usize> = derived.keys().chain(d2a.keys()).copied().collect();
                for d in docs {
                    let lhs = derived.get(&d).map(Vec::as_slice).unwrap_or(&[]);
                    let rhs = d2a.get(&d).map(Vec::as_slice).unwrap_or(&[]);
                    if !same_authors(lhs, rhs) {
                        return Err(AtError::InconsistentAuthorMaps(d));
                    }
                }
                d2a.clone()
            }
        };

        if let Some((&d, _)) = doc2author.range(num_docs..).next() {
            return Err(AtError::DocumentOutOfRange { doc: d, num_docs });
        }
        for d in 0..num_docs {
            if doc2author.get(&d).map_or(true, |authors| authors.is_empty()) {
                return Err(AtError::DocumentWithoutAuthor(d));
            }
        }

        let first_doc = self.doc2author.len();
        let known_authors = self.id2author.len();
        for (&d, names) in &doc2author {
            let global = first_doc + d;
            let mut ids: Vec<usize> = Vec::with_capacity(names.len());
            for name in names {
                let id = match self.author2id.get(name) {
                    Some(&id) => id,
                    None => {
                        let id = self.id2author.len();
                        self.author2id.insert(name.clone(), id);
                        self.id2author.push(name.clone());
                        self.author2doc.push(Vec::new());
                        id
                    }
                };
                if !ids.contains(&id) {
                    ids.push(id);
                    self.author2doc[id].push(global);
                }
            }
            self.doc2author.push(ids);
        }

        let ingested = Ingested {
            first_doc,
            num_docs,
            new_authors: self.id2author.len() - known_authors,
        };
        log::debug!(
            "Ingested {} documents from index {}, {} new authors ({} total)",
            num_docs,
            first_doc,
            ingested.new_authors,
            self.id2author.len()
        );
        Ok(ingested)
    }

    pub fn num_authors(&self) -> usize {
        self.id2author.len()
    }

    pub fn num_docs(&self) -> usize {
        self.doc2author.len()
    }

    /// Author ids of document `doc` (global index).
    pub fn authors_of(&self, doc: usize) -> &[usize] {
        self.doc2author.get(doc).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Global document indices written by author `author`.
    pub fn docs_of(&self, author: usize) -> &[usize] {
        self.author2doc.get(author).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn author_id(&self, name: &str) -> Option<usize> {
        self.author2id.get(name).copied()
    }

    pub fn author_name(&self, id: usize) -> Option<&str> {
        self.id2author.get(id).map(String::as_str)
    }

    /// Author names in id order.
    pub fn author_names(&self) -> &[String] {
        &self.id2author
    }
}
