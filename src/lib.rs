//! Online variational Bayes for the author-topic model.
//!
//! Like LDA, but topic proportions belong to authors rather than documents:
//! every word of a document is explained by the topic mixture of one of its
//! authors. Training streams the corpus in chunks, so a model can keep
//! learning from new documents and new authors after it was first fitted.
//!
//! ```no_run
//! use authortopic::{AuthorDocs, AuthorTopicModel, Dictionary, ModelConfig};
//!
//! let texts = vec![vec!["graph", "trees"], vec!["human", "interface"]];
//! let dictionary = Dictionary::from_documents(&texts);
//! let corpus: Vec<_> = texts.iter().map(|t| dictionary.doc2bow(t)).collect();
//!
//! let mut author2doc = AuthorDocs::new();
//! author2doc.insert("jack".to_string(), vec![0]);
//! author2doc.insert("jill".to_string(), vec![1]);
//!
//! let config = ModelConfig::new(2).passes(10).random_seed(42);
//! let model =
//!     AuthorTopicModel::with_corpus(config, Some(dictionary), &corpus, Some(&author2doc), None)?;
//! println!("{:?}", model.get_author_topics("jill", None)?);
//! # Ok::<(), authortopic::AtError>(())
//! ```

extern crate log;

pub mod authors;
pub mod coherence;
pub mod config;
pub mod error;
pub mod inference;
pub mod math;
pub mod model;
pub mod online;
pub mod persist;
pub mod prior;
pub mod sparse;
pub mod state;
pub mod store;
pub mod vocab;

pub use authors::{author2doc_from, doc2author_from, AuthorDocs, AuthorIndex, DocAuthors};
pub use config::ModelConfig;
pub use error::{AtError, Result};
pub use model::{AuthorTopicModel, TermRef, TopTopic, UpdateReport};
pub use online::AutoPriors;
pub use persist::{LoadMode, SaveOptions};
pub use prior::{EtaValues, Prior};
pub use sparse::{full2sparse, sparse2full, BowDocument};
pub use store::ArrayStore;
pub use vocab::{Dictionary, Vocabulary};
