use thiserror::Error;

/// Errors raised by the author-topic engine
#[derive(Error, Debug)]
pub enum AtError {
    /// An explicit array does not have the expected shape
    #[error("{name} has shape {found:?}, expected {expected:?}")]
    Shape {
        name: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// A keyword or scalar that is not acceptable for the parameter
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Either author2doc or doc2author must be supplied")]
    MissingAuthorMaps,

    #[error("author2doc and doc2author disagree on document {0}")]
    InconsistentAuthorMaps(usize),

    #[error("Document {doc} is outside the corpus of {num_docs} documents")]
    DocumentOutOfRange { doc: usize, num_docs: usize },

    #[error("Document {0} has no author")]
    DocumentWithoutAuthor(usize),

    #[error("Document {doc} is not a valid bag of words: {reason}")]
    InvalidDocument { doc: usize, reason: String },

    #[error("Unknown author: {0}")]
    UnknownAuthor(String),

    #[error("Unknown term: {0}")]
    UnknownTerm(String),

    #[error("Topic {topic} out of range (model has {num_topics} topics)")]
    TopicOutOfRange { topic: usize, num_topics: usize },

    #[error("Model has no vocabulary attached")]
    MissingVocabulary,

    #[error("Number of terms cannot be determined; supply a vocabulary or set num_terms")]
    UnknownVocabularySize,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed model file: {0}")]
    Format(String),
}

impl AtError {
    pub(crate) fn shape(name: &'static str, expected: &[usize], found: &[usize]) -> Self {
        AtError::Shape {
            name,
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}

impl From<bincode::Error> for AtError {
    fn from(err: bincode::Error) -> Self {
        match *err {
            bincode::ErrorKind::Io(io) => AtError::Io(io),
            other => AtError::Format(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AtError>;
