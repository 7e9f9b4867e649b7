//! Saving and loading models.
//!
//! A model is saved as a bincode envelope at `path`. Large matrices go to
//! sibling files `<path>.<name>.f64` holding raw little-endian values, which
//! a [`LoadMode::Mapped`] load maps instead of reading. A path ending in
//! `.zst` compresses the envelope and every sibling file with zstd.

use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::authors::AuthorIndex;
use crate::config::ModelConfig;
use crate::error::{AtError, Result};
use crate::model::AuthorTopicModel;
use crate::online::AutoPriors;
use crate::prior::EtaValues;
use crate::state::InferenceState;
use crate::store::{ArrayStore, MappedMatrix};
use crate::vocab::Dictionary;

const FORMAT_VERSION: u32 = 1;
const COMPRESSION_LEVEL: i32 = 3;
const IGNORABLE: [&str; 2] = ["vocabulary", "exp_elogbeta"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    /// Attributes left out of the saved model.
    pub ignore: Vec<String>,
    /// Arrays of at least this many bytes are stored in their own file.
    pub sep_limit: usize,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            sep_limit: 10 * 1024 * 1024,
        }
    }
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore(mut self, name: impl Into<String>) -> Self {
        self.ignore.push(name.into());
        self
    }

    pub fn sep_limit(mut self, bytes: usize) -> Self {
        self.sep_limit = bytes;
        self
    }

    fn ignores(&self, name: &str) -> bool {
        self.ignore.iter().any(|n| n == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Read every array into memory.
    #[default]
    InMemory,
    /// Memory-map separately stored arrays.
    Mapped,
}

#[derive(Debug, Serialize, Deserialize)]
enum ArrayRecord {
    Inline { shape: (usize, usize), data: Vec<f64> },
    Separate { shape: (usize, usize), file: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    config: ModelConfig,
    alpha: Array1<f64>,
    eta: EtaValues,
    alpha_auto: bool,
    eta_auto: bool,
    num_updates: u64,
    numdocs: u64,
    index: AuthorIndex,
    vocabulary: Option<Dictionary>,
    sstats: ArrayRecord,
    gamma: ArrayRecord,
    exp_elogbeta: Option<ArrayRecord>,
}

fn is_compressed(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "zst")
}

fn sibling(path: &Path, file: &str) -> PathBuf {
    path.with_file_name(file)
}

fn to_le_bytes(array: ArrayView2<f64>) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(array.len() * 8);
    for v in array.iter() {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Byte length of a `shape` matrix of `f64`, `None` on overflow.
fn byte_len(shape: (usize, usize)) -> Option<usize> {
    shape.0.checked_mul(shape.1)?.checked_mul(8)
}

fn from_le_bytes(bytes: &[u8], shape: (usize, usize), file: &Path) -> Result<Array2<f64>> {
    if byte_len(shape) != Some(bytes.len()) {
        return Err(AtError::Format(format!(
            "{} holds {} bytes, expected a {}x{} matrix",
            file.display(),
            bytes.len(),
            shape.0,
            shape.1
        )));
    }
    let data: Vec<f64> = bytes
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect();
    Array2::from_shape_vec(shape, data).map_err(|e| AtError::Format(e.to_string()))
}

struct Writer<'a> {
    path: &'a Path,
    options: &'a SaveOptions,
    compressed: bool,
}

impl Writer<'_> {
    fn record(&self, name: &str, array: ArrayView2<f64>) -> Result<ArrayRecord> {
        let shape = array.dim();
        let bytes = array.len() * 8;
        if bytes == 0 || bytes < self.options.sep_limit {
            return Ok(ArrayRecord::Inline {
                shape,
                data: array.iter().copied().collect(),
            });
        }

        let base = self
            .path
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(|| {
                AtError::InvalidValue(format!("bad model path {}", self.path.display()))
            })?;
        let file = if self.compressed {
            format!("{base}.{name}.f64.zst")
        } else {
            format!("{base}.{name}.f64")
        };
        let target = sibling(self.path, &file);
        let raw = to_le_bytes(array);
        if self.compressed {
            fs::write(&target, zstd::encode_all(&raw[..], COMPRESSION_LEVEL)?)?;
        } else {
            fs::write(&target, raw)?;
        }
        log::debug!("stored {} ({}x{}) in {}", name, shape.0, shape.1, target.display());
        Ok(ArrayRecord::Separate { shape, file })
    }
}

fn read_record(path: &Path, name: &str, record: ArrayRecord, mode: LoadMode) -> Result<ArrayStore> {
    match record {
        ArrayRecord::Inline { shape, data } => Array2::from_shape_vec(shape, data)
            .map(ArrayStore::from)
            .map_err(|e| AtError::Format(format!("{name}: {e}"))),
        ArrayRecord::Separate { shape, file } => {
            let target = sibling(path, &file);
            let compressed = is_compressed(&target);
            match mode {
                LoadMode::Mapped if compressed => Err(AtError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("cannot memory-map compressed array {}", target.display()),
                ))),
                LoadMode::Mapped => {
                    log::debug!("mapping {} from {}", name, target.display());
                    Ok(ArrayStore::Mapped(MappedMatrix::open(&target, shape)?))
                }
                LoadMode::InMemory => {
                    let raw = fs::read(&target)?;
                    let raw = if compressed { zstd::decode_all(&raw[..])? } else { raw };
                    Ok(from_le_bytes(&raw, shape, &target)?.into())
                }
            }
        }
    }
}

fn check_shape(name: &'static str, store: &ArrayStore, expected: (usize, usize)) -> Result<()> {
    let found = store.shape();
    if found != expected {
        return Err(AtError::shape(name, &[expected.0, expected.1], &[found.0, found.1]));
    }
    Ok(())
}

impl AuthorTopicModel {
    /// Save the model to `path`.
    pub fn save(&self, path: impl AsRef<Path>, options: &SaveOptions) -> Result<()> {
        let path = path.as_ref();
        if let Some(name) = options.ignore.iter().find(|n| !IGNORABLE.contains(&n.as_str())) {
            return Err(AtError::InvalidValue(format!(
                "cannot leave out {name:?}, only {IGNORABLE:?} are optional"
            )));
        }
        let compressed = is_compressed(path);
        let writer = Writer {
            path,
            options,
            compressed,
        };
        let state = self.state();
        let auto = self.auto_priors();

        let envelope = Envelope {
            version: FORMAT_VERSION,
            config: self.config().clone(),
            alpha: state.alpha.clone(),
            eta: state.eta.clone(),
            alpha_auto: auto.alpha,
            eta_auto: auto.eta,
            num_updates: state.num_updates,
            numdocs: state.numdocs,
            index: self.author_index().clone(),
            vocabulary: if options.ignores("vocabulary") {
                None
            } else {
                self.vocabulary().cloned()
            },
            sstats: writer.record("sstats", state.sstats.view())?,
            gamma: writer.record("gamma", state.gamma.view())?,
            exp_elogbeta: if options.ignores("exp_elogbeta") {
                None
            } else {
                Some(writer.record("exp_elogbeta", self.exp_elogbeta().view())?)
            },
        };

        if compressed {
            let bytes = bincode::serialize(&envelope)?;
            fs::write(path, zstd::encode_all(&bytes[..], COMPRESSION_LEVEL)?)?;
        } else {
            let mut out = BufWriter::new(File::create(path)?);
            bincode::serialize_into(&mut out, &envelope)?;
            out.flush()?;
        }
        log::info!("saved author-topic model to {}", path.display());
        Ok(())
    }

    /// Load a model saved with [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let path = path.as_ref();
        let envelope: Envelope = if is_compressed(path) {
            let bytes = zstd::decode_all(BufReader::new(File::open(path)?))?;
            bincode::deserialize(&bytes)?
        } else {
            bincode::deserialize_from(BufReader::new(File::open(path)?))?
        };
        if envelope.version != FORMAT_VERSION {
            return Err(AtError::Format(format!(
                "unsupported model format version {}",
                envelope.version
            )));
        }

        let num_topics = envelope.alpha.len();
        if num_topics != envelope.config.num_topics {
            return Err(AtError::shape("alpha", &[envelope.config.num_topics], &[num_topics]));
        }
        let sstats = read_record(path, "sstats", envelope.sstats, mode)?;
        let num_terms = sstats.shape().1;
        check_shape("sstats", &sstats, (num_topics, num_terms))?;
        let gamma = read_record(path, "gamma", envelope.gamma, mode)?;
        check_shape("gamma", &gamma, (envelope.index.num_authors(), num_topics))?;
        let eta_shape = envelope.eta.shape();
        if eta_shape.last() != Some(&num_terms) {
            return Err(AtError::shape("eta", &[num_terms], eta_shape));
        }
        let exp_elogbeta = match envelope.exp_elogbeta {
            Some(record) => {
                let store = read_record(path, "exp_elogbeta", record, mode)?;
                check_shape("exp_elogbeta", &store, (num_topics, num_terms))?;
                Some(store)
            }
            None => None,
        };

        let state = InferenceState {
            alpha: envelope.alpha,
            eta: envelope.eta,
            sstats,
            gamma,
            num_updates: envelope.num_updates,
            numdocs: envelope.numdocs,
        };
        let auto = AutoPriors {
            alpha: envelope.alpha_auto,
            eta: envelope.eta_auto,
        };
        log::info!("loaded author-topic model from {} ({:?})", path.display(), mode);
        Ok(AuthorTopicModel::from_parts(
            envelope.config,
            state,
            exp_elogbeta,
            envelope.index,
            auto,
            envelope.vocabulary,
        ))
    }
}
