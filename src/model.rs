//! The author-topic model: training loop and query surface.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::authors::{AuthorDocs, AuthorIndex, DocAuthors};
use crate::coherence;
use crate::config::ModelConfig;
use crate::error::{AtError, Result};
use crate::inference::{self, EStepLimits};
use crate::math;
use crate::online::{self, AutoPriors, LearningRate};
use crate::prior::{self, EtaValues};
use crate::sparse::{self, BowDocument};
use crate::state::{self, InferenceState};
use crate::store::ArrayStore;
use crate::vocab::{Dictionary, Vocabulary};

/// Probabilities below this are never reported, whatever the caller asks.
const MIN_REPORTED_PROBABILITY: f64 = 1e-8;

/// Term given either by id or by its string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermRef<'a> {
    Id(usize),
    Term(&'a str),
}

impl From<usize> for TermRef<'_> {
    fn from(id: usize) -> Self {
        TermRef::Id(id)
    }
}

impl<'a> From<&'a str> for TermRef<'a> {
    fn from(term: &'a str) -> Self {
        TermRef::Term(term)
    }
}

impl<'a> From<&'a String> for TermRef<'a> {
    fn from(term: &'a String) -> Self {
        TermRef::Term(term.as_str())
    }
}

/// A topic ranked by [`AuthorTopicModel::top_topics`].
#[derive(Debug, Clone, PartialEq)]
pub struct TopTopic {
    pub topic: usize,
    pub terms: Vec<(String, f64)>,
    pub coherence: f64,
}

/// Summary of one [`AuthorTopicModel::update`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    pub documents: usize,
    pub new_authors: usize,
    pub passes: usize,
    pub chunks: usize,
    /// Chunks whose E-step met the gamma threshold before the sweep cap.
    pub converged_chunks: usize,
    /// Learning rate the next chunk would use.
    pub rho: f64,
}

impl UpdateReport {
    pub fn converged(&self) -> bool {
        self.converged_chunks == self.chunks
    }
}

/// Online variational Bayes author-topic model.
///
/// Training is resumable: every [`update`](Self::update) appends documents
/// and authors and continues the learning-rate schedule where the previous
/// call left off. Queries borrow the model immutably and can run side by
/// side; an update needs exclusive access.
#[derive(Debug)]
pub struct AuthorTopicModel {
    config: ModelConfig,
    num_terms: usize,
    state: InferenceState,
    exp_elogbeta: ArrayStore,
    index: AuthorIndex,
    auto: AutoPriors,
    vocabulary: Option<Dictionary>,
    rng: StdRng,
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Entries of a normalized distribution at or above `minimum`, largest first.
fn ranked(dist: ArrayView1<f64>, minimum: f64) -> Vec<(usize, f64)> {
    let mut out: Vec<(usize, f64)> = sparse::full2sparse(dist, 0.0)
        .into_iter()
        .filter(|&(_, p)| p >= minimum)
        .collect();
    out.sort_by(|a, b| b.1.total_cmp(&a.1));
    out
}

fn normalized(row: ArrayView1<f64>) -> Array1<f64> {
    let total = row.sum();
    if total > 0.0 {
        &row / total
    } else {
        Array1::zeros(row.len())
    }
}

impl AuthorTopicModel {
    /// Create an untrained model.
    ///
    /// The vocabulary size comes from `vocabulary` when given, otherwise from
    /// `config.num_terms`.
    pub fn new(config: ModelConfig, vocabulary: Option<Dictionary>) -> Result<Self> {
        if config.num_topics == 0 {
            return Err(AtError::InvalidValue("num_topics must be positive".into()));
        }
        if config.chunksize == 0 {
            return Err(AtError::InvalidValue("chunksize must be positive".into()));
        }
        let num_terms = match (&vocabulary, config.num_terms) {
            (Some(v), Some(n)) if v.len() != n => {
                return Err(AtError::shape("num_terms", &[v.len()], &[n]));
            }
            (Some(v), _) => v.len(),
            (None, Some(n)) => n,
            (None, None) => return Err(AtError::UnknownVocabularySize),
        };
        if num_terms == 0 {
            return Err(AtError::UnknownVocabularySize);
        }

        let (alpha, alpha_auto) = prior::init_alpha(&config.alpha, config.num_topics)?;
        let (eta, eta_auto) = prior::init_eta(&config.eta, config.num_topics, num_terms)?;

        let mut rng = seeded_rng(config.random_seed);
        let sstats = state::random_gamma_matrix(
            &mut rng,
            config.init_concentration,
            config.num_topics,
            num_terms,
        )?;
        let state = InferenceState::new(alpha, eta, sstats);
        let exp_elogbeta = state.get_exp_elogbeta().into();

        log::info!(
            "author-topic model: {} topics, {} terms, alpha auto: {}, eta auto: {}",
            config.num_topics,
            num_terms,
            alpha_auto,
            eta_auto
        );

        Ok(Self {
            num_terms,
            state,
            exp_elogbeta,
            index: AuthorIndex::new(),
            auto: AutoPriors {
                alpha: alpha_auto,
                eta: eta_auto,
            },
            vocabulary,
            rng,
            config,
        })
    }

    /// Create a model and train it on `corpus`.
    ///
    /// Without a vocabulary or `config.num_terms`, the vocabulary size is taken
    /// from the largest term id in the corpus.
    pub fn with_corpus(
        mut config: ModelConfig,
        vocabulary: Option<Dictionary>,
        corpus: &[BowDocument],
        author2doc: Option<&AuthorDocs>,
        doc2author: Option<&DocAuthors>,
    ) -> Result<Self> {
        if author2doc.is_none() && doc2author.is_none() {
            return Err(AtError::MissingAuthorMaps);
        }
        if vocabulary.is_none() && config.num_terms.is_none() {
            config.num_terms = Some(sparse::implied_num_terms(corpus));
        }
        let mut model = Self::new(config, vocabulary)?;
        model.update(corpus, author2doc, doc2author)?;
        Ok(model)
    }

    pub(crate) fn from_parts(
        config: ModelConfig,
        state: InferenceState,
        exp_elogbeta: Option<ArrayStore>,
        index: AuthorIndex,
        auto: AutoPriors,
        vocabulary: Option<Dictionary>,
    ) -> Self {
        let exp_elogbeta = exp_elogbeta.unwrap_or_else(|| state.get_exp_elogbeta().into());
        Self {
            num_terms: state.num_terms(),
            rng: seeded_rng(config.random_seed),
            config,
            state,
            exp_elogbeta,
            index,
            auto,
            vocabulary,
        }
    }

    fn learning_rate(&self) -> LearningRate {
        LearningRate {
            offset: self.config.offset,
            decay: self.config.decay,
            chunksize: self.config.chunksize,
        }
    }

    fn limits(&self) -> EStepLimits {
        EStepLimits {
            iterations: self.config.iterations,
            gamma_threshold: self.config.gamma_threshold,
        }
    }

    /// Train on `corpus`, whose authors are given by either or both maps.
    ///
    /// Document indices in the maps refer to positions in `corpus`. New
    /// authors are appended; known authors keep their ids and accumulate the
    /// new evidence.
    pub fn update(
        &mut self,
        corpus: &[BowDocument],
        author2doc: Option<&AuthorDocs>,
        doc2author: Option<&DocAuthors>,
    ) -> Result<UpdateReport> {
        if corpus.is_empty() {
            log::warn!("author-topic model updated with an empty corpus");
            return Ok(UpdateReport {
                rho: self.rho(),
                ..UpdateReport::default()
            });
        }
        for (d, doc) in corpus.iter().enumerate() {
            sparse::validate_document(d, doc, self.num_terms)?;
        }

        let ingested = self.index.ingest(corpus.len(), author2doc, doc2author)?;
        if ingested.new_authors > 0 {
            let rows = state::random_gamma_matrix(
                &mut self.rng,
                self.config.init_concentration,
                ingested.new_authors,
                self.config.num_topics,
            )?;
            self.state.extend_gamma(rows.view())?;
        }
        self.state.numdocs += corpus.len() as u64;

        let lr = self.learning_rate();
        let limits = self.limits();
        let chunksize = self.config.chunksize;
        let mut report = UpdateReport {
            documents: corpus.len(),
            new_authors: ingested.new_authors,
            ..UpdateReport::default()
        };

        for pass in 0..self.config.passes {
            let mut converged = 0;
            for (chunk_no, chunk) in corpus.chunks(chunksize).enumerate() {
                let first_doc = ingested.first_doc + chunk_no * chunksize;
                let rhot = lr.rho_in_pass(pass, self.state.num_updates);

                let out = inference::e_step(
                    &mut self.state,
                    self.exp_elogbeta.view(),
                    &self.index,
                    chunk,
                    first_doc,
                    rhot,
                    limits,
                );
                if out.converged {
                    converged += 1;
                }
                online::m_step(
                    &mut self.state,
                    rhot,
                    out.sstats.view(),
                    chunk.len(),
                    self.auto,
                    pass > 0,
                )?;
                self.exp_elogbeta = self.state.get_exp_elogbeta().into();

                report.chunks += 1;
                if self.config.eval_every > 0 && report.chunks % self.config.eval_every == 0 {
                    self.log_perplexity(chunk, first_doc)?;
                }
            }
            report.converged_chunks += converged;
            report.passes += 1;

            let chunks_per_pass = (corpus.len() + chunksize - 1) / chunksize;
            if converged < chunks_per_pass {
                log::warn!(
                    "pass {}: {}/{} chunks did not converge within {} iterations",
                    pass,
                    chunks_per_pass - converged,
                    chunks_per_pass,
                    limits.iterations
                );
            }
            if (pass + 1) % 10 == 0 || pass + 1 == self.config.passes {
                log::debug!(
                    "Training author-topic model: pass {}/{}",
                    pass + 1,
                    self.config.passes
                );
            }
        }

        report.rho = self.rho();
        log::info!(
            "updated author-topic model with {} documents ({} new authors) over {} passes, {} updates so far",
            report.documents,
            report.new_authors,
            report.passes,
            self.state.num_updates
        );
        Ok(report)
    }

    /// Learning rate the next chunk would be blended with.
    pub fn rho(&self) -> f64 {
        self.learning_rate().rho(self.state.num_updates)
    }

    fn bound_scaled(
        &self,
        chunk: &[BowDocument],
        first_doc: usize,
        subsample_ratio: f64,
    ) -> Result<f64> {
        if first_doc + chunk.len() > self.index.num_docs() {
            return Err(AtError::DocumentOutOfRange {
                doc: first_doc + chunk.len() - 1,
                num_docs: self.index.num_docs(),
            });
        }
        let lambda = self.state.get_lambda();
        let elogbeta = math::dirichlet_expectation_rows(lambda.view());
        let exp_elogbeta = elogbeta.mapv(f64::exp);
        let gamma = self.state.gamma.view();
        let elogtheta = math::dirichlet_expectation_rows(gamma);
        let exp_elogtheta = elogtheta.mapv(f64::exp);
        let alpha = &self.state.alpha;

        // E[log p(docs | theta, beta)]
        let mut word_score = 0.0;
        let mut chunk_authors: Vec<usize> = Vec::new();
        for (i, doc) in chunk.iter().enumerate() {
            let authors = self.index.authors_of(first_doc + i);
            chunk_authors.extend_from_slice(authors);
            let theta = exp_elogtheta.select(Axis(0), authors).mean_axis(Axis(0));
            let theta = match theta {
                Some(t) => t,
                None => continue,
            };
            for &(term, count) in doc {
                let phinorm = theta.dot(&exp_elogbeta.column(term));
                word_score += count * (phinorm + 1e-100).ln();
            }
        }
        word_score *= subsample_ratio;

        // E[log p(theta | alpha) - log q(theta | gamma)]
        chunk_authors.sort_unstable();
        chunk_authors.dedup();
        let alpha_sum_ln = math::ln_gamma(alpha.sum());
        let mut theta_score = 0.0;
        for &a in &chunk_authors {
            let g = gamma.row(a);
            theta_score += ((alpha - &g) * elogtheta.row(a)).sum();
            theta_score += g
                .iter()
                .zip(alpha.iter())
                .map(|(&gk, &ak)| math::ln_gamma(gk) - math::ln_gamma(ak))
                .sum::<f64>();
            theta_score += alpha_sum_ln - math::ln_gamma(g.sum());
        }

        // E[log p(beta | eta) - log q(beta | lambda)]
        let mut beta_score = 0.0;
        for (k, lambda_k) in lambda.axis_iter(Axis(0)).enumerate() {
            let eta_k = self.state.eta.row(k);
            beta_score += ((&eta_k - &lambda_k) * elogbeta.row(k)).sum();
            beta_score += lambda_k
                .iter()
                .zip(eta_k.iter())
                .map(|(&l, &e)| math::ln_gamma(l) - math::ln_gamma(e))
                .sum::<f64>();
            beta_score += math::ln_gamma(eta_k.sum()) - math::ln_gamma(lambda_k.sum());
        }

        Ok(word_score + theta_score + beta_score)
    }

    /// Variational lower bound on the log likelihood of the known documents
    /// `chunk`, the first of which has global index `first_doc`.
    pub fn bound(&self, chunk: &[BowDocument], first_doc: usize) -> Result<f64> {
        self.bound_scaled(chunk, first_doc, 1.0)
    }

    /// Per-word bound of `chunk`, extrapolated to the whole corpus. The
    /// perplexity estimate is `2^(-bound)`.
    pub fn log_perplexity(&self, chunk: &[BowDocument], first_doc: usize) -> Result<f64> {
        let words: f64 = chunk.iter().flat_map(|d| d.iter().map(|&(_, c)| c)).sum();
        if words <= 0.0 {
            return Err(AtError::InvalidValue(
                "cannot evaluate perplexity of an empty chunk".into(),
            ));
        }
        let ratio = self.state.numdocs.max(1) as f64 / chunk.len() as f64;
        let per_word = self.bound_scaled(chunk, first_doc, ratio)? / (ratio * words);
        log::info!(
            "{:.3} per-word bound, {:.1} perplexity estimate based on a held-out corpus of {} documents with {} words",
            per_word,
            (-per_word).exp2(),
            chunk.len(),
            words
        );
        Ok(per_word)
    }

    /// Topic distribution of `author`, entries at or above
    /// `minimum_probability` (config default when `None`), most probable first.
    pub fn get_author_topics(
        &self,
        author: &str,
        minimum_probability: Option<f64>,
    ) -> Result<Vec<(usize, f64)>> {
        let id = self
            .index
            .author_id(author)
            .ok_or_else(|| AtError::UnknownAuthor(author.to_string()))?;
        let dist = normalized(self.state.gamma.view().row(id));
        Ok(ranked(dist.view(), self.minimum(minimum_probability)))
    }

    fn minimum(&self, minimum_probability: Option<f64>) -> f64 {
        minimum_probability
            .unwrap_or(self.config.minimum_probability)
            .max(MIN_REPORTED_PROBABILITY)
    }

    fn check_topic(&self, topic: usize) -> Result<()> {
        if topic >= self.config.num_topics {
            return Err(AtError::TopicOutOfRange {
                topic,
                num_topics: self.config.num_topics,
            });
        }
        Ok(())
    }

    /// Row-normalized `expElogbeta`: one term distribution per topic.
    pub fn get_topics(&self) -> Array2<f64> {
        let mut topics = self.exp_elogbeta.view().to_owned();
        for mut row in topics.axis_iter_mut(Axis(0)) {
            let total = row.sum();
            if total > 0.0 {
                row /= total;
            }
        }
        topics
    }

    /// The `topn` most probable `(term_id, probability)` pairs of `topic`.
    pub fn get_topic_terms(&self, topic: usize, topn: usize) -> Result<Vec<(usize, f64)>> {
        self.check_topic(topic)?;
        let dist = normalized(self.exp_elogbeta.view().row(topic));
        let mut terms: Vec<(usize, f64)> = dist.iter().copied().enumerate().collect();
        terms.sort_by(|a, b| b.1.total_cmp(&a.1));
        terms.truncate(topn);
        Ok(terms)
    }

    /// Like [`get_topic_terms`](Self::get_topic_terms), with term strings.
    pub fn show_topic(&self, topic: usize, topn: usize) -> Result<Vec<(String, f64)>> {
        let vocab = self.vocabulary.as_ref().ok_or(AtError::MissingVocabulary)?;
        Ok(self
            .get_topic_terms(topic, topn)?
            .into_iter()
            .map(|(id, p)| (vocab.term(id).map_or_else(|| id.to_string(), str::to_string), p))
            .collect())
    }

    /// Topics in which `term` has probability at least `minimum_probability`.
    pub fn get_term_topics<'a>(
        &self,
        term: impl Into<TermRef<'a>>,
        minimum_probability: Option<f64>,
    ) -> Result<Vec<(usize, f64)>> {
        let id = match term.into() {
            TermRef::Id(id) if id < self.num_terms => id,
            TermRef::Id(id) => return Err(AtError::UnknownTerm(id.to_string())),
            TermRef::Term(t) => self
                .vocabulary
                .as_ref()
                .ok_or(AtError::MissingVocabulary)?
                .id(t)
                .ok_or_else(|| AtError::UnknownTerm(t.to_string()))?,
        };
        let minimum = self.minimum(minimum_probability);
        let exp = self.exp_elogbeta.view();
        Ok(exp
            .axis_iter(Axis(0))
            .enumerate()
            .filter_map(|(k, row)| {
                let total = row.sum();
                let p = if total > 0.0 { row[id] / total } else { 0.0 };
                (p >= minimum).then_some((k, p))
            })
            .collect())
    }

    /// All topics ranked by UMass coherence of their `topn` terms over
    /// `corpus`, most coherent first.
    pub fn top_topics(&self, corpus: &[BowDocument], topn: usize) -> Result<Vec<TopTopic>> {
        let vocab = self.vocabulary.as_ref().ok_or(AtError::MissingVocabulary)?;
        let ranked_terms = (0..self.config.num_topics)
            .map(|k| self.get_topic_terms(k, topn))
            .collect::<Result<Vec<_>>>()?;
        let ids: Vec<Vec<usize>> = ranked_terms
            .iter()
            .map(|terms| terms.iter().map(|&(id, _)| id).collect())
            .collect();
        let scores = coherence::umass(&ids, corpus);

        let mut topics: Vec<TopTopic> = ranked_terms
            .into_iter()
            .zip(scores)
            .enumerate()
            .map(|(topic, (terms, coherence))| TopTopic {
                topic,
                terms: terms
                    .into_iter()
                    .map(|(id, p)| {
                        let term = vocab.term(id).map_or_else(|| id.to_string(), str::to_string);
                        (term, p)
                    })
                    .collect(),
                coherence,
            })
            .collect();
        topics.sort_by(|a, b| b.coherence.total_cmp(&a.coherence));
        Ok(topics)
    }

    /// Topic distribution of a hypothetical new author of `corpus`. The model
    /// is left unchanged.
    pub fn infer_author_topics(
        &self,
        corpus: &[BowDocument],
        minimum_probability: Option<f64>,
    ) -> Result<Vec<(usize, f64)>> {
        if corpus.is_empty() {
            return Err(AtError::InvalidValue("cannot infer topics from an empty corpus".into()));
        }
        for (d, doc) in corpus.iter().enumerate() {
            sparse::validate_document(d, doc, self.num_terms)?;
        }
        let mut author2doc = AuthorDocs::new();
        author2doc.insert("<new author>".to_string(), (0..corpus.len()).collect());
        let mut index = AuthorIndex::new();
        index.ingest(corpus.len(), Some(&author2doc), None)?;

        let mut rng = seeded_rng(self.config.random_seed);
        let mut scratch = InferenceState::new(
            self.state.alpha.clone(),
            self.state.eta.clone(),
            Array2::zeros((self.config.num_topics, 0)),
        );
        let row = state::random_gamma_matrix(
            &mut rng,
            self.config.init_concentration,
            1,
            self.config.num_topics,
        )?;
        scratch.extend_gamma(row.view())?;

        inference::e_step(
            &mut scratch,
            self.exp_elogbeta.view(),
            &index,
            corpus,
            0,
            1.0,
            self.limits(),
        );
        let dist = normalized(scratch.gamma.view().row(0));
        Ok(ranked(dist.view(), self.minimum(minimum_probability)))
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn num_topics(&self) -> usize {
        self.config.num_topics
    }

    pub fn num_terms(&self) -> usize {
        self.num_terms
    }

    pub fn num_authors(&self) -> usize {
        self.index.num_authors()
    }

    pub fn num_docs(&self) -> usize {
        self.index.num_docs()
    }

    /// Documents consumed by M-steps so far.
    pub fn num_updates(&self) -> u64 {
        self.state.num_updates
    }

    /// Distinct documents ingested so far.
    pub fn numdocs(&self) -> u64 {
        self.state.numdocs
    }

    pub fn alpha(&self) -> ArrayView1<'_, f64> {
        self.state.alpha.view()
    }

    pub fn eta(&self) -> &EtaValues {
        &self.state.eta
    }

    pub fn auto_priors(&self) -> AutoPriors {
        self.auto
    }

    /// Cached `exp(E[log beta])`; memory-mapped after a mapped load.
    pub fn exp_elogbeta(&self) -> &ArrayStore {
        &self.exp_elogbeta
    }

    pub fn state(&self) -> &InferenceState {
        &self.state
    }

    pub fn author_index(&self) -> &AuthorIndex {
        &self.index
    }

    pub fn vocabulary(&self) -> Option<&Dictionary> {
        self.vocabulary.as_ref()
    }

    pub fn author_id(&self, name: &str) -> Option<usize> {
        self.index.author_id(name)
    }

    pub fn author_name(&self, id: usize) -> Option<&str> {
        self.index.author_name(id)
    }
}
