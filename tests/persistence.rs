mod common;

use approx::assert_abs_diff_eq;
use authortopic::{AtError, AuthorDocs, AuthorTopicModel, LoadMode, ModelConfig, Prior, SaveOptions};
use ndarray::ArrayView2;
use std::fs;

const AUTHORS: [&str; 4] = ["john", "jane", "jack", "jill"];

fn trained() -> AuthorTopicModel {
    AuthorTopicModel::with_corpus(
        ModelConfig::new(2).passes(5).alpha(Prior::Auto).random_seed(11),
        Some(common::dictionary()),
        &common::corpus(),
        Some(&common::author2doc()),
        None,
    )
    .unwrap()
}

fn assert_close(a: ArrayView2<f64>, b: ArrayView2<f64>) {
    assert_eq!(a.dim(), b.dim());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_abs_diff_eq!(x, y, epsilon = 1e-12);
    }
}

fn assert_same_model(a: &AuthorTopicModel, b: &AuthorTopicModel) {
    assert_eq!(a.config(), b.config());
    assert_eq!(a.alpha(), b.alpha());
    assert_eq!(a.eta(), b.eta());
    assert_eq!(a.num_updates(), b.num_updates());
    assert_eq!(a.numdocs(), b.numdocs());
    assert_eq!(a.auto_priors(), b.auto_priors());
    assert_abs_diff_eq!(a.rho(), b.rho());
    assert_close(a.state().sstats.view(), b.state().sstats.view());
    assert_close(a.state().gamma.view(), b.state().gamma.view());
    assert_close(a.exp_elogbeta().view(), b.exp_elogbeta().view());
    for author in AUTHORS {
        assert_eq!(a.author_id(author), b.author_id(author));
        assert_eq!(
            a.get_author_topics(author, Some(0.0)).unwrap(),
            b.get_author_topics(author, Some(0.0)).unwrap()
        );
    }
}

#[test]
fn test_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.atm");
    let model = trained();
    model.save(&path, &SaveOptions::default()).unwrap();

    let loaded = AuthorTopicModel::load(&path, LoadMode::InMemory).unwrap();
    assert_same_model(&model, &loaded);
    assert_eq!(model.vocabulary(), loaded.vocabulary());
    assert!(!loaded.exp_elogbeta().is_mapped());
    assert_eq!(model.show_topic(0, 4).unwrap(), loaded.show_topic(0, 4).unwrap());
}

#[test]
fn test_loaded_model_keeps_training() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.atm");
    let model = trained();
    model.save(&path, &SaveOptions::default()).unwrap();

    let mut loaded = AuthorTopicModel::load(&path, LoadMode::InMemory).unwrap();
    let dictionary = common::dictionary();
    let mut author2doc = AuthorDocs::new();
    author2doc.insert("jill".to_string(), vec![0]);
    loaded
        .update(&[dictionary.doc2bow(&["graph", "minors"])], Some(&author2doc), None)
        .unwrap();
    assert_eq!(loaded.num_docs(), 10);
    // later passes revisit the document without counting it again
    assert_eq!(loaded.num_updates(), model.num_updates() + 1);
    assert_eq!(loaded.num_updates(), loaded.numdocs());
    assert!(loaded.rho() < model.rho());
}

#[test]
fn test_ignored_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.atm");
    let model = trained();
    let options = SaveOptions::new().ignore("vocabulary").ignore("exp_elogbeta");
    model.save(&path, &options).unwrap();

    let loaded = AuthorTopicModel::load(&path, LoadMode::InMemory).unwrap();
    assert!(loaded.vocabulary().is_none());
    assert!(matches!(loaded.show_topic(0, 3), Err(AtError::MissingVocabulary)));
    // rebuilt from the statistics
    assert_close(model.exp_elogbeta().view(), loaded.exp_elogbeta().view());
    assert_eq!(model.get_topic_terms(1, 3).unwrap(), loaded.get_topic_terms(1, 3).unwrap());
}

#[test]
fn test_compressed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.atm.zst");
    let model = trained();
    model.save(&path, &SaveOptions::new().sep_limit(0)).unwrap();
    assert!(dir.path().join("model.atm.zst.sstats.f64.zst").exists());
    assert!(dir.path().join("model.atm.zst.gamma.f64.zst").exists());

    let loaded = AuthorTopicModel::load(&path, LoadMode::InMemory).unwrap();
    assert_same_model(&model, &loaded);
    assert_eq!(model.vocabulary(), loaded.vocabulary());
}

#[test]
fn test_large_arrays_stored_separately() {
    let dir = tempfile::tempdir().unwrap();
    let model = trained();

    let inline = dir.path().join("inline.atm");
    model.save(&inline, &SaveOptions::default()).unwrap();
    assert!(!dir.path().join("inline.atm.sstats.f64").exists());

    let separate = dir.path().join("separate.atm");
    model.save(&separate, &SaveOptions::new().sep_limit(0)).unwrap();
    let raw = fs::read(dir.path().join("separate.atm.sstats.f64")).unwrap();
    assert_eq!(raw.len(), model.num_topics() * model.num_terms() * 8);
    assert!(fs::metadata(&separate).unwrap().len() < fs::metadata(&inline).unwrap().len());
}

#[test]
fn test_mapped_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.atm");
    let model = trained();
    model.save(&path, &SaveOptions::new().sep_limit(0)).unwrap();

    let mut mapped = AuthorTopicModel::load(&path, LoadMode::Mapped).unwrap();
    assert!(mapped.exp_elogbeta().is_mapped());
    assert!(mapped.state().sstats.is_mapped());
    assert!(mapped.state().gamma.is_mapped());
    assert_same_model(&model, &mapped);

    // training copies the mapped arrays instead of writing through
    let sstats_file = dir.path().join("model.atm.sstats.f64");
    let before = fs::read(&sstats_file).unwrap();
    mapped
        .update(&common::corpus()[..2], Some(&single_author("jane", 2)), None)
        .unwrap();
    assert!(!mapped.state().sstats.is_mapped());
    assert!(!mapped.state().gamma.is_mapped());
    assert_eq!(fs::read(&sstats_file).unwrap(), before);
}

#[test]
fn test_mapped_load_of_compressed_arrays_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.atm.zst");
    trained().save(&path, &SaveOptions::new().sep_limit(0)).unwrap();
    assert!(matches!(
        AuthorTopicModel::load(&path, LoadMode::Mapped),
        Err(AtError::Io(_))
    ));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        AuthorTopicModel::load(dir.path().join("nope"), LoadMode::InMemory),
        Err(AtError::Io(_))
    ));
}

fn single_author(name: &str, docs: usize) -> AuthorDocs {
    let mut map = AuthorDocs::new();
    map.insert(name.to_string(), (0..docs).collect());
    map
}
