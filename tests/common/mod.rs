#![allow(dead_code)]

use authortopic::{AuthorDocs, BowDocument, DocAuthors, Dictionary};

/// The nine Deerwester titles, already tokenized.
pub fn texts() -> Vec<Vec<&'static str>> {
    vec![
        vec!["human", "interface", "computer"],
        vec!["survey", "user", "computer", "system", "response", "time"],
        vec!["eps", "user", "interface", "system"],
        vec!["system", "human", "system", "eps"],
        vec!["user", "response", "time"],
        vec!["trees"],
        vec!["graph", "trees"],
        vec!["graph", "minors", "trees"],
        vec!["graph", "minors", "survey"],
    ]
}

pub fn dictionary() -> Dictionary {
    Dictionary::from_documents(&texts())
}

pub fn corpus() -> Vec<BowDocument> {
    let dictionary = dictionary();
    texts().iter().map(|t| dictionary.doc2bow(t)).collect()
}

pub fn author2doc() -> AuthorDocs {
    let mut map = AuthorDocs::new();
    map.insert("john".to_string(), vec![0, 1, 2, 3, 4, 5, 6]);
    map.insert("jane".to_string(), vec![2, 3, 4, 5, 6, 7, 8]);
    map.insert("jack".to_string(), vec![0, 2, 4, 6, 8]);
    map.insert("jill".to_string(), vec![1, 3, 5, 7]);
    map
}

/// Same relation as [`author2doc`], authors listed in the same order.
pub fn doc2author() -> DocAuthors {
    let rows: [&[&str]; 9] = [
        &["john", "jack"],
        &["john", "jill"],
        &["john", "jane", "jack"],
        &["john", "jane", "jill"],
        &["john", "jane", "jack"],
        &["john", "jane", "jill"],
        &["john", "jane", "jack"],
        &["jane", "jill"],
        &["jane", "jack"],
    ];
    rows.iter()
        .enumerate()
        .map(|(d, names)| (d, names.iter().map(|n| n.to_string()).collect()))
        .collect()
}
