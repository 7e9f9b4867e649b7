extern crate log;

use std::collections::HashSet;

use authortopic::{AuthorDocs, AuthorTopicModel, Dictionary, ModelConfig};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::*;

//
// Short essays on AI and observability, each credited to one or two authors.
//
const DOCUMENTS: &[(&[&str], &str)] = &[
    (&["ada"], "In the realm of AI, particularly with the rise of large language models and modern machine learning, it's essential to reflect on the value of classic expert systems from the 1970s to the 1990s"),
    (&["ada", "grace"], "While contemporary AI often operates as a black box, classic expert systems operate on a white box principle, in which the reasoning process is transparent: IF these conditions are true, THEN this conclusion"),
    (&["linus"], "This clarity is crucial in fields like observability, where understanding the decision-making chain is paramount"),
    (&["grace"], "Expert systems are built on human knowledge, excelling in areas where data are limited or nonexistent, yet experts possess deep theoretical and experiential insights. In contrast, modern AI typically requires large amounts of data, which may not come easily in telemetry collection applications"),
    (&["ada"], "Predictability is another strength of expert systems. They consistently produce the same output for identical inputs, making them reliable"),
    (&["linus", "grace"], "This predictability is beneficial in observability, whereas modern AI can exhibit statistical variability, leading to different answers and unpredictable behavior with slight shifts in input data"),
    (&["linus"], "Telemetry pipelines collect metrics, logs and traces so that observability tools can explain the behavior of running systems"),
];

fn stopwords() -> HashSet<&'static str> {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it",
        "of", "on", "or", "that", "the", "to", "was", "were", "will", "with", "this", "which",
        "can", "they", "them", "these", "may", "not", "so", "yet", "like", "while", "whereas",
    ]
    .into_iter()
    .collect()
}

fn tokenize(text: &str, stop: &HashSet<&str>) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphabetic() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|tok| tok.len() >= 3 && !stop.contains(*tok))
        .map(|tok| tok.to_string())
        .collect()
}

fn main() -> authortopic::Result<()> {
    env_logger::init();

    let stop = stopwords();
    let texts: Vec<Vec<String>> = DOCUMENTS.iter().map(|(_, text)| tokenize(text, &stop)).collect();
    let dictionary = Dictionary::from_documents(&texts);
    let corpus: Vec<_> = texts.iter().map(|t| dictionary.doc2bow(t)).collect();

    let mut author2doc = AuthorDocs::new();
    for (doc, (authors, _)) in DOCUMENTS.iter().enumerate() {
        for author in authors.iter() {
            author2doc.entry(author.to_string()).or_default().push(doc);
        }
    }

    let config = ModelConfig::new(3).passes(100).chunksize(4).random_seed(42);
    println!(
        "Training author-topic model (K={}, passes={}) on {} documents...",
        config.num_topics,
        config.passes,
        corpus.len()
    );
    let model =
        AuthorTopicModel::with_corpus(config, Some(dictionary), &corpus, Some(&author2doc), None)?;
    log::info!("final learning rate {:.4}", model.rho());

    let mut topics_table = Table::new();
    topics_table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Topic ID").fg(Color::Red),
            Cell::new("Coherence").fg(Color::Red),
            Cell::new("Words").fg(Color::White),
        ]);
    for topic in model.top_topics(&corpus, 6)? {
        let words: Vec<String> = topic.terms.iter().map(|(w, p)| format!("{w}[{p:.3}]")).collect();
        topics_table.add_row(vec![
            Cell::new(topic.topic),
            Cell::new(format!("{:.3}", topic.coherence)),
            Cell::new(words.join(" ")),
        ]);
    }
    println!("{topics_table}");

    let mut authors_table = Table::new();
    authors_table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![Cell::new("Author").fg(Color::Red), Cell::new("Topics").fg(Color::White)]);
    for author in author2doc.keys() {
        let topics: Vec<String> = model
            .get_author_topics(author, None)?
            .iter()
            .map(|(k, p)| format!("{k}[{p:.3}]"))
            .collect();
        authors_table.add_row(vec![Cell::new(author), Cell::new(topics.join(" "))]);
    }
    println!("{authors_table}");
    Ok(())
}
