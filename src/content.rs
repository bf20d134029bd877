//! Static content pools (questions, topics, words)
//!
//! Loaded once at startup from CSV files with a header row and shared
//! read-only by every room. A missing file falls back to a small built-in list.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Failed to read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file} is missing the '{column}' column")]
    MissingColumn { file: String, column: String },

    #[error("Malformed CSV in {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },
}

/// A WordWolf topic pair: everyone gets `majority`, the outlier gets `minority`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopicPair {
    pub majority: String,
    pub minority: String,
}

#[derive(Debug, Clone)]
pub struct Content {
    pub questions: Vec<String>,
    pub word_wolf_topics: Vec<TopicPair>,
    pub sekai_questions: Vec<String>,
    pub sekai_words: Vec<String>,
    pub ito_topics: Vec<String>,
}

impl Default for Content {
    fn default() -> Self {
        Self {
            questions: default_questions(),
            word_wolf_topics: default_word_wolf_topics(),
            sekai_questions: default_sekai_questions(),
            sekai_words: default_sekai_words(),
            ito_topics: default_ito_topics(),
        }
    }
}

impl Content {
    /// Load every content file from `dir`
    pub fn load(dir: &Path) -> Result<Self, ContentError> {
        let questions = load_rows::<QuestionRow>(dir, "questions.csv", &["question"])?
            .map(|rows| rows.into_iter().map(|r| r.question).collect())
            .unwrap_or_else(default_questions);

        let word_wolf_topics =
            load_rows::<TopicRow>(dir, "word_wolf_topics.csv", &["majority", "minority"])?
                .map(|rows| {
                    rows.into_iter()
                        .map(|r| TopicPair {
                            majority: r.majority,
                            minority: r.minority,
                        })
                        .collect()
                })
                .unwrap_or_else(default_word_wolf_topics);

        let sekai_questions = load_rows::<QuestionRow>(dir, "sekai_questions.csv", &["question"])?
            .map(|rows| rows.into_iter().map(|r| r.question).collect())
            .unwrap_or_else(default_sekai_questions);
        let sekai_words = load_rows::<WordRow>(dir, "sekai_words.csv", &["word"])?
            .map(|rows| rows.into_iter().map(|r| r.word).collect())
            .unwrap_or_else(default_sekai_words);
        let ito_topics = load_rows::<ItoTopicRow>(dir, "ito_topics.csv", &["topic"])?
            .map(|rows| rows.into_iter().map(|r| r.topic).collect())
            .unwrap_or_else(default_ito_topics);

        tracing::info!(
            "Content loaded: {} questions, {} word wolf topics, {} sekai questions, {} sekai words, {} ito topics",
            questions.len(),
            word_wolf_topics.len(),
            sekai_questions.len(),
            sekai_words.len(),
            ito_topics.len()
        );

        Ok(Self {
            questions,
            word_wolf_topics,
            sekai_questions,
            sekai_words,
            ito_topics,
        })
    }
}

#[derive(Debug, Deserialize)]
struct QuestionRow {
    question: String,
}

#[derive(Debug, Deserialize)]
struct TopicRow {
    majority: String,
    minority: String,
}

#[derive(Debug, Deserialize)]
struct WordRow {
    word: String,
}

#[derive(Debug, Deserialize)]
struct ItoTopicRow {
    topic: String,
}

/// Read a CSV file with a header row into typed rows. Rows with an empty
/// required field are skipped. Returns `None` when the file does not exist.
fn load_rows<T: DeserializeOwned>(
    dir: &Path,
    file: &str,
    required: &[&str],
) -> Result<Option<Vec<T>>, ContentError> {
    let path = dir.join(file);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("{} not found, using built-in defaults", path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(ContentError::Io {
                file: file.to_string(),
                source,
            })
        }
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

    let csv_error = |source| ContentError::Csv {
        file: file.to_string(),
        source,
    };

    let headers = reader.headers().map_err(csv_error)?.clone();
    let mut indices = Vec::with_capacity(required.len());
    for column in required {
        let index = headers
            .iter()
            .position(|h| h == *column)
            .ok_or_else(|| ContentError::MissingColumn {
                file: file.to_string(),
                column: column.to_string(),
            })?;
        indices.push(index);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let complete = indices
            .iter()
            .all(|&i| record.get(i).is_some_and(|f| !f.is_empty()));
        if !complete {
            continue;
        }
        rows.push(record.deserialize(Some(&headers)).map_err(csv_error)?);
    }

    Ok(Some(rows))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_questions() -> Vec<String> {
    strings(&[
        "Favorite food?",
        "What would you bring to a desert island?",
        "Your childhood dream job?",
    ])
}

fn default_word_wolf_topics() -> Vec<TopicPair> {
    vec![TopicPair {
        majority: "Apple".to_string(),
        minority: "Pear".to_string(),
    }]
}

fn default_sekai_questions() -> Vec<String> {
    strings(&[
        "I'm going home early today because I don't have enough ___",
        "\"___\" is my motto in life",
    ])
}

fn default_sekai_words() -> Vec<String> {
    strings(&[
        "Love", "Money", "Time", "Friendship", "Sleep", "Curry", "Cats", "The boss",
    ])
}

fn default_ito_topics() -> Vec<String> {
    strings(&["Scary things", "Cute things", "Tasty things", "Expensive things"])
}
