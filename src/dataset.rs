//! Loading of the Spider text-to-SQL benchmark splits.
//!
//! The benchmark directory holds `train_spider.json`, `train_others.json` and
//! `dev.json`, each a JSON array of examples. Only the natural-language
//! question and the database id are needed for generation; the gold query is
//! kept so callers can compare predictions against it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SqlGenError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpiderExample {
    pub db_id: String,
    pub question: String,
    /// Gold SQL for the example. Never consulted during generation.
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SpiderDataset {
    pub train_spider: Vec<SpiderExample>,
    pub train_others: Vec<SpiderExample>,
    pub dev: Vec<SpiderExample>,
}

impl SpiderDataset {
    /// Loads all three splits from the benchmark directory.
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self {
            train_spider: load_split(&dir.join("train_spider.json"))?,
            train_others: load_split(&dir.join("train_others.json"))?,
            dev: load_split(&dir.join("dev.json"))?,
        })
    }

    /// The combined training split, `train_spider` followed by
    /// `train_others`, in file order.
    pub fn train_examples(&self) -> Vec<SpiderExample> {
        let mut examples = self.train_spider.clone();
        examples.extend(self.train_others.iter().cloned());
        examples
    }

    /// Every example across all splits, in split order. Used to discover
    /// which databases need to be opened.
    pub fn all_examples(&self) -> impl Iterator<Item = &SpiderExample> {
        self.train_spider
            .iter()
            .chain(self.train_others.iter())
            .chain(self.dev.iter())
    }
}

fn load_split(path: &Path) -> Result<Vec<SpiderExample>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| SqlGenError::Dataset(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| SqlGenError::Dataset(format!("Failed to parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("spider_dataset_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_examples_and_ignores_extra_fields() {
        let dir = scratch_dir();
        let path = dir.join("train_spider.json");
        fs::write(
            &path,
            r#"[
                {"db_id": "concert_singer", "question": "How many singers do we have?",
                 "query": "SELECT count(*) FROM singer", "question_toks": ["How", "many"]},
                {"db_id": "pets_1", "question": "How many pets are there?"}
            ]"#,
        )
        .unwrap();

        let examples = load_split(&path).unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].db_id, "concert_singer");
        assert_eq!(
            examples[0].query.as_deref(),
            Some("SELECT count(*) FROM singer")
        );
        assert_eq!(examples[1].query, None);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_split_file_is_a_dataset_error() {
        let dir = scratch_dir();
        let err = load_split(&dir.join("train_spider.json")).unwrap_err();
        assert!(matches!(err, SqlGenError::Dataset(_)));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn malformed_split_file_is_a_dataset_error() {
        let dir = scratch_dir();
        let path = dir.join("dev.json");
        fs::write(&path, r#"[{"db_id": "concert_singer""#).unwrap();

        let err = load_split(&path).unwrap_err();
        assert!(matches!(err, SqlGenError::Dataset(_)));
        assert!(err.to_string().contains("dev.json"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn train_examples_keeps_split_order() {
        let dataset = SpiderDataset {
            train_spider: vec![SpiderExample {
                db_id: "a".to_string(),
                question: "q1".to_string(),
                query: None,
            }],
            train_others: vec![SpiderExample {
                db_id: "b".to_string(),
                question: "q2".to_string(),
                query: None,
            }],
            dev: vec![],
        };

        let train = dataset.train_examples();
        assert_eq!(train.len(), 2);
        assert_eq!(train[0].db_id, "a");
        assert_eq!(train[1].db_id, "b");
        assert_eq!(dataset.all_examples().count(), 2);
    }
}
