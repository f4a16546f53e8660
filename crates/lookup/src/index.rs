//! The subject index: id lookup, prefix search, fuzzy fallback.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use common::Subject;
use common::csv::parse_subject_rows;
use serde::Serialize;

use crate::error::LookupError;
use crate::levenshtein::levenshtein;
use crate::trie::Trie;

/// Maximum edit distance a token may have from the query to count as a
/// fuzzy match.
const FUZZY_DISTANCE: usize = 2;

/// An `{id, image reference}` pair returned by the image lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageResult {
    pub id: u32,
    pub image_id: String,
}

/// Immutable in-memory index over subject rows.
///
/// Construction consumes a parsed CSV, so every index holds at least one
/// row and lookups are infallible.
#[derive(Debug)]
pub struct SubjectIndex {
    rows: Vec<Subject>,
    id_index: HashMap<u32, usize>,
    /// Lowercased name token → rows containing it. Ordered so fuzzy scans
    /// are deterministic.
    name_index: BTreeMap<String, Vec<usize>>,
    trie: Trie,
}

impl SubjectIndex {
    /// Builds an index from raw CSV text.
    pub fn from_csv(content: &str) -> Result<Self, LookupError> {
        if content.trim().lines().count() < 2 {
            return Err(LookupError::NoDataRows);
        }

        let rows = parse_subject_rows(content);
        if rows.is_empty() {
            return Err(LookupError::NoDataRows);
        }

        let mut index = Self {
            rows,
            id_index: HashMap::new(),
            name_index: BTreeMap::new(),
            trie: Trie::default(),
        };
        index.build();
        Ok(index)
    }

    /// Reads and indexes a CSV file.
    pub async fn load_csv(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let index = Self::from_csv(&content)?;
        tracing::info!(rows = index.len(), path = %path.display(), "subject index loaded");
        Ok(index)
    }

    fn build(&mut self) {
        for (row, subject) in self.rows.iter().enumerate() {
            self.id_index.insert(subject.id, row);

            for token in subject.name.split_whitespace() {
                let token = token.to_lowercase();
                let rows = self.name_index.entry(token.clone()).or_default();
                if rows.last() != Some(&row) {
                    rows.push(row);
                }
                self.trie.insert(&token, row);
            }
        }
    }

    /// Returns image references for the subjects whose ids are in
    /// `subject_ids`, preserving row order.
    pub fn images_by_subject_ids(&self, subject_ids: &[u32]) -> Vec<ImageResult> {
        let ids: HashSet<u32> = subject_ids.iter().copied().collect();
        self.rows
            .iter()
            .filter(|row| ids.contains(&row.id))
            .map(|row| ImageResult {
                id: row.id,
                image_id: row.image_id.clone(),
            })
            .collect()
    }

    /// Searches subjects by name.
    ///
    /// Prefix matches from the trie come first; if the result set is still
    /// under `limit`, name tokens within edit distance 2 of the query are
    /// added. A `limit` of 0 means unbounded. Results are deduplicated,
    /// first match wins.
    pub fn search_by_name(&self, query: &str, limit: usize) -> Vec<Subject> {
        let normalized = query.to_lowercase();
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for row in self.trie.rows_with_prefix(&normalized) {
            if limit > 0 && results.len() >= limit {
                break;
            }
            if seen.insert(row) {
                results.push(self.rows[row].clone());
            }
        }

        if limit > 0 && results.len() >= limit {
            return results;
        }

        for (token, rows) in &self.name_index {
            if levenshtein(token, &normalized) <= FUZZY_DISTANCE {
                for &row in rows {
                    if limit > 0 && results.len() >= limit {
                        break;
                    }
                    if seen.insert(row) {
                        results.push(self.rows[row].clone());
                    }
                }
            }
            if limit > 0 && results.len() >= limit {
                break;
            }
        }

        results
    }

    /// Returns the subject with the given id, if indexed.
    pub fn subject_by_id(&self, id: u32) -> Option<&Subject> {
        self.id_index.get(&id).map(|&row| &self.rows[row])
    }

    /// Returns all indexed subjects in row order.
    pub fn all_subjects(&self) -> &[Subject] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "id,name,image_id\n\
                       1,Alice Johnson,img_001.jpg\n\
                       2,Bob Smith,img_002.jpg\n\
                       3,Alan Turing,img_003.jpg\n\
                       4,Carol Smith,img_004.jpg";

    fn index() -> SubjectIndex {
        SubjectIndex::from_csv(CSV).unwrap()
    }

    #[test]
    fn test_rejects_csv_without_data_rows() {
        assert!(matches!(
            SubjectIndex::from_csv("id,name,image_id"),
            Err(LookupError::NoDataRows)
        ));
        assert!(matches!(
            SubjectIndex::from_csv(""),
            Err(LookupError::NoDataRows)
        ));
        // Rows exist but none survive parsing.
        assert!(matches!(
            SubjectIndex::from_csv("id,name,image_id\n0,Nobody,img.jpg"),
            Err(LookupError::NoDataRows)
        ));
    }

    #[test]
    fn test_subject_by_id() {
        let index = index();
        assert_eq!(index.subject_by_id(3).unwrap().name, "Alan Turing");
        assert!(index.subject_by_id(99).is_none());
    }

    #[test]
    fn test_images_by_subject_ids_preserves_row_order() {
        let index = index();
        let images = index.images_by_subject_ids(&[4, 1, 99]);
        assert_eq!(
            images,
            vec![
                ImageResult {
                    id: 1,
                    image_id: "img_001.jpg".to_string()
                },
                ImageResult {
                    id: 4,
                    image_id: "img_004.jpg".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_prefix_search_is_case_insensitive() {
        let index = index();
        let results = index.search_by_name("AL", 10);
        let names: Vec<&str> = results.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alice Johnson", "Alan Turing"]);
    }

    #[test]
    fn test_search_matches_any_name_token() {
        let index = index();
        let results = index.search_by_name("smith", 10);
        let names: Vec<&str> = results.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Bob Smith", "Carol Smith"]);
    }

    #[test]
    fn test_fuzzy_search_within_distance_two() {
        let index = index();
        // "alyce" is one substitution away from the "alice" token.
        let results = index.search_by_name("alyce", 10);
        assert!(results.iter().any(|s| s.name == "Alice Johnson"));
        // Three edits away matches nothing.
        assert!(index.search_by_name("alxyz", 10).is_empty());
    }

    #[test]
    fn test_limit_caps_results() {
        let index = index();
        assert_eq!(index.search_by_name("smith", 1).len(), 1);
        // Zero means unbounded.
        assert_eq!(index.search_by_name("smith", 0).len(), 2);
    }

    #[test]
    fn test_results_are_deduplicated() {
        let index =
            SubjectIndex::from_csv("id,name,image_id\n1,Ann Ann,img.jpg\n2,Anne Hall,img2.jpg")
                .unwrap();
        // Both tokens of "Ann Ann" share the prefix; the row appears once.
        let results = index.search_by_name("ann", 10);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_all_subjects() {
        let index = index();
        assert_eq!(index.len(), 4);
        assert!(!index.is_empty());
        assert_eq!(index.all_subjects()[1].name, "Bob Smith");
    }

    #[tokio::test]
    async fn test_load_csv_missing_file_is_io_error() {
        let result = SubjectIndex::load_csv("/nonexistent/subjects.csv").await;
        assert!(matches!(result, Err(LookupError::Io(_))));
    }
}
