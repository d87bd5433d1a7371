//! Canonical publication records and final list assembly.
//!
//! Assembly order is fixed: deduplicate in source order, sort newest first,
//! then flag the first N as selected.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A normalized publication as written to the website JSON.
///
/// Field order is the key order of the output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPublication {
    pub title: String,
    pub authors: Vec<String>,
    /// Cleaned venue
    pub journal: String,
    /// Publication year, 0 when unknown
    pub year: i32,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Preferred link (DOI resolver URL when a DOI is known)
    #[serde(rename = "html", alias = "url")]
    pub url: String,
    pub doi: Option<String>,
    pub selected: bool,
}

impl CanonicalPublication {
    /// Identity used for deduplication: trimmed lowercased title and year.
    pub fn dedup_key(&self) -> (String, i32) {
        (self.title.trim().to_lowercase(), self.year)
    }
}

/// Drop later records whose (title, year) key was already seen.
pub fn dedupe(publications: Vec<CanonicalPublication>) -> Vec<CanonicalPublication> {
    let mut seen = HashSet::new();
    publications
        .into_iter()
        .filter(|p| seen.insert(p.dedup_key()))
        .collect()
}

/// Sort by (year, title), both descending. Unknown years (0) end up last.
pub fn sort_publications(publications: &mut [CanonicalPublication]) {
    publications.sort_by(|a, b| (b.year, &b.title).cmp(&(a.year, &a.title)));
}

/// Flag the first `count` records as selected and clear the rest.
/// Negative counts select nothing.
pub fn mark_selected(publications: &mut [CanonicalPublication], count: i64) {
    let count = usize::try_from(count.max(0)).unwrap_or(usize::MAX);
    for (idx, p) in publications.iter_mut().enumerate() {
        p.selected = idx < count;
    }
}

/// Deduplicate, sort and mark selection.
pub fn assemble(publications: Vec<CanonicalPublication>, selected: i64) -> Vec<CanonicalPublication> {
    let mut list = dedupe(publications);
    sort_publications(&mut list);
    mark_selected(&mut list, selected);
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication(title: &str, year: i32) -> CanonicalPublication {
        CanonicalPublication {
            title: title.to_string(),
            authors: vec![],
            journal: String::new(),
            year,
            abstract_text: String::new(),
            url: String::new(),
            doi: None,
            selected: false,
        }
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let mut first = publication("Graph Kernels", 2020);
        first.journal = "first".to_string();
        let mut second = publication("graph kernels ", 2020);
        second.journal = "second".to_string();
        let other_year = publication("Graph Kernels", 2021);

        let list = dedupe(vec![first, second, other_year]);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].journal, "first");
        assert_eq!(list[1].year, 2021);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut list = vec![
            publication("b", 2020),
            publication("x", 2022),
            publication("unknown", 0),
            publication("a", 2021),
            publication("c", 2021),
        ];
        sort_publications(&mut list);

        let order: Vec<(i32, &str)> = list.iter().map(|p| (p.year, p.title.as_str())).collect();
        assert_eq!(
            order,
            vec![(2022, "x"), (2021, "c"), (2021, "a"), (2020, "b"), (0, "unknown")]
        );
    }

    #[test]
    fn test_mark_selected() {
        let mut list: Vec<_> = (0..5).map(|i| publication(&i.to_string(), 2020)).collect();

        mark_selected(&mut list, 2);
        let flags: Vec<bool> = list.iter().map(|p| p.selected).collect();
        assert_eq!(flags, vec![true, true, false, false, false]);

        mark_selected(&mut list, 0);
        assert!(list.iter().all(|p| !p.selected));

        mark_selected(&mut list, -4);
        assert!(list.iter().all(|p| !p.selected));

        mark_selected(&mut list, 50);
        assert!(list.iter().all(|p| p.selected));
    }

    #[test]
    fn test_output_keys() {
        let mut p = publication("Zażółć gęślą jaźń", 2023);
        p.url = "https://doi.org/10.1/x".to_string();
        p.doi = Some("10.1/x".to_string());

        let json = serde_json::to_string(&p).expect("serialize");
        assert_eq!(
            json,
            r#"{"title":"Zażółć gęślą jaźń","authors":[],"journal":"","year":2023,"abstract":"","html":"https://doi.org/10.1/x","doi":"10.1/x","selected":false}"#
        );
    }
}
