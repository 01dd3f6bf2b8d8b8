use std::collections::HashSet;

use crate::domain::{Paper, PaperId};

/// Merges newly fetched papers into an existing partition. Incoming papers
/// whose id is already present are dropped; the rest are appended in
/// encounter order. The combined collection is then fully re-sorted by
/// update time, so the final order never depends on the prior physical
/// order. The sort is stable: equal timestamps keep first-seen order.
pub fn merge(existing: Vec<Paper>, incoming: impl IntoIterator<Item = Paper>) -> Vec<Paper> {
    let mut ids: HashSet<PaperId> = existing.iter().map(|paper| paper.id.clone()).collect();
    let mut merged = existing;
    for paper in incoming {
        if ids.insert(paper.id.clone()) {
            merged.push(paper);
        }
    }
    merged.sort_by(|a, b| a.updated.cmp(&b.updated));
    merged
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn paper(id: &str, updated: NaiveDateTime, title: &str) -> Paper {
        Paper {
            id: id.parse().unwrap(),
            title: title.to_string(),
            authors: vec!["Ada Lovelace".to_string()],
            updated,
            summary: "A summary.".to_string(),
            pdf_url: format!("http://arxiv.org/pdf/{id}"),
        }
    }

    #[test]
    fn merge_with_empty_incoming_is_resorted_identity() {
        let existing = vec![
            paper("2301.00002v1", at(5, 0), "later"),
            paper("2301.00001v1", at(1, 0), "earlier"),
        ];
        let merged = merge(existing.clone(), []);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], existing[1]);
        assert_eq!(merged[1], existing[0]);
    }

    #[test]
    fn duplicate_ids_appear_once() {
        let existing = vec![paper("2301.00001v1", at(1, 0), "kept")];
        let incoming = vec![
            paper("2301.00001v1", at(2, 0), "dropped"),
            paper("2301.00002v1", at(3, 0), "new"),
            paper("2301.00002v1", at(4, 0), "dropped too"),
        ];
        let merged = merge(existing, incoming);
        assert_eq!(merged.len(), 2);
        // The existing record wins over an incoming one with the same id.
        assert_eq!(merged[0].title, "kept");
        assert_eq!(merged[1].title, "new");
    }

    #[test]
    fn result_is_sorted_ascending_by_update_time() {
        let existing = vec![paper("2301.00003v1", at(10, 0), "c")];
        let incoming = vec![
            paper("2301.00001v1", at(2, 0), "a"),
            paper("2301.00002v1", at(6, 0), "b"),
        ];
        let merged = merge(existing, incoming);
        let ids: Vec<&str> = merged.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["2301.00001v1", "2301.00002v1", "2301.00003v1"]);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let existing = vec![paper("2301.00001v1", at(1, 0), "first")];
        let incoming = vec![
            paper("2301.00002v1", at(1, 0), "second"),
            paper("2301.00003v1", at(1, 0), "third"),
        ];
        let merged = merge(existing, incoming);
        let titles: Vec<&str> = merged.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }
}
