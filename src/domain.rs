use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

/// Timestamp layout used in rendered documents, e.g. `2023-01-15 10:30:00`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// arXiv short identifier, version suffix included (`2301.00001v2`,
/// `cs/0112017`). The id is the dedup key across every run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaperId(String);

impl PaperId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PaperId {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        // The id is serialized between backticks in the document grammar,
        // so a backtick (or whitespace) inside one can never round-trip.
        let is_valid = !normalized.is_empty()
            && normalized.chars().any(|ch| ch.is_ascii_digit())
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_graphic() && ch != '`');
        if !is_valid {
            return Err(HarvestError::InvalidPaperId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// One ingested paper. The JSONL records file stores these verbatim; the
/// rendered document is generated from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,
    pub title: String,
    pub authors: Vec<String>,
    pub updated: NaiveDateTime,
    pub summary: String,
    pub pdf_url: String,
}

impl Paper {
    /// Partition year, derived from the update timestamp.
    pub fn year(&self) -> i32 {
        self.updated.year()
    }

    /// Sub-period grouping key, `YYYY-MM`.
    pub fn month_key(&self) -> String {
        self.updated.format("%Y-%m").to_string()
    }

    pub fn updated_display(&self) -> String {
        self.updated.format(TIMESTAMP_FORMAT).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum SortBy {
    #[serde(rename = "relevance")]
    Relevance,
    #[serde(rename = "lastUpdatedDate")]
    LastUpdatedDate,
    #[serde(rename = "submittedDate")]
    SubmittedDate,
}

impl SortBy {
    pub fn as_query_param(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::LastUpdatedDate => "lastUpdatedDate",
            SortBy::SubmittedDate => "submittedDate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_query_param(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    use super::*;

    fn paper(id: &str, updated: NaiveDateTime) -> Paper {
        Paper {
            id: id.parse().unwrap(),
            title: "A title".to_string(),
            authors: vec!["Ada Lovelace".to_string()],
            updated,
            summary: "A summary.".to_string(),
            pdf_url: format!("http://arxiv.org/pdf/{id}"),
        }
    }

    #[test]
    fn parse_paper_id_new_style() {
        let id: PaperId = "2301.00001v2".parse().unwrap();
        assert_eq!(id.as_str(), "2301.00001v2");
    }

    #[test]
    fn parse_paper_id_old_style() {
        let id: PaperId = "cs/0112017".parse().unwrap();
        assert_eq!(id.as_str(), "cs/0112017");
    }

    #[test]
    fn parse_paper_id_invalid() {
        assert_matches!(
            "".parse::<PaperId>().unwrap_err(),
            HarvestError::InvalidPaperId(_)
        );
        assert_matches!(
            "has space".parse::<PaperId>().unwrap_err(),
            HarvestError::InvalidPaperId(_)
        );
        assert_matches!(
            "tick`2301.1".parse::<PaperId>().unwrap_err(),
            HarvestError::InvalidPaperId(_)
        );
    }

    #[test]
    fn partition_keys() {
        let updated = NaiveDate::from_ymd_opt(2023, 2, 7)
            .unwrap()
            .and_hms_opt(18, 4, 1)
            .unwrap();
        let paper = paper("2302.01234v1", updated);
        assert_eq!(paper.year(), 2023);
        assert_eq!(paper.month_key(), "2023-02");
        assert_eq!(paper.updated_display(), "2023-02-07 18:04:01");
    }

    #[test]
    fn sort_params() {
        assert_eq!(SortBy::LastUpdatedDate.as_query_param(), "lastUpdatedDate");
        assert_eq!(SortOrder::Descending.as_query_param(), "descending");
    }
}
