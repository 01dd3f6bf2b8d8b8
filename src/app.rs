use std::collections::BTreeMap;

use serde::Serialize;

use crate::arxiv::{SearchClient, SearchHit, SearchRequest};
use crate::config::{ResolvedConfig, Subject};
use crate::domain::Paper;
use crate::error::{ErrorPolicy, HarvestError};
use crate::markdown;
use crate::merge::merge;
use crate::store::Store;

/// Ingestion driver. One `run` processes every configured subject in
/// sequence; durable state is only touched for subjects and years that
/// actually accepted new papers.
#[derive(Clone)]
pub struct App<C: SearchClient> {
    store: Store,
    client: C,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub subjects: Vec<SubjectOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectOutcome {
    pub subject: String,
    pub accepted: usize,
    pub years: Vec<i32>,
    pub skipped_keywords: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub subjects: Vec<SubjectStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectStatus {
    pub subject: String,
    pub seen: usize,
    pub years: Vec<i32>,
}

impl<C: SearchClient> App<C> {
    pub fn new(store: Store, client: C) -> Self {
        Self { store, client }
    }

    pub fn run(&self, config: &ResolvedConfig) -> Result<RunReport, HarvestError> {
        let mut subjects = Vec::new();
        for subject in &config.subjects {
            match self.ingest_subject(subject, config) {
                Ok(outcome) => subjects.push(outcome),
                Err(err) if err.policy() == ErrorPolicy::AbortRun => return Err(err),
                Err(err) => {
                    tracing::error!(subject = %subject.name, %err, "subject aborted");
                    subjects.push(SubjectOutcome {
                        subject: subject.name.clone(),
                        accepted: 0,
                        years: Vec::new(),
                        skipped_keywords: Vec::new(),
                        error: Some(err.to_string()),
                    });
                }
            }
        }
        Ok(RunReport { subjects })
    }

    /// One subject, single pass: load seen → fetch and filter per keyword →
    /// bucket accepted papers by update year → reconcile each year → save
    /// the seen set only if it grew.
    fn ingest_subject(
        &self,
        subject: &Subject,
        config: &ResolvedConfig,
    ) -> Result<SubjectOutcome, HarvestError> {
        let mut seen = self.store.load_seen(&subject.name)?;
        let initial_seen = seen.len();

        let mut by_year: BTreeMap<i32, Vec<Paper>> = BTreeMap::new();
        let mut skipped_keywords = Vec::new();

        for keyword in &subject.keywords {
            let request = SearchRequest {
                query: keyword.clone(),
                sort_by: config.sort_by,
                sort_order: config.sort_order,
                page_size: config.page_size,
                max_results: config.max_results,
            };
            let hits = match self.client.search(&request) {
                Ok(hits) => hits,
                Err(err) if err.policy() == ErrorPolicy::SkipKeyword => {
                    tracing::warn!(
                        subject = %subject.name,
                        keyword = %keyword,
                        %err,
                        "search failed, keyword skipped"
                    );
                    skipped_keywords.push(keyword.clone());
                    continue;
                }
                Err(err) => return Err(err),
            };

            for hit in hits {
                let allowed = hit
                    .categories
                    .iter()
                    .any(|category| subject.categories.iter().any(|c| c == category));
                if !allowed {
                    continue;
                }
                if seen.contains(&hit.id) {
                    continue;
                }
                // Added before bucketing so a paper matched by two keywords
                // in the same run is still accepted once.
                seen.insert(hit.id.clone());
                let paper = hit_to_paper(hit);
                by_year.entry(paper.year()).or_default().push(paper);
            }
        }

        let mut years = Vec::new();
        for (year, new_papers) in by_year {
            let existing = self.existing_records(&subject.name, year)?;
            let merged = merge(existing, new_papers);
            self.store.save_records(&subject.name, year, &merged)?;
            self.store
                .save_document(&subject.name, year, &markdown::render(year, &merged))?;
            years.push(year);
        }

        let accepted = seen.len() - initial_seen;
        if accepted > 0 {
            self.store.save_seen(&subject.name, &seen)?;
        }
        tracing::info!(subject = %subject.name, accepted, ?years, "subject ingested");

        Ok(SubjectOutcome {
            subject: subject.name.clone(),
            accepted,
            years,
            skipped_keywords,
            error: None,
        })
    }

    /// Previously persisted records for a partition: the records file when
    /// present, else a legacy rendered document parsed back into records,
    /// else the empty collection.
    fn existing_records(&self, subject: &str, year: i32) -> Result<Vec<Paper>, HarvestError> {
        if let Some(records) = self.store.load_records(subject, year)? {
            return Ok(records);
        }
        match self.store.load_document(subject, year)? {
            Some(document) => Ok(markdown::parse(&document)),
            None => Ok(Vec::new()),
        }
    }

    /// Read-only view of the store for the `status` command.
    pub fn status(&self) -> Result<StatusReport, HarvestError> {
        let mut subjects = Vec::new();
        for subject in self.store.subjects_present()? {
            let seen = self.store.load_seen(&subject)?;
            let years = self.store.years_present(&subject)?;
            subjects.push(SubjectStatus {
                subject,
                seen: seen.len(),
                years,
            });
        }
        Ok(StatusReport { subjects })
    }
}

/// Accepted hits become durable records: timestamps are truncated to whole
/// seconds so the records file and the rendered document agree exactly.
fn hit_to_paper(hit: SearchHit) -> Paper {
    use chrono::Timelike;

    let naive = hit.updated.naive_utc();
    Paper {
        id: hit.id,
        title: hit.title,
        authors: hit.authors,
        updated: naive.with_nanosecond(0).unwrap_or(naive),
        summary: hit.summary,
        pdf_url: hit.pdf_url,
    }
}
