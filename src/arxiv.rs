use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::{PaperId, SortBy, SortOrder};
use crate::error::HarvestError;

pub const ARXIV_API_BASE: &str = "http://export.arxiv.org/api/query";

// export.arxiv.org asks clients to stay well under one request per 3 seconds.
const PAGE_DELAY: Duration = Duration::from_secs(3);

/// One keyword query against the search API.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub page_size: usize,
    pub max_results: Option<usize>,
}

/// One raw search result. Categories are only needed for the allow-list
/// filter and are not part of the persisted record.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: PaperId,
    pub title: String,
    pub authors: Vec<String>,
    pub updated: DateTime<Utc>,
    pub summary: String,
    pub pdf_url: String,
    pub categories: Vec<String>,
}

pub trait SearchClient {
    fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, HarvestError>;
}

#[derive(Clone)]
pub struct ArxivHttpClient {
    client: Client,
}

impl ArxivHttpClient {
    pub fn new() -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("arxiv-harvester/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HarvestError::ArxivHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| HarvestError::ArxivHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn send_with_retries<F>(&self, mut make_req: F) -> Result<reqwest::blocking::Response, HarvestError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        std::thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        std::thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(HarvestError::ArxivHttp(err.to_string()));
                }
            }
        }
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, HarvestError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "arXiv request failed".to_string());
        Err(HarvestError::ArxivStatus { status, message })
    }

    fn fetch_page(&self, request: &SearchRequest, start: usize, limit: usize) -> Result<Vec<Entry>, HarvestError> {
        let response = self.send_with_retries(|| {
            self.client.get(ARXIV_API_BASE).query(&[
                ("search_query", request.query.as_str()),
                ("start", &start.to_string()),
                ("max_results", &limit.to_string()),
                ("sortBy", request.sort_by.as_query_param()),
                ("sortOrder", request.sort_order.as_query_param()),
            ])
        })?;
        let response = Self::handle_status(response)?;
        let body = response
            .bytes()
            .map_err(|err| HarvestError::ArxivHttp(err.to_string()))?;
        let feed = parser::parse(&body[..]).map_err(|err| HarvestError::FeedParse(err.to_string()))?;
        Ok(feed.entries)
    }
}

impl SearchClient for ArxivHttpClient {
    fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, HarvestError> {
        let mut hits = Vec::new();
        let mut start = 0usize;
        loop {
            let limit = match request.max_results {
                Some(cap) => request.page_size.min(cap - hits.len()),
                None => request.page_size,
            };
            if limit == 0 {
                break;
            }

            let entries = self.fetch_page(request, start, limit)?;
            if entries.is_empty() {
                if start == 0 {
                    break;
                }
                return Err(HarvestError::EmptyPage { start });
            }

            let page_len = entries.len();
            hits.extend(entries.into_iter().filter_map(entry_to_hit));

            if page_len < limit {
                break;
            }
            start += page_len;
            if request
                .max_results
                .map(|cap| hits.len() >= cap)
                .unwrap_or(false)
            {
                break;
            }
            std::thread::sleep(PAGE_DELAY);
        }

        if let Some(cap) = request.max_results {
            hits.truncate(cap);
        }
        Ok(hits)
    }
}

/// Maps one Atom entry to a hit; entries without a usable id or timestamp
/// are dropped rather than failing the whole keyword.
fn entry_to_hit(entry: Entry) -> Option<SearchHit> {
    let short_id = short_id_from_entry_id(&entry.id);
    let id: PaperId = match short_id.parse() {
        Ok(id) => id,
        Err(_) => {
            tracing::warn!(entry_id = %entry.id, "skipping feed entry with unusable id");
            return None;
        }
    };
    let Some(updated) = entry.updated else {
        tracing::warn!(id = %id, "skipping feed entry without updated timestamp");
        return None;
    };

    let title = entry
        .title
        .map(|t| normalize_line(&t.content))
        .unwrap_or_default();
    let summary = entry
        .summary
        .map(|s| normalize_line(&s.content))
        .unwrap_or_default();
    let authors = entry
        .authors
        .iter()
        .map(|author| author.name.clone())
        .collect::<Vec<_>>();
    let categories = entry
        .categories
        .iter()
        .map(|category| category.term.clone())
        .collect::<Vec<_>>();
    let pdf_url = entry
        .links
        .iter()
        .find(|link| link.title.as_deref() == Some("pdf") || link.href.contains("/pdf/"))
        .map(|link| link.href.clone())
        .unwrap_or_else(|| format!("http://arxiv.org/pdf/{id}"));

    Some(SearchHit {
        id,
        title,
        authors,
        updated,
        summary,
        pdf_url,
        categories,
    })
}

/// Entry ids are abs URLs (`http://arxiv.org/abs/2301.00001v2`,
/// `http://arxiv.org/abs/cs/0112017v1`); everything after `/abs/` is the
/// short id, slashes in old-style ids included.
fn short_id_from_entry_id(entry_id: &str) -> &str {
    match entry_id.split_once("/abs/") {
        Some((_, rest)) => rest,
        None => entry_id.rsplit('/').next().unwrap_or(entry_id),
    }
}

/// Multi-line API fields (titles wrap, summaries are paragraphs) become a
/// single line so they survive the line-oriented document grammar.
fn normalize_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
