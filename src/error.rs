use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarvestError {
    #[error("invalid arXiv identifier: {0}")]
    InvalidPaperId(String),

    #[error("missing config file arxiv-harvest.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("arXiv request failed: {0}")]
    ArxivHttp(String),

    #[error("arXiv returned status {status}: {message}")]
    ArxivStatus { status: u16, message: String },

    #[error("arXiv returned an empty page at offset {start} with more results expected")]
    EmptyPage { start: usize },

    #[error("failed to parse Atom feed: {0}")]
    FeedParse(String),

    #[error("corrupt seen-id set for subject {subject}: {message}")]
    CorruptSeenSet { subject: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

/// What the ingestion driver does with a failure, keyed by error kind
/// rather than decided ad hoc at each catch site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    SkipKeyword,
    AbortSubject,
    AbortRun,
}

impl HarvestError {
    pub fn policy(&self) -> ErrorPolicy {
        match self {
            HarvestError::ArxivHttp(_)
            | HarvestError::ArxivStatus { .. }
            | HarvestError::EmptyPage { .. }
            | HarvestError::FeedParse(_) => ErrorPolicy::SkipKeyword,
            HarvestError::CorruptSeenSet { .. } | HarvestError::Filesystem(_) => {
                ErrorPolicy::AbortSubject
            }
            HarvestError::InvalidPaperId(_)
            | HarvestError::MissingConfig
            | HarvestError::ConfigRead(_)
            | HarvestError::ConfigParse(_) => ErrorPolicy::AbortRun,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failures_skip_the_keyword() {
        assert_eq!(
            HarvestError::ArxivHttp("timed out".to_string()).policy(),
            ErrorPolicy::SkipKeyword
        );
        assert_eq!(
            HarvestError::EmptyPage { start: 100 }.policy(),
            ErrorPolicy::SkipKeyword
        );
    }

    #[test]
    fn corrupt_seen_set_aborts_the_subject() {
        let err = HarvestError::CorruptSeenSet {
            subject: "ml".to_string(),
            message: "not a JSON array".to_string(),
        };
        assert_eq!(err.policy(), ErrorPolicy::AbortSubject);
    }

    #[test]
    fn config_errors_abort_the_run() {
        assert_eq!(HarvestError::MissingConfig.policy(), ErrorPolicy::AbortRun);
    }
}
