use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{SortBy, SortOrder};
use crate::error::HarvestError;

pub const DEFAULT_CONFIG_FILE: &str = "arxiv-harvest.json";
pub const DEFAULT_DB_ROOT: &str = "arxiv-db";
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    // BTreeMap keeps subject iteration order stable across runs.
    #[serde(default)]
    pub subjects: BTreeMap<String, SubjectEntry>,
    #[serde(default)]
    pub sort_by: Option<SortBy>,
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub db_root: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SubjectEntry {
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Subject {
    pub name: String,
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub subjects: Vec<Subject>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub page_size: usize,
    pub max_results: Option<usize>,
    pub db_root: Utf8PathBuf,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, HarvestError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(HarvestError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| HarvestError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| HarvestError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, HarvestError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let page_size = config.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(HarvestError::ConfigParse(
                "page_size must be at least 1".to_string(),
            ));
        }

        let subjects = config
            .subjects
            .into_iter()
            .map(|(name, entry)| {
                if entry.keywords.is_empty() {
                    return Err(HarvestError::ConfigParse(format!(
                        "subject {name} has no keywords"
                    )));
                }
                Ok(Subject {
                    name,
                    keywords: entry.keywords,
                    categories: entry.categories,
                })
            })
            .collect::<Result<Vec<_>, HarvestError>>()?;

        Ok(ResolvedConfig {
            schema_version,
            subjects,
            sort_by: config.sort_by.unwrap_or(SortBy::LastUpdatedDate),
            sort_order: config.sort_order.unwrap_or(SortOrder::Descending),
            page_size,
            max_results: config.max_results,
            db_root: Utf8PathBuf::from(
                config.db_root.unwrap_or_else(|| DEFAULT_DB_ROOT.to_string()),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn resolve_config_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "subjects": {
                    "Machine Learning": {
                        "keywords": ["diffusion model"],
                        "categories": ["cs.LG", "stat.ML"]
                    }
                }
            }"#,
        )
        .unwrap();

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.subjects.len(), 1);
        assert_eq!(resolved.subjects[0].name, "Machine Learning");
        assert_eq!(resolved.sort_by, SortBy::LastUpdatedDate);
        assert_eq!(resolved.sort_order, SortOrder::Descending);
        assert_eq!(resolved.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(resolved.max_results, None);
        assert_eq!(resolved.db_root, Utf8PathBuf::from(DEFAULT_DB_ROOT));
    }

    #[test]
    fn resolve_config_explicit_values() {
        let config: Config = serde_json::from_str(
            r#"{
                "subjects": {
                    "Robotics": {"keywords": ["slam"], "categories": ["cs.RO"]}
                },
                "sort_by": "submittedDate",
                "sort_order": "ascending",
                "page_size": 50,
                "max_results": 200,
                "db_root": "out/db"
            }"#,
        )
        .unwrap();

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.sort_by, SortBy::SubmittedDate);
        assert_eq!(resolved.sort_order, SortOrder::Ascending);
        assert_eq!(resolved.page_size, 50);
        assert_eq!(resolved.max_results, Some(200));
        assert_eq!(resolved.db_root, Utf8PathBuf::from("out/db"));
    }

    #[test]
    fn resolve_config_rejects_zero_page_size() {
        let config: Config = serde_json::from_str(r#"{"page_size": 0}"#).unwrap();
        assert_matches!(
            ConfigLoader::resolve_config(config).unwrap_err(),
            HarvestError::ConfigParse(_)
        );
    }

    #[test]
    fn resolve_config_rejects_keywordless_subject() {
        let config: Config = serde_json::from_str(
            r#"{"subjects": {"Empty": {"keywords": [], "categories": ["cs.LG"]}}}"#,
        )
        .unwrap();
        assert_matches!(
            ConfigLoader::resolve_config(config).unwrap_err(),
            HarvestError::ConfigParse(_)
        );
    }
}
