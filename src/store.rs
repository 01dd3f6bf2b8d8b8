use std::collections::BTreeSet;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{Paper, PaperId};
use crate::error::HarvestError;

/// Durable layout, one directory per subject:
///
/// ```text
/// <root>/<subject>/seen.json    all identifiers ever ingested (JSON array)
/// <root>/<subject>/<year>.jsonl structured records, one paper per line
/// <root>/<subject>/<year>.md    rendered digest, regenerated on every write
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn subject_dir(&self, subject: &str) -> Utf8PathBuf {
        self.root.join(subject)
    }

    pub fn seen_path(&self, subject: &str) -> Utf8PathBuf {
        self.subject_dir(subject).join("seen.json")
    }

    pub fn records_path(&self, subject: &str, year: i32) -> Utf8PathBuf {
        self.subject_dir(subject).join(format!("{year}.jsonl"))
    }

    pub fn document_path(&self, subject: &str, year: i32) -> Utf8PathBuf {
        self.subject_dir(subject).join(format!("{year}.md"))
    }

    /// Loads the seen-id set. An absent file is a legitimate first run and
    /// yields the empty set; malformed content is a hard error, never
    /// silently treated as empty.
    pub fn load_seen(&self, subject: &str) -> Result<BTreeSet<PaperId>, HarvestError> {
        let path = self.seen_path(subject);
        let content = match fs::read_to_string(path.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(err) => return Err(HarvestError::Filesystem(err.to_string())),
        };
        let ids: Vec<PaperId> =
            serde_json::from_str(&content).map_err(|err| HarvestError::CorruptSeenSet {
                subject: subject.to_string(),
                message: err.to_string(),
            })?;
        Ok(ids.into_iter().collect())
    }

    /// Overwrites the seen-id set. BTreeSet iteration keeps the array
    /// sorted, so repeated saves of the same set are byte-identical.
    pub fn save_seen(&self, subject: &str, seen: &BTreeSet<PaperId>) -> Result<(), HarvestError> {
        let ids: Vec<&PaperId> = seen.iter().collect();
        let content =
            serde_json::to_vec(&ids).map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        write_bytes_atomic(&self.seen_path(subject), &content)
    }

    /// Loads the structured records for one (subject, year) partition.
    /// `None` means the records file does not exist yet; a line that fails
    /// to parse is skipped with a warning.
    pub fn load_records(
        &self,
        subject: &str,
        year: i32,
    ) -> Result<Option<Vec<Paper>>, HarvestError> {
        let path = self.records_path(subject, year);
        let content = match fs::read_to_string(path.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(HarvestError::Filesystem(err.to_string())),
        };
        let mut papers = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Paper>(line) {
                Ok(paper) => papers.push(paper),
                Err(err) => {
                    tracing::warn!(subject, year, %err, "skipping malformed records line");
                }
            }
        }
        Ok(Some(papers))
    }

    pub fn save_records(
        &self,
        subject: &str,
        year: i32,
        papers: &[Paper],
    ) -> Result<(), HarvestError> {
        let mut content = String::new();
        for paper in papers {
            let line = serde_json::to_string(paper)
                .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
            content.push_str(&line);
            content.push('\n');
        }
        write_bytes_atomic(&self.records_path(subject, year), content.as_bytes())
    }

    pub fn load_document(
        &self,
        subject: &str,
        year: i32,
    ) -> Result<Option<String>, HarvestError> {
        let path = self.document_path(subject, year);
        match fs::read_to_string(path.as_std_path()) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(HarvestError::Filesystem(err.to_string())),
        }
    }

    pub fn save_document(
        &self,
        subject: &str,
        year: i32,
        document: &str,
    ) -> Result<(), HarvestError> {
        write_bytes_atomic(&self.document_path(subject, year), document.as_bytes())
    }

    /// Subjects with a directory under the root, sorted by name.
    pub fn subjects_present(&self) -> Result<Vec<String>, HarvestError> {
        if !self.root.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut subjects = Vec::new();
        let entries = fs::read_dir(self.root.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| HarvestError::Filesystem(err.to_string()))?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    subjects.push(name.to_string());
                }
            }
        }
        subjects.sort();
        Ok(subjects)
    }

    /// Years with a records or document file for the subject, ascending.
    pub fn years_present(&self, subject: &str) -> Result<Vec<i32>, HarvestError> {
        let dir = self.subject_dir(subject);
        if !dir.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut years = BTreeSet::new();
        let entries = fs::read_dir(dir.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| HarvestError::Filesystem(err.to_string()))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(stem) = name.strip_suffix(".jsonl").or_else(|| name.strip_suffix(".md")) {
                if let Ok(year) = stem.parse::<i32>() {
                    years.insert(year);
                }
            }
        }
        Ok(years.into_iter().collect())
    }
}

/// Write-to-temp then rename, so a crash mid-write never leaves a
/// truncated store file behind.
pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), HarvestError> {
    let parent = path
        .parent()
        .ok_or_else(|| HarvestError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix(".arxiv-harvest")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    fs::write(temp.path(), content).map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
    Ok(())
}
