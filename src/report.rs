//! Output files, validation and run metadata.

use crate::error::{PublistError, Result};
use crate::pipeline::{Harvest, SkippedRecord};
use crate::publication::CanonicalPublication;
use crate::resolver::ResolutionMethod;
use crate::source::RawAuthor;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Exit status for a strict run that lost records
pub const EXIT_VALIDATION_FAILURE: u8 = 2;

/// Exit status for resolution, IO or empty-result failures
pub const EXIT_FAILURE: u8 = 1;

/// Skip reasons kept in the metadata file
pub const SKIP_SAMPLE_SIZE: usize = 20;

/// Raw vs. written comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    pub raw_count: usize,
    pub written_count: usize,
}

impl Validation {
    pub fn new(raw_count: usize, written_count: usize) -> Self {
        Self {
            raw_count,
            written_count,
        }
    }

    /// Records available from the source but absent from the output
    pub fn shortfall(&self) -> usize {
        self.raw_count.saturating_sub(self.written_count)
    }

    /// Warn about a shortfall and decide the outcome.
    pub fn check(&self, strict: bool) -> RunOutcome {
        if self.shortfall() == 0 {
            return RunOutcome::Complete;
        }

        warn!(
            raw = self.raw_count,
            written = self.written_count,
            missing = self.shortfall(),
            strict,
            "Fewer publications written than the source listed"
        );

        if strict {
            RunOutcome::ValidationFailed
        } else {
            RunOutcome::Partial
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every listed record was written
    Complete,
    /// Some records were lost; accepted outside strict mode
    Partial,
    /// Strict mode rejected a shortfall
    ValidationFailed,
}

impl RunOutcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Complete | Self::Partial => 0,
            Self::ValidationFailed => EXIT_VALIDATION_FAILURE,
        }
    }
}

/// Contents of the metadata file
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub method: ResolutionMethod,
    pub timestamp: String,
    pub author_id: String,
    pub author_name: String,
    pub raw_count: usize,
    pub written_count: usize,
    pub skipped_count: usize,
    pub selected_count: usize,
    pub enriched_count: usize,
    /// First skip reasons, bounded by [`SKIP_SAMPLE_SIZE`]
    pub skipped: Vec<SkippedRecord>,
}

impl RunMetadata {
    pub fn new(
        method: ResolutionMethod,
        author: &RawAuthor,
        harvest: &Harvest,
        written: &[CanonicalPublication],
    ) -> Self {
        Self {
            method,
            timestamp: chrono::Utc::now().to_rfc3339(),
            author_id: author.id.clone(),
            author_name: author.name.clone(),
            raw_count: harvest.raw_count,
            written_count: written.len(),
            skipped_count: harvest.skipped.len(),
            selected_count: written.iter().filter(|p| p.selected).count(),
            enriched_count: harvest.enriched_count,
            skipped: harvest.skipped.iter().take(SKIP_SAMPLE_SIZE).cloned().collect(),
        }
    }

    pub fn validation(&self) -> Validation {
        Validation::new(self.raw_count, self.written_count)
    }
}

/// Pretty-print `value` as JSON to `path`, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    std::fs::write(path, content)?;
    Ok(())
}

/// Write the publication list. An empty list never replaces an existing file.
pub fn write_publications(path: &Path, publications: &[CanonicalPublication]) -> Result<()> {
    if publications.is_empty() {
        return Err(PublistError::Validation(format!(
            "no publications were retrieved; leaving {} untouched",
            path.display()
        )));
    }
    write_json(path, publications)?;
    info!(path = %path.display(), count = publications.len(), "Wrote publications");
    Ok(())
}

pub fn write_metadata(path: &Path, metadata: &RunMetadata) -> Result<()> {
    write_json(path, metadata)?;
    info!(path = %path.display(), "Wrote run metadata");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn skipped(n: usize) -> Vec<SkippedRecord> {
        (0..n)
            .map(|index| SkippedRecord {
                index,
                title: String::new(),
                reason: "no title".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_validation_outcomes() {
        assert_eq!(Validation::new(3, 3).check(true), RunOutcome::Complete);
        assert_eq!(Validation::new(3, 1).check(false), RunOutcome::Partial);
        assert_eq!(Validation::new(3, 1).check(true), RunOutcome::ValidationFailed);

        assert_eq!(RunOutcome::Partial.exit_code(), 0);
        assert_eq!(RunOutcome::ValidationFailed.exit_code(), EXIT_VALIDATION_FAILURE);
        assert_ne!(EXIT_VALIDATION_FAILURE, EXIT_FAILURE);
    }

    #[test]
    fn test_metadata_samples_skips() {
        let author = RawAuthor {
            id: "ID".to_string(),
            name: "Anna Nowak".to_string(),
            ..Default::default()
        };
        let harvest = Harvest {
            skipped: skipped(25),
            raw_count: 30,
            ..Default::default()
        };

        let meta = RunMetadata::new(ResolutionMethod::NameSearch, &author, &harvest, &[]);
        assert_eq!(meta.skipped_count, 25);
        assert_eq!(meta.skipped.len(), SKIP_SAMPLE_SIZE);
        assert_eq!(meta.validation().shortfall(), 30);

        let json = serde_json::to_value(&meta).expect("serialize");
        assert_eq!(json["method"], "name_search");
        assert_eq!(json["raw_count"], 30);
    }

    #[test]
    fn test_empty_list_keeps_existing_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("publications.json");
        std::fs::write(&path, "[]")?;

        assert!(write_publications(&path, &[]).is_err());
        assert_eq!(std::fs::read_to_string(&path)?, "[]");
        Ok(())
    }
}
