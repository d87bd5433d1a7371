//! The narrow interface to the external publication source.
//!
//! Everything upstream of normalization is opaque scraped data. The pipeline
//! only talks to a [`PublicationSource`], so it runs the same against live
//! Google Scholar ([`crate::scholar::ScholarSource`]) and a saved
//! [`SnapshotSource`].

use crate::error::{PublistError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// One publication as scraped. No field is guaranteed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPublication {
    /// Bibliographic fields (`title`, `author`, `pub_year`, `journal`,
    /// `venue`, `conference`, `abstract`, `doi`, ...)
    #[serde(default)]
    pub bib: BTreeMap<String, String>,
    /// Direct full-text link
    #[serde(default)]
    pub eprint_url: Option<String>,
    /// Publisher landing page
    #[serde(default)]
    pub pub_url: Option<String>,
    /// Scholar's own citation page for this publication
    #[serde(default)]
    pub author_pub_url: Option<String>,
    /// Source-specific key used to fetch full detail
    #[serde(default)]
    pub detail_ref: Option<String>,
    /// Whether full detail has already been fetched
    #[serde(default)]
    pub filled: bool,
}

impl RawPublication {
    /// Bibliographic field, treating blank values as absent.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.bib
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Set a bibliographic field; blank values are ignored.
    pub fn set_field(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.bib.insert(key.to_string(), value);
        }
    }
}

/// A researcher profile with its publication listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAuthor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub affiliation: String,
    /// Domain of the verified contact address, e.g. "uw.edu.pl"
    #[serde(default)]
    pub email_domain: String,
    #[serde(default)]
    pub publications: Vec<RawPublication>,
}

/// A search hit when looking an author up by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorCandidate {
    pub id: String,
    pub name: String,
    pub affiliation: String,
    pub email_domain: String,
}

impl From<&RawAuthor> for AuthorCandidate {
    fn from(author: &RawAuthor) -> Self {
        Self {
            id: author.id.clone(),
            name: author.name.clone(),
            affiliation: author.affiliation.clone(),
            email_domain: author.email_domain.clone(),
        }
    }
}

/// Operations the pipeline needs from a scraping backend.
#[allow(async_fn_in_trait)]
pub trait PublicationSource {
    /// Load an author profile with its full publication listing.
    async fn fetch_author(&self, author_id: &str) -> Result<RawAuthor>;

    /// Search author profiles by display name.
    async fn search_authors(&self, name: &str) -> Result<Vec<AuthorCandidate>>;

    /// Fetch full detail for one listed publication.
    async fn fetch_detail(&self, publication: &RawPublication) -> Result<RawPublication>;
}

/// Replays a saved author profile.
pub struct SnapshotSource {
    author: RawAuthor,
}

impl SnapshotSource {
    pub fn new(author: RawAuthor) -> Self {
        Self { author }
    }

    /// Load a snapshot written by [`save_snapshot`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let author: RawAuthor = serde_json::from_str(&content)?;
        info!(
            path = %path.display(),
            author = %author.id,
            publications = author.publications.len(),
            "Loaded author snapshot"
        );
        Ok(Self::new(author))
    }
}

impl PublicationSource for SnapshotSource {
    async fn fetch_author(&self, author_id: &str) -> Result<RawAuthor> {
        if self.author.id == author_id {
            Ok(self.author.clone())
        } else {
            Err(PublistError::AuthorNotFound(format!(
                "snapshot holds {}, not {}",
                self.author.id, author_id
            )))
        }
    }

    async fn search_authors(&self, _name: &str) -> Result<Vec<AuthorCandidate>> {
        Ok(vec![AuthorCandidate::from(&self.author)])
    }

    /// The snapshot holds no more than the listing, so records come back as
    /// stored and keep their `filled` flag.
    async fn fetch_detail(&self, publication: &RawPublication) -> Result<RawPublication> {
        Ok(publication.clone())
    }
}

/// Write a resolved author profile so later runs can replay it.
pub fn save_snapshot(author: &RawAuthor, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(author)?)?;
    info!(path = %path.display(), "Saved author snapshot");
    Ok(())
}
