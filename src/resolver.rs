//! Author resolution: direct ID lookup with a name/affiliation fallback.

use crate::error::{PublistError, Result};
use crate::retry::RetryPolicy;
use crate::source::{AuthorCandidate, PublicationSource, RawAuthor};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// What the operator told us about the author
#[derive(Debug, Clone, Default)]
pub struct AuthorQuery {
    /// Scholar author identifier (the `user=` parameter)
    pub id: Option<String>,
    /// Display name used for the fallback search
    pub name: Option<String>,
    /// Pattern matched against affiliation or e-mail domain
    pub affiliation: Option<String>,
}

/// How the author was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    Id,
    NameSearch,
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => write!(f, "id"),
            Self::NameSearch => write!(f, "name_search"),
        }
    }
}

/// A resolved author profile
#[derive(Debug, Clone)]
pub struct Resolution {
    pub author: RawAuthor,
    pub method: ResolutionMethod,
}

/// Case-insensitive matcher for affiliation or contact domain.
#[derive(Debug, Clone)]
pub struct AffiliationMatcher {
    pattern: Option<Regex>,
}

impl AffiliationMatcher {
    /// Build a matcher; `None` or a blank pattern accepts every candidate.
    pub fn new(pattern: Option<&str>) -> Result<Self> {
        let pattern = pattern
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .transpose()?;
        Ok(Self { pattern })
    }

    pub fn matches(&self, candidate: &AuthorCandidate) -> bool {
        match &self.pattern {
            None => true,
            Some(re) => re.is_match(&candidate.affiliation) || re.is_match(&candidate.email_domain),
        }
    }
}

/// Finds an author profile through a [`PublicationSource`].
pub struct AuthorResolver<'a, S> {
    source: &'a S,
    policy: RetryPolicy,
}

impl<'a, S: PublicationSource> AuthorResolver<'a, S> {
    pub fn new(source: &'a S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Resolve by ID first; on any failure fall back to a name search when
    /// a name was given.
    pub async fn resolve(&self, query: &AuthorQuery) -> Result<Resolution> {
        let matcher = AffiliationMatcher::new(query.affiliation.as_deref())?;

        let id_error = match query.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => match self.lookup(id).await {
                Ok(author) => {
                    info!(author_id = id, name = %author.name, "Resolved author by ID");
                    return Ok(Resolution {
                        author,
                        method: ResolutionMethod::Id,
                    });
                }
                Err(e) => {
                    warn!(author_id = id, error = %e, "ID lookup failed");
                    Some(e)
                }
            },
            None => None,
        };

        let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
            return Err(id_error.unwrap_or_else(|| {
                PublistError::Config("either an author ID or a name is required".to_string())
            }));
        };

        info!(name, "Falling back to author search by name");
        let author = self.search(name, &matcher).await?;
        Ok(Resolution {
            author,
            method: ResolutionMethod::NameSearch,
        })
    }

    /// Search by name and return candidates the matcher accepts.
    pub async fn candidates(&self, name: &str, matcher: &AffiliationMatcher) -> Result<Vec<AuthorCandidate>> {
        let found = self.source.search_authors(name).await?;
        info!(name, found = found.len(), "Author search complete");
        Ok(found.into_iter().filter(|c| matcher.matches(c)).collect())
    }

    async fn search(&self, name: &str, matcher: &AffiliationMatcher) -> Result<RawAuthor> {
        let candidate = self
            .candidates(name, matcher)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                PublistError::AuthorNotFound(format!("no profile for '{}' matches the affiliation", name))
            })?;

        info!(
            author_id = %candidate.id,
            affiliation = %candidate.affiliation,
            "Matched author candidate"
        );
        self.lookup(&candidate.id).await
    }

    async fn lookup(&self, id: &str) -> Result<RawAuthor> {
        let source = self.source;
        self.policy
            .run("author lookup", move || source.fetch_author(id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fixtures::{publication, ScriptedSource};

    fn author(id: &str, affiliation: &str, domain: &str) -> RawAuthor {
        RawAuthor {
            id: id.to_string(),
            name: "Anna Nowak".to_string(),
            affiliation: affiliation.to_string(),
            email_domain: domain.to_string(),
            publications: vec![publication("Sparse solvers", "2019")],
        }
    }

    #[tokio::test]
    async fn test_resolve_by_id_after_retries() {
        let source = ScriptedSource::with_author(author("ID1", "Warsaw University", "uw.edu.pl"));
        source.author_failures.set(2);
        let resolver = AuthorResolver::new(&source, RetryPolicy::immediate(5));

        let query = AuthorQuery {
            id: Some("ID1".to_string()),
            ..Default::default()
        };
        let resolution = resolver.resolve(&query).await.expect("resolved");
        assert_eq!(resolution.method, ResolutionMethod::Id);
        assert_eq!(resolution.author.id, "ID1");
        assert_eq!(source.author_calls.get(), 3);
    }

    #[tokio::test]
    async fn test_falls_back_to_name_search() {
        let mut source = ScriptedSource::with_author(author("RIGHT", "Physics, University of Warsaw", "fuw.edu.pl"));
        source.candidates.insert(
            0,
            AuthorCandidate {
                id: "WRONG".to_string(),
                name: "Anna Nowak".to_string(),
                affiliation: "Jagiellonian University".to_string(),
                email_domain: "uj.edu.pl".to_string(),
            },
        );
        let resolver = AuthorResolver::new(&source, RetryPolicy::immediate(2));

        let query = AuthorQuery {
            id: Some("MISSING".to_string()),
            name: Some("Anna Nowak".to_string()),
            affiliation: Some("warsaw|fuw".to_string()),
        };
        let resolution = resolver.resolve(&query).await.expect("resolved");
        assert_eq!(resolution.method, ResolutionMethod::NameSearch);
        assert_eq!(resolution.author.id, "RIGHT");
    }

    #[tokio::test]
    async fn test_email_domain_matches() {
        let source = ScriptedSource::with_author(author("ID2", "", "FUW.edu.pl"));
        let resolver = AuthorResolver::new(&source, RetryPolicy::immediate(1));

        let query = AuthorQuery {
            name: Some("Anna Nowak".to_string()),
            affiliation: Some(r"fuw\.edu\.pl".to_string()),
            ..Default::default()
        };
        let resolution = resolver.resolve(&query).await.expect("resolved");
        assert_eq!(resolution.author.id, "ID2");
    }

    #[tokio::test]
    async fn test_fails_without_fallback() {
        let source = ScriptedSource::default();
        let resolver = AuthorResolver::new(&source, RetryPolicy::immediate(3));

        let query = AuthorQuery {
            id: Some("NOPE".to_string()),
            ..Default::default()
        };
        let err = resolver.resolve(&query).await.expect_err("must fail");
        assert!(matches!(err, PublistError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(source.author_calls.get(), 3);
    }

    #[tokio::test]
    async fn test_fails_when_no_candidate_matches() {
        let source = ScriptedSource::with_author(author("ID3", "MIT", "mit.edu"));
        let resolver = AuthorResolver::new(&source, RetryPolicy::immediate(1));

        let query = AuthorQuery {
            name: Some("Anna Nowak".to_string()),
            affiliation: Some("warsaw".to_string()),
            ..Default::default()
        };
        let err = resolver.resolve(&query).await.expect_err("must fail");
        assert!(matches!(err, PublistError::AuthorNotFound(_)));
    }

    #[tokio::test]
    async fn test_requires_id_or_name() {
        let source = ScriptedSource::default();
        let resolver = AuthorResolver::new(&source, RetryPolicy::immediate(1));
        let err = resolver.resolve(&AuthorQuery::default()).await.expect_err("must fail");
        assert!(matches!(err, PublistError::Config(_)));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(AffiliationMatcher::new(Some("(unclosed")).is_err());
        assert!(AffiliationMatcher::new(Some("  ")).is_ok());
    }
}
