//! Raw record normalization.
//!
//! Turns one scraped [`RawPublication`] into a [`CanonicalPublication`], or a
//! [`SkipReason`] when the record cannot be used.

use crate::publication::CanonicalPublication;
use crate::source::RawPublication;
use std::fmt;

/// DOI resolver prefix
pub const DOI_RESOLVER: &str = "https://doi.org/";

/// Substrings marking institutional repository (CRIS) entries rather than
/// real venues. Matched against the lowercased candidate.
pub const VENUE_BLOCKLIST: &[&str] = &[
    "cris record",
    "cris pk",
    "pk record",
    "repository",
    "research portal",
    "research output",
];

/// Venue candidate fields, in priority order
const VENUE_FIELDS: &[&str] = &["journal", "venue", "conference"];

/// Why a raw record did not make it into the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Title missing or blank
    NoTitle,
    /// Detail retrieval failed
    FetchFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTitle => write!(f, "no title"),
            Self::FetchFailed(e) => write!(f, "fetch failed: {}", e),
        }
    }
}

/// Per-record outcome
pub type ItemResult = std::result::Result<CanonicalPublication, SkipReason>;

/// Split an author string on commas and the conjunction " and ".
///
/// ```
/// assert_eq!(publist::normalize::norm_authors("A, B and C"), vec!["A", "B", "C"]);
/// ```
pub fn norm_authors(raw: &str) -> Vec<String> {
    raw.replace(" and ", ",")
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

/// Year as an integer; 0 unless the trimmed string is all ASCII digits.
/// Other decimal scripts (fullwidth "２０２１", Arabic-Indic) also give 0.
pub fn parse_year(raw: &str) -> i32 {
    let raw = raw.trim();
    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        raw.parse().unwrap_or(0)
    } else {
        0
    }
}

/// First candidate that is not a repository marker, with whitespace runs
/// collapsed. Empty string if none qualifies.
pub fn clean_venue<'a, I>(candidates: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .find(|c| {
            let lower = c.to_lowercase();
            !VENUE_BLOCKLIST.iter().any(|marker| lower.contains(marker))
        })
        .map(|c| c.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

/// Resolver URL for a DOI.
///
/// `https://doi.org/...` is returned unchanged and bare `10.xxxx/...` gets
/// the resolver prefix. `doi:` and `dx.doi.org` spellings are rewritten to the
/// resolver form. Anything else is not a DOI.
pub fn normalize_doi(raw: &str) -> Option<String> {
    let doi = raw.trim();
    if doi.starts_with(DOI_RESOLVER) {
        return Some(doi.to_string());
    }

    let bare = ["http://doi.org/", "https://dx.doi.org/", "http://dx.doi.org/", "doi:"]
        .iter()
        .find_map(|prefix| {
            doi.get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(prefix))
                .map(|_| doi[prefix.len()..].trim())
        })
        .unwrap_or(doi);

    bare.starts_with("10.")
        .then(|| format!("{}{}", DOI_RESOLVER, bare))
}

/// Best link for a record: DOI, then eprint, publisher page, and finally
/// Scholar's citation page.
pub fn select_url(raw: &RawPublication, doi: Option<&str>) -> String {
    doi.and_then(normalize_doi)
        .or_else(|| {
            [&raw.eprint_url, &raw.pub_url, &raw.author_pub_url]
                .into_iter()
                .flatten()
                .map(|u| u.trim())
                .find(|u| !u.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_default()
}

/// Normalize one raw record. `selected` is always false here.
pub fn normalize_record(raw: &RawPublication) -> ItemResult {
    let title = raw.field("title").map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(SkipReason::NoTitle);
    }

    let doi = raw.field("doi").map(|d| d.trim().to_string());
    let url = select_url(raw, doi.as_deref());

    Ok(CanonicalPublication {
        title: title.to_string(),
        authors: raw.field("author").map(norm_authors).unwrap_or_default(),
        journal: clean_venue(VENUE_FIELDS.iter().filter_map(|f| raw.field(f))),
        year: raw.field("pub_year").map(parse_year).unwrap_or(0),
        abstract_text: raw.field("abstract").map(|a| a.trim().to_string()).unwrap_or_default(),
        url,
        doi,
        selected: false,
    })
}
