//! Per-publication harvesting.
//!
//! Walks an author's listing in order, fetching full detail for the newest
//! entries, and normalizes each one. A failure on one record becomes a skip
//! entry; it never aborts the pass.

use crate::normalize::{normalize_record, ItemResult, SkipReason};
use crate::publication::CanonicalPublication;
use crate::source::{PublicationSource, RawAuthor, RawPublication};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Options for the harvesting pass
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Pause before every detail fetch after the first
    pub delay: Duration,
    /// Only the newest N listings get a detail fetch; `None` fetches all
    pub enrich_limit: Option<usize>,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            enrich_limit: None,
        }
    }
}

/// A record that did not make it into the output
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecord {
    /// Position in the source listing
    pub index: usize,
    /// Title as listed, possibly empty
    pub title: String,
    pub reason: String,
}

/// Result of a harvesting pass, before deduplication
#[derive(Debug, Default)]
pub struct Harvest {
    pub publications: Vec<CanonicalPublication>,
    pub skipped: Vec<SkippedRecord>,
    /// Size of the source listing
    pub raw_count: usize,
    /// Records whose detail fetch returned filled data; failed fetches and
    /// sources that only echo the listing do not count
    pub enriched_count: usize,
}

/// Listing indices that receive a detail fetch: the newest `limit` by the
/// listed year, ties kept in listing order.
pub fn enrichment_targets(listing: &[RawPublication], limit: Option<usize>) -> HashSet<usize> {
    let Some(limit) = limit else {
        return (0..listing.len()).collect();
    };

    let mut order: Vec<usize> = (0..listing.len()).collect();
    order.sort_by_key(|&i| {
        std::cmp::Reverse(
            listing[i]
                .field("pub_year")
                .map(crate::normalize::parse_year)
                .unwrap_or(0),
        )
    });
    order.into_iter().take(limit).collect()
}

/// Normalize every listed publication of `author`.
pub async fn harvest<S: PublicationSource>(
    source: &S,
    author: &RawAuthor,
    options: &HarvestOptions,
) -> Harvest {
    let listing = &author.publications;
    let targets = enrichment_targets(listing, options.enrich_limit);

    info!(
        author = %author.id,
        listed = listing.len(),
        enrich = targets.len(),
        "Harvesting publications"
    );

    let mut harvest = Harvest {
        raw_count: listing.len(),
        ..Default::default()
    };
    let mut fetched = 0usize;

    for (index, entry) in listing.iter().enumerate() {
        let outcome = if targets.contains(&index) && !entry.filled {
            if fetched > 0 && !options.delay.is_zero() {
                tokio::time::sleep(options.delay).await;
            }
            fetched += 1;
            let (outcome, enriched) = enrich(source, entry).await;
            if enriched {
                harvest.enriched_count += 1;
            }
            outcome
        } else {
            normalize_record(entry)
        };

        match outcome {
            Ok(publication) => {
                debug!(index, title = %publication.title, year = publication.year, "Kept publication");
                harvest.publications.push(publication);
            }
            Err(reason) => {
                let title = entry.field("title").unwrap_or_default().to_string();
                warn!(index, title = %title, reason = %reason, "Skipped publication");
                harvest.skipped.push(SkippedRecord {
                    index,
                    title,
                    reason: reason.to_string(),
                });
            }
        }
    }

    info!(
        kept = harvest.publications.len(),
        skipped = harvest.skipped.len(),
        enriched = harvest.enriched_count,
        "Harvest complete"
    );
    harvest
}

/// Fetch detail and normalize it. The flag is set only when the source
/// returned a filled record.
async fn enrich<S: PublicationSource>(source: &S, entry: &RawPublication) -> (ItemResult, bool) {
    match source.fetch_detail(entry).await {
        Ok(detail) => (normalize_record(&detail), detail.filled),
        Err(e) => (Err(SkipReason::FetchFailed(e.to_string())), false),
    }
}
