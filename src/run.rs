//! One full update: resolve, harvest, assemble, write, validate.

use crate::config::RunConfig;
use crate::error::Result;
use crate::pipeline::{harvest, HarvestOptions};
use crate::publication::assemble;
use crate::report::{write_metadata, write_publications, RunMetadata, RunOutcome};
use crate::resolver::{AuthorQuery, AuthorResolver};
use crate::retry::RetryPolicy;
use crate::source::PublicationSource;
use tracing::{info, warn};

/// What an update produced
#[derive(Debug)]
pub struct UpdateSummary {
    pub metadata: RunMetadata,
    pub outcome: RunOutcome,
}

/// Run the whole update against `source`.
///
/// Resolution failures and write failures are errors. A shortfall of
/// written records is reported through [`RunOutcome`]. Metadata is written
/// before the output so it survives an empty result; an empty list is an
/// error outside strict mode and a validation failure inside it.
pub async fn update<S: PublicationSource>(
    source: &S,
    query: &AuthorQuery,
    retry: RetryPolicy,
    options: &HarvestOptions,
    config: &RunConfig,
) -> Result<UpdateSummary> {
    let resolution = AuthorResolver::new(source, retry).resolve(query).await?;
    let author = &resolution.author;

    let harvested = harvest(source, author, options).await;
    let publications = assemble(harvested.publications.clone(), config.selected);
    let metadata = RunMetadata::new(resolution.method, author, &harvested, &publications);

    if let Some(path) = &config.metadata {
        write_metadata(path, &metadata)?;
    }

    let outcome = metadata.validation().check(config.strict);
    if outcome == RunOutcome::ValidationFailed && publications.is_empty() {
        warn!(
            path = %config.output.display(),
            "Nothing survived; leaving existing output untouched"
        );
    } else {
        write_publications(&config.output, &publications)?;
    }
    info!(
        method = %resolution.method,
        raw = metadata.raw_count,
        written = metadata.written_count,
        skipped = metadata.skipped_count,
        selected = metadata.selected_count,
        outcome = ?outcome,
        "Update finished"
    );

    Ok(UpdateSummary { metadata, outcome })
}
