//! Version Resolver
//!
//! The current version of a node is one past the number of stored history
//! entries; each history entry becomes a `<uri>:<n>` reference.
//!
//! History entries numbered `max + 1` (where `max` is the highest stored
//! number, or 1 when there is no history) are dropped from the list. With a
//! well-formed history no entry can satisfy that, so the filter only matters
//! for data that already contains the next version number.

use crate::models::{RegistryNode, VersionHistoryEntry, VersionInformation};
use crate::services::context::ResolutionContext;
use crate::services::error::ResolveError;

/// Current version and prior-version list for `uri` given its history
pub fn compute_versions(
    uri: &str,
    history: &[VersionHistoryEntry],
) -> (VersionInformation, Vec<VersionInformation>) {
    let max_version = history
        .iter()
        .map(|entry| entry.version_number)
        .max()
        .unwrap_or(1);
    let current = history.len() as i32 + 1;

    let mut numbers: Vec<i32> = history
        .iter()
        .map(|entry| entry.version_number)
        .filter(|&n| n != max_version + 1)
        .collect();
    numbers.sort_unstable();

    let previous = numbers
        .into_iter()
        .map(|n| VersionInformation::new(n, uri))
        .collect();

    (VersionInformation::new(current, uri), previous)
}

/// Load the history of `node` and compute its versions
pub async fn resolve_versions(
    ctx: &ResolutionContext<'_>,
    node: &RegistryNode,
    uri: &str,
) -> Result<(VersionInformation, Vec<VersionInformation>), ResolveError> {
    let history = ctx.store().get_history(&node.id).await?;
    Ok(compute_versions(uri, &history))
}

#[cfg(test)]
#[path = "version_resolver_test.rs"]
mod version_resolver_test;
