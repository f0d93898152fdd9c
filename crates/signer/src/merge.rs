//! Combines signature lists without duplicates.

use std::collections::HashSet;

use kas_primitives::signature::SignatureData;

/// Merge newly obtained signatures into an existing list.
///
/// The result holds `incoming` in order, followed by the entries of `existing` that are not
/// already present. Duplicates are detected by value and placeholder signatures are dropped from
/// both sides. Merging the same `incoming` twice yields the same list.
pub fn merge_signatures(
    existing: &[SignatureData],
    incoming: &[SignatureData],
) -> Vec<SignatureData> {
    let mut seen = HashSet::with_capacity(existing.len() + incoming.len());
    let mut merged = Vec::with_capacity(existing.len() + incoming.len());

    for sig in incoming.iter().chain(existing) {
        if sig.is_empty() || !seen.insert(*sig) {
            continue;
        }

        merged.push(*sig);
    }

    merged
}
