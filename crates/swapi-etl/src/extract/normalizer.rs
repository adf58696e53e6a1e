//! Applies the reference resolver to every field of every record

use tracing::info;

use super::resolver::Resolver;
use super::Record;

/// Replace every cross-reference in `records` with its display value.
///
/// Record order and field order are preserved; nothing is deduplicated.
pub async fn normalize_records(resolver: &mut Resolver<'_>, records: Vec<Record>) -> Vec<Record> {
    let mut normalized = Vec::with_capacity(records.len());

    for record in records {
        let mut resolved = Record::new();
        for (field, value) in record {
            let value = resolver.resolve(value).await;
            resolved.insert(field, value);
        }
        normalized.push(resolved);
    }

    info!(
        records = normalized.len(),
        references = resolver.cache().len(),
        unresolved = resolver.cache().unresolved_count(),
        fetches = resolver.fetches(),
        "Normalized source records"
    );

    normalized
}
