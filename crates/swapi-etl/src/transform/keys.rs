//! Surrogate key assignment

use serde_json::Value;
use std::collections::HashMap;

use crate::extract::Record;

/// Give every record the key of its identity value.
///
/// Distinct values of `identity_field` are numbered `1..=N` in first-seen
/// order; records sharing a value share a key. A missing or null identity
/// counts as one value of its own. Returns `N`.
pub fn assign_keys(records: &mut [Record], identity_field: &str, key_column: &str) -> usize {
    let mut keys: HashMap<String, i64> = HashMap::new();

    for record in records.iter_mut() {
        let identity = record
            .get(identity_field)
            .unwrap_or(&Value::Null)
            .to_string();
        let next = keys.len() as i64 + 1;
        let key = *keys.entry(identity).or_insert(next);
        record.insert(key_column.to_string(), Value::from(key));
    }

    keys.len()
}
