//! Silver layer field cleaning
//!
//! Every step is total: unparseable input becomes `"unknown"` or a null
//! numeric value, never an error.
//!
//! 1. Text fields are coerced to trimmed strings, then the sentinel tokens
//!    `N/A`, `n/a`, `None` and the empty string become `unknown` in *every*
//!    top-level field of the record, not only the text fields.
//! 2. Numeric-like fields get a `<field>_num` sibling.
//! 3. `gravity` becomes `gravity_list`, `gravity_clean` and `gravity_numeric`.
//! 4. `terrain` becomes `terrain_list`.

use regex::Regex;
use serde_json::{Number, Value};
use tracing::{debug, info};

use super::keys::assign_keys;
use super::{
    numeric_column, GRAVITY_CLEAN, GRAVITY_FIELD, GRAVITY_LIST, GRAVITY_NUMERIC, IDENTITY_FIELD,
    KEY_COLUMN, NUMERIC_FIELDS, SENTINELS, TERRAIN_FIELD, TERRAIN_LIST, TEXT_FIELDS, UNKNOWN,
};
use crate::error::Result;
use crate::extract::Record;

/// Compiled patterns for composite field parsing
#[derive(Debug, Clone)]
pub struct FieldCleaner {
    /// Comma plus optional trailing whitespace
    list_separator: Regex,
    /// A whole token that is an integer or decimal
    bare_number: Regex,
    /// First integer or decimal inside a string
    embedded_number: Regex,
}

impl FieldCleaner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            list_separator: Regex::new(r",\s*")?,
            bare_number: Regex::new(r"^\d+(\.\d+)?$")?,
            embedded_number: Regex::new(r"\d+(\.\d+)?")?,
        })
    }

    /// Run all cleaning steps over `records`.
    pub fn clean_records(&self, mut records: Vec<Record>) -> Vec<Record> {
        self.standardize_text(&mut records);

        for record in &mut records {
            self.derive_numeric(record);
            self.parse_gravity(record);
            self.parse_terrain(record);
        }

        records
    }

    /// Step 1: trim text fields and replace sentinel tokens record-wide.
    pub fn standardize_text(&self, records: &mut [Record]) {
        let mut replaced_outside_text = 0usize;

        for record in records.iter_mut() {
            for field in TEXT_FIELDS {
                let text = coerce_text(record.get(*field));
                record.insert((*field).to_string(), Value::String(text.trim().to_string()));
            }

            for (field, value) in record.iter_mut() {
                let is_sentinel = matches!(value, Value::String(s) if SENTINELS.contains(&s.as_str()));
                if is_sentinel {
                    if !TEXT_FIELDS.contains(&field.as_str()) {
                        replaced_outside_text += 1;
                    }
                    *value = Value::String(UNKNOWN.to_string());
                }
            }
        }

        if replaced_outside_text > 0 {
            debug!(
                count = replaced_outside_text,
                "Replaced sentinel tokens outside the text fields"
            );
        }
    }

    /// Step 2: add `<field>_num` for every numeric-like field.
    pub fn derive_numeric(&self, record: &mut Record) {
        for field in NUMERIC_FIELDS {
            let parsed = match record.get(*field) {
                Some(Value::String(text)) if text != UNKNOWN => parse_number(text),
                Some(Value::Number(n)) => n.as_f64(),
                _ => None,
            };
            record.insert(numeric_column(field), number_or_null(parsed));
        }
    }

    /// Step 3: gravity list, representative value and its numeric part.
    pub fn parse_gravity(&self, record: &mut Record) {
        let raw = coerce_text(record.get(GRAVITY_FIELD));
        let list: Vec<String> = self
            .split_list(&raw)
            .into_iter()
            .map(|token| self.normalize_gravity_token(&token))
            .collect();

        let clean = list.first().cloned().unwrap_or_else(|| UNKNOWN.to_string());
        let numeric = self.extract_numeric(&clean);

        record.insert(GRAVITY_LIST.to_string(), string_list(list));
        record.insert(GRAVITY_CLEAN.to_string(), Value::String(clean));
        record.insert(GRAVITY_NUMERIC.to_string(), number_or_null(numeric));
    }

    /// Step 4: terrain list.
    pub fn parse_terrain(&self, record: &mut Record) {
        let raw = coerce_text(record.get(TERRAIN_FIELD));
        let list = self.split_list(&raw);
        record.insert(TERRAIN_LIST.to_string(), string_list(list));
    }

    /// Split on a comma followed by optional whitespace.
    pub fn split_list(&self, text: &str) -> Vec<String> {
        self.list_separator.split(text).map(str::to_string).collect()
    }

    /// `"1"` -> `"1 standard"`; `"unknown"` and anything non-numeric unchanged.
    pub fn normalize_gravity_token(&self, token: &str) -> String {
        if token != UNKNOWN && self.bare_number.is_match(token) {
            format!("{} standard", token)
        } else {
            token.to_string()
        }
    }

    /// First integer or decimal substring of `text`, parsed.
    pub fn extract_numeric(&self, text: &str) -> Option<f64> {
        self.embedded_number
            .find(text)
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }
}

/// Clean the bronze records and attach surrogate keys.
pub fn build_silver(records: Vec<Record>) -> Result<Vec<Record>> {
    let cleaner = FieldCleaner::new()?;
    let mut silver = cleaner.clean_records(records);
    let distinct = assign_keys(&mut silver, IDENTITY_FIELD, KEY_COLUMN);

    info!(
        records = silver.len(),
        distinct_planets = distinct,
        "Built silver layer"
    );

    Ok(silver)
}

/// String form used for text standardization.
///
/// Missing and null values become `"None"` so that they fall into the
/// sentinel replacement.
pub fn coerce_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Lenient float parse: trimmed, finite, otherwise `None`.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

fn number_or_null(value: Option<f64>) -> Value {
    value
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn string_list(items: Vec<String>) -> Value {
    Value::Array(items.into_iter().map(Value::String).collect())
}
