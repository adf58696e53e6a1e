//! Silver and gold layers
//!
//! - [`cleaner`]: text standardization, numeric columns, gravity/terrain parsing
//! - [`keys`]: dense surrogate keys per planet name
//! - [`gold`]: the `planets` fact table and its link tables

pub mod cleaner;
pub mod gold;
pub mod keys;

use crate::table::ColumnKind;

/// Field whose distinct values define one planet
pub const IDENTITY_FIELD: &str = "name";

/// Surrogate key column added to every cleaned record
pub const KEY_COLUMN: &str = "planet_id";

/// Fields coerced to trimmed text before sentinel replacement
pub const TEXT_FIELDS: &[&str] = &[
    "rotation_period",
    "orbital_period",
    "diameter",
    "climate",
    "gravity",
    "terrain",
    "surface_water",
    "population",
];

/// Fields that get a parsed `<field>_num` sibling
pub const NUMERIC_FIELDS: &[&str] = &[
    "rotation_period",
    "orbital_period",
    "diameter",
    "surface_water",
    "population",
];

/// Tokens replaced by [`UNKNOWN`] anywhere in a record
pub const SENTINELS: &[&str] = &["N/A", "n/a", "None", ""];

/// Placeholder for missing text
pub const UNKNOWN: &str = "unknown";

pub const GRAVITY_FIELD: &str = "gravity";
pub const GRAVITY_LIST: &str = "gravity_list";
pub const GRAVITY_CLEAN: &str = "gravity_clean";
pub const GRAVITY_NUMERIC: &str = "gravity_numeric";
pub const TERRAIN_FIELD: &str = "terrain";
pub const TERRAIN_LIST: &str = "terrain_list";

/// Name of the sibling column holding the parsed value of `field`
pub fn numeric_column(field: &str) -> String {
    format!("{}_num", field)
}

/// Gold fact table name
pub const FACT_TABLE: &str = "planets";

/// Projection of the fact table, in column order
pub const FACT_COLUMNS: &[(&str, ColumnKind)] = &[
    (KEY_COLUMN, ColumnKind::Int64),
    ("name", ColumnKind::Utf8),
    ("rotation_period", ColumnKind::Utf8),
    ("rotation_period_num", ColumnKind::Float64),
    ("orbital_period", ColumnKind::Utf8),
    ("orbital_period_num", ColumnKind::Float64),
    ("diameter", ColumnKind::Utf8),
    ("diameter_num", ColumnKind::Float64),
    ("climate", ColumnKind::Utf8),
    (GRAVITY_CLEAN, ColumnKind::Utf8),
    (GRAVITY_NUMERIC, ColumnKind::Float64),
    ("terrain", ColumnKind::Utf8),
    ("surface_water", ColumnKind::Utf8),
    ("surface_water_num", ColumnKind::Float64),
    ("population", ColumnKind::Utf8),
    ("population_num", ColumnKind::Float64),
    ("created", ColumnKind::Utf8),
    ("edited", ColumnKind::Utf8),
];

/// One multi-valued attribute exploded into its own table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTable {
    pub table: &'static str,
    pub source_field: &'static str,
    pub value_column: &'static str,
}

/// Link tables in output order
pub const LINK_TABLES: &[LinkTable] = &[
    LinkTable {
        table: "planet_residents",
        source_field: "residents",
        value_column: "resident_name",
    },
    LinkTable {
        table: "planet_films",
        source_field: "films",
        value_column: "film_title",
    },
    LinkTable {
        table: "planet_terrains",
        source_field: TERRAIN_LIST,
        value_column: "terrain",
    },
    LinkTable {
        table: "planet_gravity",
        source_field: GRAVITY_LIST,
        value_column: "gravity_value",
    },
];

/// Names of every gold table, fact table first
pub fn gold_table_names() -> Vec<&'static str> {
    std::iter::once(FACT_TABLE)
        .chain(LINK_TABLES.iter().map(|link| link.table))
        .collect()
}

// Re-export commonly used types
pub use cleaner::{build_silver, FieldCleaner};
pub use gold::{build_gold_tables, GoldTables};
pub use keys::assign_keys;
