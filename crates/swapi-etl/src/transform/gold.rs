//! Gold layer: fact table plus exploded link tables

use serde_json::Value;
use std::collections::HashSet;
use tracing::info;

use super::{LinkTable, FACT_COLUMNS, FACT_TABLE, KEY_COLUMN, LINK_TABLES};
use crate::error::Result;
use crate::extract::Record;
use crate::table::{text_of, Column, ColumnData, Table};

/// The five gold tables, fact table first
#[derive(Debug, Clone, PartialEq)]
pub struct GoldTables {
    tables: Vec<Table>,
}

impl GoldTables {
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name() == name)
    }

    pub fn fact(&self) -> Option<&Table> {
        self.get(FACT_TABLE)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(Table::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Build the fact table and every link table from cleaned, keyed records.
pub fn build_gold_tables(silver: &[Record]) -> Result<GoldTables> {
    let mut tables = Vec::with_capacity(LINK_TABLES.len() + 1);
    tables.push(build_fact_table(silver)?);

    for link in LINK_TABLES {
        tables.push(build_link_table(silver, link)?);
    }

    let gold = GoldTables { tables };
    info!(
        tables = ?gold.iter().map(|t| (t.name(), t.num_rows())).collect::<Vec<_>>(),
        "Built gold layer"
    );

    Ok(gold)
}

/// Fact table projection, one row per key; the first record of a key wins.
pub fn build_fact_table(silver: &[Record]) -> Result<Table> {
    let mut seen = HashSet::new();
    let rows: Vec<&Record> = silver
        .iter()
        .filter(|record| seen.insert(record.get(KEY_COLUMN).and_then(Value::as_i64)))
        .collect();

    Table::from_schema(FACT_TABLE, FACT_COLUMNS, &rows)
}

/// `(key, value)` rows for one multi-valued attribute.
///
/// Lists contribute one row per non-null element, a scalar contributes one
/// row, and null, missing or empty values contribute nothing.
pub fn build_link_table(silver: &[Record], link: &LinkTable) -> Result<Table> {
    let mut keys = Vec::new();
    let mut values = Vec::new();

    for record in silver {
        let key = record.get(KEY_COLUMN).and_then(Value::as_i64);
        for value in explode(record.get(link.source_field)) {
            keys.push(key);
            values.push(Some(value));
        }
    }

    Table::new(
        link.table,
        vec![
            Column::new(KEY_COLUMN, ColumnData::Int64(keys)),
            Column::new(link.value_column, ColumnData::Utf8(values)),
        ],
    )
}

fn explode(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(text_of)
            .collect(),
        Some(scalar) => vec![text_of(scalar)],
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::transform::cleaner::build_silver;
    use crate::transform::gold_table_names;
    use serde_json::json;

    fn bronze() -> Vec<Record> {
        [
            json!({
                "name": "Tatooine",
                "rotation_period": "23",
                "orbital_period": "304",
                "diameter": "10465",
                "climate": "arid",
                "gravity": "1 standard",
                "terrain": "desert",
                "surface_water": "1",
                "population": "200000",
                "residents": ["Luke Skywalker", null, "Owen Lars"],
                "films": ["A New Hope"],
                "created": "2014-12-09T13:50:49.641000Z",
                "edited": "2014-12-20T20:58:18.411000Z"
            }),
            json!({
                "name": "Alderaan",
                "rotation_period": "24",
                "orbital_period": "364",
                "diameter": "12500",
                "climate": "temperate",
                "gravity": "1.5",
                "terrain": "grasslands, mountains",
                "surface_water": "40",
                "population": "N/A",
                "residents": [],
                "films": ["A New Hope", "Revenge of the Sith"],
                "created": "2014-12-10T11:35:48.479000Z",
                "edited": "2014-12-20T20:58:18.420000Z"
            }),
            json!({
                "name": "Tatooine",
                "rotation_period": "23",
                "orbital_period": "304",
                "diameter": "10465",
                "climate": "arid",
                "gravity": "1 standard",
                "terrain": "desert",
                "surface_water": "1",
                "population": "200000",
                "residents": ["Luke Skywalker"],
                "films": [],
                "created": "2014-12-09T13:50:49.641000Z",
                "edited": "2014-12-20T20:58:18.411000Z"
            }),
        ]
        .into_iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
    }

    fn ints(table: &Table, column: &str) -> Vec<Option<i64>> {
        match &table.column(column).unwrap().data {
            ColumnData::Int64(v) => v.clone(),
            other => panic!("expected Int64 column, got {:?}", other.kind()),
        }
    }

    fn strings(table: &Table, column: &str) -> Vec<Option<String>> {
        match &table.column(column).unwrap().data {
            ColumnData::Utf8(v) => v.clone(),
            other => panic!("expected Utf8 column, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_table_names() {
        let gold = build_gold_tables(&build_silver(bronze()).unwrap()).unwrap();
        assert_eq!(gold.names(), gold_table_names());
        assert_eq!(
            gold.names(),
            vec!["planets", "planet_residents", "planet_films", "planet_terrains", "planet_gravity"]
        );
    }

    #[test]
    fn test_fact_table_one_row_per_key() {
        let gold = build_gold_tables(&build_silver(bronze()).unwrap()).unwrap();
        let planets = gold.fact().unwrap();

        assert_eq!(planets.num_rows(), 2);
        assert_eq!(ints(planets, "planet_id"), vec![Some(1), Some(2)]);
        assert_eq!(
            strings(planets, "name"),
            vec![Some("Tatooine".to_string()), Some("Alderaan".to_string())]
        );
        assert_eq!(
            planets.column_names(),
            FACT_COLUMNS.iter().map(|(name, _)| *name).collect::<Vec<_>>()
        );
        assert_eq!(
            planets.column("population_num").unwrap().data,
            ColumnData::Float64(vec![Some(200000.0), None])
        );
        assert_eq!(
            planets.column("gravity_numeric").unwrap().data,
            ColumnData::Float64(vec![Some(1.0), Some(1.5)])
        );
    }

    #[test]
    fn test_link_tables_drop_nulls_and_keep_repeats() {
        let gold = build_gold_tables(&build_silver(bronze()).unwrap()).unwrap();

        let residents = gold.get("planet_residents").unwrap();
        assert_eq!(ints(residents, "planet_id"), vec![Some(1), Some(1), Some(1)]);
        assert_eq!(
            strings(residents, "resident_name"),
            vec![
                Some("Luke Skywalker".to_string()),
                Some("Owen Lars".to_string()),
                Some("Luke Skywalker".to_string())
            ]
        );

        let terrains = gold.get("planet_terrains").unwrap();
        assert_eq!(ints(terrains, "planet_id"), vec![Some(1), Some(2), Some(2), Some(1)]);
        assert_eq!(
            strings(terrains, "terrain")[1..3].to_vec(),
            vec![Some("grasslands".to_string()), Some("mountains".to_string())]
        );

        let gravity = gold.get("planet_gravity").unwrap();
        assert_eq!(
            strings(gravity, "gravity_value")[1],
            Some("1.5 standard".to_string())
        );
    }

    #[test]
    fn test_link_tables_reference_fact_keys() {
        let gold = build_gold_tables(&build_silver(bronze()).unwrap()).unwrap();
        let fact_keys: HashSet<Option<i64>> =
            ints(gold.fact().unwrap(), "planet_id").into_iter().collect();

        for link in LINK_TABLES {
            let table = gold.get(link.table).unwrap();
            assert!(ints(table, "planet_id").iter().all(|k| fact_keys.contains(k)));
            assert!(strings(table, link.value_column).iter().all(Option::is_some));
        }
    }

    #[test]
    fn test_scalar_value_explodes_to_one_row() {
        assert_eq!(explode(Some(&json!("unknown"))), vec!["unknown".to_string()]);
        assert!(explode(Some(&json!([]))).is_empty());
        assert!(explode(None).is_empty());
    }

    #[test]
    fn test_build_is_deterministic() {
        let silver = build_silver(bronze()).unwrap();
        assert_eq!(
            build_gold_tables(&silver).unwrap(),
            build_gold_tables(&silver).unwrap()
        );
    }
}
