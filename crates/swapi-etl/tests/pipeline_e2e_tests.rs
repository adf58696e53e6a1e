//! End-to-end tests for the planets pipeline
//!
//! These tests run the real HTTP fetcher against a mocked source API and
//! validate:
//! - Pagination, duplicate records and pagination cycles
//! - Cross-reference resolution through the memo cache
//! - Layer files written by the local layer writer
//! - Gold table contents read back from Parquet

use std::collections::HashSet;
use std::fs::File;
use std::time::Duration;

use arrow::array::{Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{json, Value};
use swapi_etl::extract::{fetch_all_pages, HttpFetcher};
use swapi_etl::load::{LayerPaths, LocalLayerWriter};
use swapi_etl::pipeline::{self, Sinks};
use swapi_etl::EtlError;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path, query_param, query_param_is_missing},
    Mock, MockServer, ResponseTemplate,
};

fn planet(server: &MockServer, name: &str, terrain: &str, residents: &[u32], films: &[u32]) -> Value {
    let uri = server.uri();
    json!({
        "name": name,
        "rotation_period": "24",
        "orbital_period": "364",
        "diameter": "12500",
        "climate": "temperate",
        "gravity": "1",
        "terrain": terrain,
        "surface_water": "40",
        "population": "unknown",
        "residents": residents.iter().map(|id| format!("{}/api/people/{}", uri, id)).collect::<Vec<_>>(),
        "films": films.iter().map(|id| format!("{}/api/films/{}", uri, id)).collect::<Vec<_>>(),
        "created": "2014-12-10T11:35:48.479000Z",
        "edited": "2014-12-20T20:58:18.420000Z"
    })
}

/// Mount a two-page planets listing.
async fn mount_planets(server: &MockServer) {
    let uri = server.uri();
    let tatooine = planet(server, "Tatooine", "desert", &[1, 2], &[1]);
    let alderaan = planet(server, "Alderaan", "grasslands, mountains", &[3], &[1, 2]);
    let hoth = planet(server, "Hoth", "tundra, ice caves, mountain ranges", &[], &[2]);

    Mock::given(method("GET"))
        .and(path("/api/planets"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "next": format!("{}/api/planets?page=2", uri),
            "results": [tatooine, alderaan]
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/planets"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "next": null,
            // Alderaan repeated verbatim on the second page
            "results": [alderaan, hoth]
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Mount three people and two films. Person 3 answers 404.
async fn mount_references(server: &MockServer) {
    for (id, name) in [(1, "Luke Skywalker"), (2, "C-3PO")] {
        Mock::given(method("GET"))
            .and(path(format!("/api/people/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": name})))
            .expect(1)
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/api/people/3"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(server)
        .await;

    for (id, title) in [(1, "A New Hope"), (2, "The Empire Strikes Back")] {
        Mock::given(method("GET"))
            .and(path(format!("/api/films/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"title": title})))
            .expect(1)
            .mount(server)
            .await;
    }
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(Duration::from_secs(5)).unwrap()
}

fn read_parquet(dir: &TempDir, key: &str) -> RecordBatch {
    let file = File::open(dir.path().join(key)).unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();
    let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
    arrow::compute::concat_batches(&batches[0].schema(), &batches).unwrap()
}

fn ints(batch: &RecordBatch, column: &str) -> Vec<i64> {
    let array = batch
        .column_by_name(column)
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    (0..array.len()).map(|i| array.value(i)).collect()
}

fn strings(batch: &RecordBatch, column: &str) -> Vec<Option<String>> {
    let array = batch
        .column_by_name(column)
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    (0..array.len())
        .map(|i| (!array.is_null(i)).then(|| array.value(i).to_string()))
        .collect()
}

#[tokio::test]
async fn test_fetch_all_pages_drops_repeated_records() {
    let server = MockServer::start().await;
    mount_planets(&server).await;

    let records = fetch_all_pages(&fetcher(), &format!("{}/api/planets", server.uri()))
        .await
        .unwrap();

    let names: Vec<&str> = records.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Tatooine", "Alderaan", "Hoth"]);
}

#[tokio::test]
async fn test_pagination_cycle_is_fatal() {
    let server = MockServer::start().await;
    let root = format!("{}/api/planets", server.uri());

    Mock::given(method("GET"))
        .and(path("/api/planets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": root,
            "results": [{"name": "Kamino"}]
        })))
        .mount(&server)
        .await;

    let err = fetch_all_pages(&fetcher(), &root).await.unwrap_err();
    assert!(matches!(err, EtlError::PaginationCycle(_)));
}

#[tokio::test]
async fn test_unexpected_shape_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/planets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("maintenance")))
        .mount(&server)
        .await;

    let err = fetch_all_pages(&fetcher(), &format!("{}/api/planets", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, EtlError::UnexpectedShape { .. }));
}

#[tokio::test]
async fn test_source_error_aborts_the_run() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/planets"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = pipeline::run_with(
        &fetcher(),
        &format!("{}/api/planets", server.uri()),
        &Sinks::default(),
        &LayerPaths::new("swapi"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EtlError::Http(_)));
}

#[tokio::test]
async fn test_full_run_writes_all_layers() {
    let server = MockServer::start().await;
    mount_planets(&server).await;
    mount_references(&server).await;

    let out = TempDir::new().unwrap();
    let sinks = Sinks {
        layers: Some(Box::new(LocalLayerWriter::new(out.path()))),
        ..Sinks::default()
    };

    let report = pipeline::run_with(
        &fetcher(),
        &format!("{}/api/planets", server.uri()),
        &sinks,
        &LayerPaths::new("swapi"),
    )
    .await
    .unwrap();

    assert_eq!(report.bronze_rows, 3);
    assert_eq!(report.fact_rows, 3);
    assert_eq!(report.references_cached, 5);
    assert_eq!(report.references_unresolved, 1);
    assert_eq!(report.files_written.len(), 7);

    // Bronze keeps the null left by the failed lookup
    let bronze = read_parquet(&out, "swapi/bronze/planets_raw.parquet");
    assert_eq!(bronze.num_rows(), 3);

    let planets = read_parquet(&out, "swapi/gold/planets.parquet");
    assert_eq!(ints(&planets, "planet_id"), vec![1, 2, 3]);
    assert_eq!(
        strings(&planets, "gravity_clean"),
        vec![Some("1 standard".to_string()); 3]
    );
    assert_eq!(
        strings(&planets, "population"),
        vec![Some("unknown".to_string()); 3]
    );

    let residents = read_parquet(&out, "swapi/gold/planet_residents.parquet");
    assert_eq!(ints(&residents, "planet_id"), vec![1, 1]);
    assert_eq!(
        strings(&residents, "resident_name"),
        vec![Some("Luke Skywalker".to_string()), Some("C-3PO".to_string())]
    );

    let films = read_parquet(&out, "swapi/gold/planet_films.parquet");
    assert_eq!(ints(&films, "planet_id"), vec![1, 2, 2, 3]);

    let terrains = read_parquet(&out, "swapi/gold/planet_terrains.parquet");
    assert_eq!(
        strings(&terrains, "terrain"),
        vec![
            Some("desert".to_string()),
            Some("grasslands".to_string()),
            Some("mountains".to_string()),
            Some("tundra".to_string()),
            Some("ice caves".to_string()),
            Some("mountain ranges".to_string()),
        ]
    );

    // Every link row points at a fact row
    let keys: HashSet<i64> = ints(&planets, "planet_id").into_iter().collect();
    for table in ["planet_residents", "planet_films", "planet_terrains", "planet_gravity"] {
        let batch = read_parquet(&out, &format!("swapi/gold/{}.parquet", table));
        assert!(ints(&batch, "planet_id").iter().all(|k| keys.contains(k)), "{}", table);
    }
}
