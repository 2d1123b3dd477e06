//! Integration tests for the ingestion pipeline
//!
//! These tests use wiremock to serve mock archive pages and exercise the
//! full fetch / extract / commit cycle end-to-end against a real SQLite
//! database.

use std::path::Path;
use std::sync::Arc;

use discograph::config::{Config, CrawlerConfig, OutputConfig, SeedEntry, SourceConfig};
use discograph::crawler::{CrawlCoordinator, HttpFetcher};
use discograph::output::{export_graph, write_dead_letter_file};
use discograph::storage::{SqliteStorage, Storage};
use discograph::EntityKind;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, seeds: Vec<String>, db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            worker_count: 2,
            max_attempts: 3,
            fetch_timeout_secs: 5,
            blocked_retry_count: 0,
            blocked_retry_delay_ms: 10,
        },
        source: SourceConfig {
            base_url: base_url.to_string(),
            user_agent: "discograph-test/1.0".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
            dead_letter_dir: "./dead-letters".to_string(),
            graph_path: "./graph.json".to_string(),
            include_isolated: false,
        },
        seed: vec![SeedEntry {
            kind: "band".to_string(),
            references: seeds,
        }],
    }
}

fn band_page_with_lineup() -> String {
    r#"<html><body>
    <h1 class="entity-name">Wyrm</h1>
    <div id="entity-info">
        <dl>
            <dt>Country</dt><dd>Norway</dd>
            <dt>Genre</dt><dd>Doom Metal</dd>
            <dt>Formed</dt><dd>1989</dd>
        </dl>
    </div>
    <table id="lineup">
        <tr class="current">
            <td><a href="/artists/j-doe/7">J. Doe</a></td>
            <td class="role">Bass (1989-2004, 2017-present)</td>
        </tr>
    </table>
    </body></html>"#
        .to_string()
}

fn artist_page() -> String {
    r#"<html><body>
    <h1 class="entity-name">J. Doe</h1>
    <div id="entity-info">
        <dl>
            <dt>Real name</dt><dd>John Doe</dd>
            <dt>Birthplace</dt><dd>Oslo, Norway</dd>
        </dl>
    </div>
    </body></html>"#
        .to_string()
}

async fn run_pipeline(config: Config, fresh: bool) -> discograph::RunSummary {
    let fetcher =
        Arc::new(HttpFetcher::new(&config.source, &config.crawler).expect("build fetcher"));
    let storage = Box::new(
        SqliteStorage::new(Path::new(&config.output.database_path)).expect("open storage"),
    );
    let mut coordinator =
        CrawlCoordinator::new(config, storage, fetcher, "test-hash", fresh).expect("coordinator");
    coordinator.run().await.expect("run")
}

#[tokio::test]
async fn test_full_ingest_commits_entities_and_relations() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bands/wyrm/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(band_page_with_lineup()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/artists/j-doe/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(artist_page()))
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("ingest.db");
    let config = create_test_config(
        &mock_server.uri(),
        vec!["bands/wyrm/42".to_string()],
        db_path.to_str().unwrap(),
    );

    let summary = run_pipeline(config, false).await;

    assert_eq!(summary.added, vec!["bands/wyrm/42"]);
    assert!(summary.unrecoverable.is_empty());

    let storage = SqliteStorage::new(&db_path).unwrap();
    let entities = storage.load_entities().unwrap();
    assert_eq!(entities.len(), 2);

    let band = entities
        .iter()
        .find(|e| e.reference == "bands/wyrm/42")
        .expect("band committed");
    assert_eq!(band.kind, EntityKind::Band);
    assert_eq!(band.name, "Wyrm");
    assert_eq!(band.country.as_deref(), Some("Norway"));
    assert_eq!(band.formed_year, Some(1989));

    let artist = entities
        .iter()
        .find(|e| e.reference == "artists/j-doe/7")
        .expect("artist resolved inline");
    assert_eq!(artist.kind, EntityKind::Artist);
    assert_eq!(artist.real_name.as_deref(), Some("John Doe"));

    let relations = storage.load_relations().unwrap();
    assert_eq!(relations.len(), 1);
    assert_eq!(relations[0].subject_ref, "artists/j-doe/7");
    assert_eq!(relations[0].object_ref, "bands/wyrm/42");
    assert_eq!(relations[0].role, "Bass");
    assert_eq!(relations[0].spans.len(), 2);
}

#[tokio::test]
async fn test_second_run_skips_visited_entities() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bands/wyrm/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(band_page_with_lineup()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/artists/j-doe/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(artist_page()))
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("ingest.db");
    let db_str = db_path.to_str().unwrap().to_string();

    let first = run_pipeline(
        create_test_config(&mock_server.uri(), vec!["bands/wyrm/42".to_string()], &db_str),
        false,
    )
    .await;
    assert_eq!(first.added.len(), 1);

    let second = run_pipeline(
        create_test_config(&mock_server.uri(), vec!["bands/wyrm/42".to_string()], &db_str),
        false,
    )
    .await;
    assert!(second.added.is_empty());
    assert_eq!(second.skipped, vec!["bands/wyrm/42"]);

    // Still exactly one copy of each entity
    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_entities().unwrap(), 2);
}

#[tokio::test]
async fn test_fresh_run_refetches_visited_entities() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bands/wyrm/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(band_page_with_lineup()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/artists/j-doe/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(artist_page()))
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let db_str = temp
        .path()
        .join("ingest.db")
        .to_str()
        .unwrap()
        .to_string();

    run_pipeline(
        create_test_config(&mock_server.uri(), vec!["bands/wyrm/42".to_string()], &db_str),
        false,
    )
    .await;

    let second = run_pipeline(
        create_test_config(&mock_server.uri(), vec!["bands/wyrm/42".to_string()], &db_str),
        true,
    )
    .await;
    assert_eq!(second.added, vec!["bands/wyrm/42"]);
}

#[tokio::test]
async fn test_persistent_server_error_exhausts_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bands/flaky/1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3) // one per attempt, never more
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let db_str = temp
        .path()
        .join("ingest.db")
        .to_str()
        .unwrap()
        .to_string();

    let summary = run_pipeline(
        create_test_config(&mock_server.uri(), vec!["bands/flaky/1".to_string()], &db_str),
        false,
    )
    .await;

    assert_eq!(summary.unrecoverable, vec!["bands/flaky/1"]);
    assert!(summary.added.is_empty());
}

#[tokio::test]
async fn test_missing_page_dead_letters_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bands/gone/9"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let db_str = temp
        .path()
        .join("ingest.db")
        .to_str()
        .unwrap()
        .to_string();

    let summary = run_pipeline(
        create_test_config(&mock_server.uri(), vec!["bands/gone/9".to_string()], &db_str),
        false,
    )
    .await;

    assert_eq!(summary.unrecoverable, vec!["bands/gone/9"]);
}

#[tokio::test]
async fn test_dead_letter_file_written_for_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bands/gone/9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let db_str = temp
        .path()
        .join("ingest.db")
        .to_str()
        .unwrap()
        .to_string();

    let summary = run_pipeline(
        create_test_config(&mock_server.uri(), vec!["bands/gone/9".to_string()], &db_str),
        false,
    )
    .await;

    let dead_letter_dir = temp.path().join("dead-letters");
    let written = write_dead_letter_file(&dead_letter_dir, &summary.unrecoverable)
        .unwrap()
        .expect("file written");
    let contents = std::fs::read_to_string(written).unwrap();
    assert_eq!(contents, "bands/gone/9\n");
}

#[tokio::test]
async fn test_graph_export_from_ingested_data() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bands/wyrm/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(band_page_with_lineup()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/artists/j-doe/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(artist_page()))
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("ingest.db");

    run_pipeline(
        create_test_config(
            &mock_server.uri(),
            vec!["bands/wyrm/42".to_string()],
            db_path.to_str().unwrap(),
        ),
        false,
    )
    .await;

    let storage = SqliteStorage::new(&db_path).unwrap();
    let graph_path = temp.path().join("graph.json");
    let graph = export_graph(&storage, &graph_path, false).unwrap();

    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);
    assert!(graph.has_edge("artists/j-doe/7", "bands/wyrm/42"));
    assert!(graph_path.exists());
}

#[tokio::test]
async fn test_mixed_run_classifies_each_reference_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bands/wyrm/42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(band_page_with_lineup()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/artists/j-doe/7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(artist_page()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bands/gone/9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let db_str = temp
        .path()
        .join("ingest.db")
        .to_str()
        .unwrap()
        .to_string();

    let summary = run_pipeline(
        create_test_config(
            &mock_server.uri(),
            vec!["bands/wyrm/42".to_string(), "bands/gone/9".to_string()],
            &db_str,
        ),
        false,
    )
    .await;

    assert_eq!(summary.added, vec!["bands/wyrm/42"]);
    assert_eq!(summary.unrecoverable, vec!["bands/gone/9"]);
    assert_eq!(
        summary.added.len() + summary.skipped.len() + summary.unrecoverable.len(),
        2
    );
}
