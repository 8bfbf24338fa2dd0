//! Server construction from configuration files.

use std::io::Write;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use geosync::{DatasetId, DatasetStore, GeoSyncServer, HashAlgorithm, ServerConfig};
use geosync_testkit::example_polygon;
use tower::util::ServiceExt;

const EXAMPLE_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../geosync.example.toml");

/// SHA-256 of the example polygon's canonical form.
const EXAMPLE_HASH: &str = "5d7e2acd6346602779b7fb369b4267641292533e1e7c600c98e91cd3df60bcec";

#[test]
fn example_config_seeds_polygon() {
    let config = ServerConfig::load(EXAMPLE_CONFIG).unwrap();
    assert_eq!(config.digest, HashAlgorithm::Sha256);
    assert_eq!(config.seeds.len(), 1);
    assert_eq!(config.seeds[0].points, example_polygon());

    let server = GeoSyncServer::new(config).unwrap();
    let hash = server
        .hub()
        .store()
        .hash_of(&DatasetId::new("example_dataset_id"))
        .unwrap()
        .unwrap();
    assert_eq!(hash.to_hex(), EXAMPLE_HASH);
}

#[test]
fn blake3_config_changes_hashes() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "digest = \"blake3\"\n[[seed]]\nid = \"d\"\npoints = [{{ x = 1.0, y = 2.0 }}]"
    )
    .unwrap();

    let server = GeoSyncServer::new(ServerConfig::load(file.path()).unwrap()).unwrap();
    let hash = server.hub().store().hash_of(&DatasetId::new("d")).unwrap().unwrap();
    assert_eq!(
        hash,
        HashAlgorithm::Blake3.digest(br#"[{"x":1,"y":2}]"#)
    );
}

#[tokio::test]
async fn seeded_dataset_served_over_http() {
    let server = GeoSyncServer::new(ServerConfig::load(EXAMPLE_CONFIG).unwrap()).unwrap();
    let response = server
        .router()
        .oneshot(
            Request::builder()
                .uri("/datasets")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let listing: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        listing,
        serde_json::json!([{"id": "example_dataset_id", "hash": EXAMPLE_HASH}])
    );
}
