//! # GeoSync Testkit
//!
//! Testing utilities for GeoSync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: canonical forms and hashes that must never change
//! - **Generators**: proptest strategies for JSON values and their reformatted renderings
//! - **Fixtures**: a hub with in-memory client sessions for end-to-end scenarios
//!
//! ## Golden Vectors
//!
//! ```rust
//! use geosync_testkit::vectors::verify_all_vectors;
//!
//! verify_all_vectors().unwrap();
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use geosync_core::{HashAlgorithm, Payload};
//! use geosync_testkit::generators::reformatted_json;
//!
//! proptest! {
//!     #[test]
//!     fn hash_ignores_formatting((value, text) in reformatted_json()) {
//!         let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
//!         prop_assert_eq!(
//!             value.content_hash(HashAlgorithm::Sha256),
//!             parsed.content_hash(HashAlgorithm::Sha256)
//!         );
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use geosync_testkit::fixtures::{points, HubFixture};
//!
//! async fn example() {
//!     let fixture = HubFixture::new();
//!     let mut client = fixture.connect("region", None);
//!     fixture.write("region", points(&[(0.0, 0.0), (1.0, 1.0)]));
//!     let update = client.next_update().await;
//!     assert_eq!(update["dataset_id"], "region");
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{example_polygon, points, HubFixture, TestClient};
pub use generators::{json_value, reformatted_json, render_scrambled};
pub use vectors::{all_vectors, verify_all_vectors, CanonicalVector};
