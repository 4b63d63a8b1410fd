//! Testing utilities for floodgate applications
//!
//! Alba-style HTTP endpoint testing without running a server: build a
//! request against a router, execute it in-process, and chain assertions on
//! the response.
//!
//! # Example
//!
//! ```rust,ignore
//! use floodgate::testing;
//!
//! #[tokio::test]
//! async fn test_health() {
//!     let app = build_app().into_test_router();
//!
//!     testing::get(app, "/health")
//!         .execute()
//!         .await
//!         .assert_ok()
//!         .assert_json();
//! }
//! ```

mod scenario;

pub use scenario::{Scenario, ScenarioAssert, get, post};
