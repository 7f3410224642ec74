//! Load Test Runner
//!
//! Full-length runs against a live reviewer service.
//!
//! To run load tests:
//! ```bash
//! LOADTEST__TARGET__BASE_URL=http://localhost:8080 \
//!     cargo test --test load_tests -- --ignored --test-threads=1
//! ```
//!
//! Note: Load tests are marked as #[ignore] by default to avoid
//! running them during normal CI builds. Use --ignored to run them.

mod load;
