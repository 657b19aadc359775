//! Storage integration tests: persistence across re-opens and backends
//! with reduced capabilities.

mod capability_test;
