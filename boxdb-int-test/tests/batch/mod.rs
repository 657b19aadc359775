//! Batch protocol integration tests: identities, locations and the
//! missing-target policy.

mod atomicity_test;
mod custom_id_test;
mod error_if_missing_test;
