//! Integration tests against a local mock of the sync server

mod e2e;
mod fixtures;
