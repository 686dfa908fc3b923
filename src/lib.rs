//! This crate provides a small REST service over a store of municipal building footprints.
//!
//! On start-up the service performs a one-time extract-load: if its persistent collection is
//! empty, every building record is fetched from a public open data endpoint and written to the
//! collection in a single atomic batch. The collection is never reloaded once populated.
//! Requests are then answered either by scanning the collection on every request or from an
//! in-memory copy loaded once after the bootstrap.
//!
//! The service is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team, on top of the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON source records, documents and responses.
//! * [sled] is an embedded database holding the building collection.
//! * [reqwest] fetches the source records.

pub mod app;
pub mod app_state;
pub mod bootstrap;
pub mod cli;
pub mod error;
pub mod metrics;
pub mod models;
pub mod query;
pub mod repository;
pub mod server;
pub mod source;
pub mod store;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod validated_query;
