#![forbid(unsafe_code)]

//! Catalog and attempt storage contracts plus their adapters.

pub mod repository;
pub mod sqlite;
