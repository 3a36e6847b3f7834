//! competence-store: Persistence backends for competence records.
//!
//! Implements the `CompetenceStore` trait for an in-memory map and a directory
//! of JSON documents, plus a fault-injecting wrapper for tests and the TOML
//! configuration that selects a backend.

pub mod config;
pub mod file;
pub mod memory;
pub mod mock;

pub use config::{create_store, load_config, CompetenceConfig, StoreConfig};
pub use file::JsonFileStore;
pub use memory::InMemoryStore;
pub use mock::FaultyStore;
