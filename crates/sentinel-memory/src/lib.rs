//! Memory-node storage: the atomic node+vector+artifact+audit write path
//! and the deferred vector-upsert worker that drains it.

#![deny(unsafe_code)]

pub mod artifact;
pub mod engine;
pub mod error;
pub mod memory_store;
pub mod pii;
pub mod postgres;
pub mod store;
pub mod worker;

pub use engine::MemoryEngine;
pub use error::{MemoryError, MemoryResult};
pub use memory_store::InMemoryMemoryStore;
pub use postgres::PostgresMemoryStore;
pub use store::{CreatedNode, MemoryStore};
pub use worker::{VectorAdapter, VectorWorker, WorkerPassReport, DEFAULT_BATCH_SIZE, DEFAULT_INTERVAL};
