//! The gated-write coordinator: `policy check -> domain write -> audit
//! append` as a single envelope, with idempotency-key de-duplication so a
//! retried request neither re-runs a side-effecting write nor double-logs.

#![deny(unsafe_code)]

pub mod coordinator;
pub mod error;
pub mod idempotency;

pub use coordinator::{GatedWriteCoordinator, GatedWriteOutcome, GatedWriteRequest};
pub use error::{KernelError, KernelResult};
pub use idempotency::{IdempotencyRecord, IdempotencyStore, InMemoryIdempotencyStore};
