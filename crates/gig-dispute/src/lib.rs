//! # GigLedger Dispute Arbitration
//!
//! Fallback arbitration when a client and worker disagree on a submitted
//! milestone:
//!
//! - **Arbitrator Registry**: maintained pool of eligible arbitrators
//! - **Panel selection**: 3 distinct arbitrators per dispute, drawn without
//!   replacement from a seeded hash so no party can force a favorable panel
//! - **Quorum voting**: 2 matching votes of 3 resolve immediately
//! - **Timeout finalization**: permissionless after 72 hours; majority of the
//!   votes cast wins, ties favor the worker
//!
//! Resolutions are applied through the [`DisputeResolver`] capability the job
//! ledger implements; the engine never mutates job state directly.

pub mod engine;
pub mod error;
pub mod registry;
pub mod types;

pub use engine::{DisputeEngine, DisputeResolver};
pub use error::{DisputeError, Result};
pub use registry::ArbitratorRegistry;
pub use types::{Dispute, DisputeConfig, DisputeStatus};
