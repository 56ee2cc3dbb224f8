//! # GigLedger Value Transfer Port
//!
//! The escrow core moves funds exclusively through the [`ValueTransfer`]
//! trait: an atomic, irreversible, exactly-once-per-call transfer capability.
//! The core does not implement settlement itself; [`MemoryLedger`] is an
//! in-process implementation for tests and embedders without an external
//! settlement rail.

pub mod transfer;

pub use transfer::{MemoryLedger, ValueTransfer};
