//! # GigLedger Credential Ledger
//!
//! Append-only store of non-transferable completion records. Each completed
//! job yields exactly one [`Credential`]; the job's client may rate it once,
//! and the worker's reputation score is the simple mean of rating x 100 over
//! rated credentials.

pub mod error;
pub mod ledger;

pub use error::{ReputationError, Result};
pub use ledger::{Credential, ReputationLedger};
