//! # GigLedger Shared Types
//!
//! Domain primitives shared by every GigLedger crate: account identities,
//! token amounts, monotone id allocation, the clock abstraction used for all
//! time-dependent transitions, and the platform event bus.

pub mod clock;
pub mod events;
pub mod sequence;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use events::{EventBus, PlatformEvent};
pub use sequence::SequenceAllocator;
pub use types::{AccountAddress, TokenAmount, TOKEN_BASE_UNIT, TOKEN_DECIMALS};
