//! Interactive storefront session.
//!
//! Ties the query interpreter and chat responder from `storefront-core` to
//! the stores in `storefront-db` for a single shopper:
//!
//! - `runtime` - `StorefrontSession`, the owned session context (catalog view,
//!   cart, chat transcript, voice search)
//! - `progression` - delayed order status updates after checkout
//! - `scheduler` - cancellable background tasks backing the timers
//!
//! Parsing and replies stay deterministic; the only waiting is the chat reply
//! delay, the voice listen window and order progression.

pub mod progression;
pub mod runtime;
pub mod scheduler;
pub mod voice;

pub use progression::{OrderProgression, ProgressionError};
pub use runtime::{CheckoutOutcome, SessionSettings, StorefrontSession};
pub use scheduler::{ScheduledTask, TaskScheduler};
pub use voice::SimulatedVoiceInput;
