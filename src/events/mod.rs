//! Event taxonomy and the publish/subscribe bus.
//!
//! - [`kinds`]: The closed [`Event`] enum, its [`EventKind`] keys and the
//!   continuation carrier [`Pending`]
//! - [`bus`]: The sequential, fail-fast [`EventBus`]

pub mod bus;
pub mod kinds;

pub use bus::{EventBus, HandlerFuture};
pub use kinds::{Continuation, Event, EventKind, FileSubmission, Pending};
