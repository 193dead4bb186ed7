//! Application layer: state, commands and the loop that ties them together.
//!
//! # Architecture
//!
//! Data flows one way through the bus:
//!
//! ```text
//! Key → View (InputState) → Intent → Controller → ServiceLayer → Event → Bus → View
//!                                                       ↑
//!                                   Gateway notification ┘
//! ```
//!
//! The controller never writes [`AppState`]; it asks the service layer, which
//! mutates the state and hands back the event describing the change.
//!
//! # Modules
//!
//! - [`commands`]: Slash command table, aliases and help text
//! - [`controller`]: Argument validation and command dispatch
//! - [`runtime`]: The [`App`] loop multiplexing input and notifications
//! - [`session`]: The handler context and the [`Bus`] alias
//! - [`state`]: The shared session state

pub mod commands;
pub mod controller;
pub mod runtime;
pub mod session;
pub mod state;

pub use controller::Controller;
pub use runtime::App;
pub use session::{Bus, Session};
pub use state::AppState;
