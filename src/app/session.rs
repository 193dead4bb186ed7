//! The context every bus handler receives.

use crate::events::EventBus;
use crate::service::ServiceLayer;
use crate::ui::View;

/// Mutable state shared by all handlers: the service layer (which owns
/// [`AppState`](super::AppState)) and the view.
#[derive(Debug)]
pub struct Session {
    pub service: ServiceLayer,
    pub view: View,
}

impl Session {
    #[must_use]
    pub const fn new(service: ServiceLayer, view: View) -> Self {
        Self { service, view }
    }
}

/// The application's event bus.
pub type Bus = EventBus<Session>;
