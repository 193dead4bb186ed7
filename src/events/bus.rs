//! In-process publish/subscribe broker.
//!
//! The bus decouples the services that produce data from the view that
//! renders it and from the controller that issues intents. It is generic over
//! the context `C` that handlers mutate; in the application that context is
//! the [`Session`](crate::app::Session).
//!
//! # Dispatch
//!
//! ```text
//! publish(event) ──► kind() ──► handlers[kind] ──► h1(bus, ctx, &event).await
//!                                                  h2(bus, ctx, &event).await
//!                                                  ...
//! ```
//!
//! Fan-out is sequential: each handler runs to completion before the next one
//! starts, so two handlers never interleave their mutations inside a single
//! publish. A handler may publish further events through the bus reference it
//! receives; those are delivered in full before it resumes.
//!
//! # Failure semantics
//!
//! Fail-fast. The first handler that returns an error stops the fan-out and
//! the error is returned to the publisher untouched. The bus does not log,
//! retry or suppress; the runtime loop decides what a broken subscriber means
//! for the session.

use super::kinds::{Event, EventKind};
use crate::domain::Result;
use futures_util::future::LocalBoxFuture;
use std::collections::HashMap;
use std::fmt;

/// Future returned by a bus handler.
pub type HandlerFuture<'a> = LocalBoxFuture<'a, Result<()>>;

type Handler<C> = Box<dyn for<'a> Fn(&'a EventBus<C>, &'a mut C, &'a Event) -> HandlerFuture<'a>>;

/// Event broker keyed by [`EventKind`].
pub struct EventBus<C> {
    handlers: HashMap<EventKind, Vec<Handler<C>>>,
}

impl<C> EventBus<C> {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers an asynchronous handler for `kind`.
    ///
    /// Handlers run in registration order. Registering the same function
    /// twice makes it run twice.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chatbridge::events::{Event, EventBus, EventKind};
    ///
    /// let mut bus: EventBus<Vec<String>> = EventBus::new();
    /// bus.subscribe(EventKind::ShowText, |_bus, log, event| {
    ///     Box::pin(async move {
    ///         if let Event::ShowText { text } = event {
    ///             log.push(text.clone());
    ///         }
    ///         Ok(())
    ///     })
    /// });
    /// assert_eq!(bus.handler_count(EventKind::ShowText), 1);
    /// ```
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F)
    where
        F: for<'a> Fn(&'a Self, &'a mut C, &'a Event) -> HandlerFuture<'a> + 'static,
    {
        tracing::trace!(?kind, "subscribing handler");
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Registers a handler that completes without awaiting anything.
    ///
    /// Convenience for view handlers, which only touch in-memory buffers.
    pub fn subscribe_sync<F>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(&mut C, &Event) -> Result<()> + 'static,
    {
        self.subscribe(kind, move |_bus, ctx, event| {
            Box::pin(std::future::ready(handler(ctx, event)))
        });
    }

    /// Delivers `event` to every handler registered for its kind.
    ///
    /// A no-op when nothing is subscribed.
    ///
    /// # Errors
    ///
    /// Returns the first handler error; handlers after it are not invoked.
    pub async fn publish(&self, ctx: &mut C, event: Event) -> Result<()> {
        let kind = event.kind();
        let Some(handlers) = self.handlers.get(&kind) else {
            tracing::trace!(?kind, "no subscribers");
            return Ok(());
        };

        tracing::debug!(?kind, handlers = handlers.len(), "publishing event");
        for handler in handlers {
            handler(self, &mut *ctx, &event).await?;
        }
        Ok(())
    }

    /// Number of handlers registered for `kind`.
    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

impl<C> Default for EventBus<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for EventBus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self
            .handlers
            .iter()
            .map(|(kind, handlers)| (*kind, handlers.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BridgeError;

    type Log = Vec<String>;

    fn recorder(bus: &mut EventBus<Log>, kind: EventKind, label: &'static str) {
        bus.subscribe_sync(kind, move |log, _event| {
            log.push(label.to_string());
            Ok(())
        });
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let bus: EventBus<Log> = EventBus::new();
        let mut log = Log::new();

        bus.publish(&mut log, Event::ClearDisplay).await.unwrap();
        bus.publish(&mut log, Event::error("nobody listens")).await.unwrap();

        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_handlers_run_in_subscription_order() {
        let mut bus = EventBus::new();
        for label in ["first", "second", "third", "fourth"] {
            recorder(&mut bus, EventKind::GuildsUpdated, label);
        }

        for _ in 0..3 {
            let mut log = Log::new();
            bus.publish(&mut log, Event::GuildsUpdated).await.unwrap();
            assert_eq!(log, ["first", "second", "third", "fourth"]);
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_runs_twice() {
        let mut bus = EventBus::new();
        recorder(&mut bus, EventKind::ClearDisplay, "clear");
        recorder(&mut bus, EventKind::ClearDisplay, "clear");

        let mut log = Log::new();
        bus.publish(&mut log, Event::ClearDisplay).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(bus.handler_count(EventKind::ClearDisplay), 2);
    }

    #[tokio::test]
    async fn test_async_handlers_do_not_interleave() {
        let mut bus = EventBus::new();
        bus.subscribe(EventKind::MessagesUpdated, |_bus, log: &mut Log, _event| {
            Box::pin(async move {
                log.push("slow:start".to_string());
                tokio::task::yield_now().await;
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                log.push("slow:end".to_string());
                Ok(())
            })
        });
        recorder(&mut bus, EventKind::MessagesUpdated, "fast");

        let mut log = Log::new();
        bus.publish(&mut log, Event::MessagesUpdated).await.unwrap();
        assert_eq!(log, ["slow:start", "slow:end", "fast"]);
    }

    #[tokio::test]
    async fn test_failing_handler_stops_fan_out() {
        let mut bus = EventBus::new();
        recorder(&mut bus, EventKind::ShowText, "before");
        bus.subscribe_sync(EventKind::ShowText, |_log: &mut Log, _event| {
            Err(BridgeError::Validation("broken subscriber".to_string()))
        });
        recorder(&mut bus, EventKind::ShowText, "after");

        let mut log = Log::new();
        let err = bus.publish(&mut log, Event::text("x")).await.unwrap_err();

        assert_eq!(err.to_string(), "broken subscriber");
        assert_eq!(log, ["before"]);
    }

    #[tokio::test]
    async fn test_nested_publish_completes_before_handler_resumes() {
        let mut bus = EventBus::new();
        bus.subscribe(EventKind::GuildSelected, |bus, log: &mut Log, _event| {
            Box::pin(async move {
                log.push("guild".to_string());
                bus.publish(log, Event::ChannelsUpdated).await?;
                log.push("guild:done".to_string());
                Ok(())
            })
        });
        recorder(&mut bus, EventKind::ChannelsUpdated, "channels");
        recorder(&mut bus, EventKind::GuildSelected, "guild:second");

        let mut log = Log::new();
        bus.publish(&mut log, Event::GuildSelected { name: "g".to_string() })
            .await
            .unwrap();

        assert_eq!(log, ["guild", "channels", "guild:done", "guild:second"]);
    }
}
