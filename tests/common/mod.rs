//! Shared fixture: a console wired to the in-memory backend.

#![allow(dead_code)]

use chatbridge::domain::{Author, ChannelRef, GuildRef, IncomingMessage, Message};
use chatbridge::service::{Call, MemoryChatService, Notification, ServiceLayer};
use chatbridge::ui::format::Clock;
use chatbridge::ui::View;
use chatbridge::{App, AppState, Theme};
use std::sync::Arc;
use tempfile::TempDir;

pub const GENERAL: u64 = 100;
pub const RANDOM: u64 = 101;
pub const ALERTS: u64 = 200;

pub fn bot() -> Author {
    Author {
        id: 1,
        name: "bridge-bot".to_string(),
        bot: true,
    }
}

pub fn alice() -> Author {
    Author {
        id: 2,
        name: "alice".to_string(),
        bot: false,
    }
}

fn channel(id: u64, guild_id: u64, name: &str) -> ChannelRef {
    ChannelRef {
        id,
        guild_id,
        name: name.to_string(),
    }
}

pub struct Console {
    pub app: App,
    pub backend: Arc<MemoryChatService>,
    pub dir: TempDir,
}

impl Console {
    /// Guild `Lab` (#general, #random) and guild `Ops` (#alerts), bot ready.
    pub async fn new() -> Self {
        let backend = Arc::new(MemoryChatService::new(bot()));
        backend.add_guild(
            GuildRef { id: 10, name: "Lab".to_string() },
            vec![channel(GENERAL, 10, "general"), channel(RANDOM, 10, "random")],
        );
        backend.add_guild(GuildRef { id: 20, name: "Ops".to_string() }, vec![channel(ALERTS, 20, "alerts")]);
        Self::with_backend(backend).await
    }

    pub async fn with_backend(backend: Arc<MemoryChatService>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let service = ServiceLayer::new(backend.clone(), dir.path().join("downloads"), dir.path().join("previews"));
        let mut app = App::new(service, View::new(Clock::with_offset_hours(Some(0))), Theme::default());
        let me = bot();
        app.handle_notification(Notification::Ready { user_id: me.id, user: me.name }).await;
        Self { app, backend, dir }
    }

    /// Selects Lab / #general.
    pub async fn in_general() -> Self {
        let mut console = Self::new().await;
        console.submit("/setguild Lab").await;
        console.submit("/setchannel general").await;
        console
    }

    /// Types a line and presses Enter. Returns whether the console quit.
    pub async fn submit(&mut self, line: &str) -> bool {
        self.app.submit(line).await.unwrap()
    }

    pub fn state(&self) -> &AppState {
        self.app.session().service.state()
    }

    pub fn mode(&self) -> &'static str {
        self.app.session().view.state().name()
    }

    pub fn log(&self) -> Vec<String> {
        self.app.session().view.log().iter().map(|line| line.plain_text()).collect()
    }

    pub fn last_line(&self) -> String {
        self.log().last().cloned().unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.log().into_iter().filter(|l| l.starts_with("[ERROR]")).collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.backend.calls()
    }

    pub fn history_requests(&self) -> Vec<(u64, u8)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::FetchHistory { channel, limit } => Some((channel, limit)),
                _ => None,
            })
            .collect()
    }

    pub async fn incoming(&mut self, message: Message, guild: &str, channel: &str) {
        let incoming = IncomingMessage {
            message,
            guild_name: Some(guild.to_string()),
            channel_name: Some(channel.to_string()),
        };
        self.app.handle_notification(Notification::Message(incoming)).await;
    }
}
