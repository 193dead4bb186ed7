//! Binary entry point.
//!
//! # Lifecycle
//!
//! 1. **Configure**: `.env`, environment and config file into [`Config`]
//! 2. **Log**: Install the per-run file subscriber
//! 3. **Connect**: Start the chat backend and wait for `Ready`
//! 4. **Start up**: Load guilds, apply the default guild and channel
//! 5. **Run**: Take over the terminal and loop until `/quit`, Ctrl+D or EOF
//! 6. **Shut down**: Restore the terminal, close the gateway
//!
//! # Exit codes
//!
//! - `0`: normal exit
//! - `1`: missing token, invalid configuration, terminal failure
//! - `2`: the gateway never became ready, or no guild is reachable

#![allow(clippy::multiple_crate_versions)]

use chatbridge::discord::DiscordChatService;
use chatbridge::infrastructure::expand_tilde;
use chatbridge::service::{ChatService, Fixture, MemoryChatService, Notification};
use chatbridge::ui::terminal::{spawn_input_reader, TerminalGuard};
use chatbridge::{initialize, observability, Backend, BridgeError, Config, Result};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("chatbridge: {err}");
            return ExitCode::from(1);
        }
    };
    let log_file = observability::init_tracing(&config);

    match run(config).await {
        Ok(()) => {
            tracing::info!("chatbridge exited");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "chatbridge failed");
            eprintln!("chatbridge: {err}");
            if let Some(path) = log_file {
                eprintln!("log: {}", path.display());
            }
            ExitCode::from(exit_code(&err))
        }
    }
}

const fn exit_code(err: &BridgeError) -> u8 {
    match err {
        BridgeError::Startup(_) => 2,
        _ => 1,
    }
}

async fn connect(config: &Config, notifications: UnboundedSender<Notification>) -> Result<Arc<dyn ChatService>> {
    match config.backend {
        Backend::Discord => {
            let token = config
                .token
                .as_deref()
                .ok_or_else(|| BridgeError::Config("DISCORD_TOKEN is not set".to_string()))?;
            eprintln!("chatbridge: connecting to Discord...");
            let service = DiscordChatService::connect(token, notifications).await?;
            Ok(Arc::new(service))
        }
        Backend::Memory => {
            let service = match &config.fixture {
                Some(path) => MemoryChatService::load(&expand_tilde(path))?,
                None => MemoryChatService::from_fixture(Fixture::default()),
            };
            let bot = service.bot();
            let _ = notifications.send(Notification::Ready {
                user_id: bot.id,
                user: bot.name,
            });
            Ok(Arc::new(service))
        }
    }
}

async fn run(config: Config) -> Result<()> {
    let (notification_tx, mut notifications) = mpsc::unbounded_channel();
    let client = connect(&config, notification_tx).await?;

    let mut app = initialize(&config, client);
    let startup = async {
        app.wait_until_ready(&mut notifications, Duration::from_secs(config.ready_timeout_secs))
            .await?;
        app.startup(config.default_guild.as_deref(), config.default_channel.as_deref())
            .await
    };
    let started = startup.await;
    if let Err(err) = started {
        app.shutdown().await;
        return Err(err);
    }

    let (input_tx, mut inputs) = mpsc::unbounded_channel();
    let outcome = match TerminalGuard::enter() {
        Ok(mut guard) => {
            spawn_input_reader(input_tx);
            app.run(guard.terminal(), &mut inputs, &mut notifications).await
        }
        Err(err) => Err(err),
    };

    app.shutdown().await;
    outcome
}
