//! Guild and channel selection, history and notices.

mod common;

use chatbridge::domain::{Attachment, GuildRef};
use chatbridge::service::MemoryChatService;
use common::{alice, bot, Console, ALERTS, GENERAL};
use std::sync::Arc;

#[tokio::test]
async fn test_listguilds_numbers_every_guild() {
    let mut console = Console::new().await;
    console.submit("/lg").await;

    let log = console.log();
    assert!(log.iter().any(|l| l == "--- Guilds ---"));
    assert!(log.iter().any(|l| l.contains("1. Lab")));
    assert!(log.iter().any(|l| l.contains("2. Ops")));
}

#[tokio::test]
async fn test_switching_guild_clears_channel_and_files() {
    let mut console = Console::in_general().await;
    let report = Attachment {
        id: 0,
        filename: "report.pdf".to_string(),
        size: 2048,
        url: "https://cdn.example/report.pdf".to_string(),
        content_type: Some("application/pdf".to_string()),
    };
    console.backend.post_with_attachments(GENERAL, &alice(), "numbers", vec![report]);
    console.submit("/files").await;
    assert_eq!(console.state().file_cache().len(), 1);

    console.submit("/setguild Ops").await;

    let state = console.state();
    assert_eq!(state.current_guild().map(|g| g.name.as_str()), Some("Ops"));
    assert!(state.current_channel().is_none());
    assert!(state.file_cache().is_empty());
    let channels: Vec<&str> = state.available_channels().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(channels, ["alerts"]);
    assert!(console.log().iter().any(|l| l == "--- Channels in Ops ---"));
}

#[tokio::test]
async fn test_index_wins_over_id() {
    let backend = Arc::new(MemoryChatService::new(bot()));
    backend.add_guild(GuildRef { id: 10, name: "Lab".to_string() }, Vec::new());
    backend.add_guild(GuildRef { id: 20, name: "Ops".to_string() }, Vec::new());
    backend.add_guild(GuildRef { id: 2, name: "Two".to_string() }, Vec::new());
    let mut console = Console::with_backend(backend).await;

    console.submit("/setguild 2").await;
    assert_eq!(console.state().current_guild().map(|g| g.name.as_str()), Some("Ops"));

    console.submit("/setguild 20").await;
    assert_eq!(console.state().current_guild().map(|g| g.name.as_str()), Some("Ops"));
}

#[tokio::test]
async fn test_unknown_channel_suggests_closest_name() {
    let mut console = Console::new().await;
    console.submit("/sg Lab").await;
    console.submit("/sc genral").await;

    assert!(console.state().current_channel().is_none());
    assert_eq!(
        console.last_line(),
        "[ERROR] Channel 'genral' not found. Did you mean 'general'?"
    );
}

#[tokio::test]
async fn test_setchannel_without_guild_is_an_error() {
    let mut console = Console::new().await;
    console.submit("/setchannel general").await;
    assert_eq!(console.last_line(), "[ERROR] No guild selected. Use /setguild first.");
}

#[tokio::test]
async fn test_setchannel_auto_reads_twenty() {
    let console = Console::in_general().await;
    assert_eq!(console.history_requests(), [(GENERAL, 20)]);
    assert!(console.log().iter().any(|l| l == "--- Recent messages in #general ---"));
}

#[tokio::test]
async fn test_history_is_shown_oldest_first() {
    let mut console = Console::new().await;
    for text in ["first", "second", "third"] {
        console.backend.post(GENERAL, &alice(), text);
    }
    console.submit("/sg 1").await;
    console.submit("/sc 1").await;

    let contents: Vec<&str> = console.state().recent_messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["first", "second", "third"]);

    let log = console.log();
    let position = |needle: &str| log.iter().position(|l| l.ends_with(needle)).unwrap();
    assert!(position("alice: first") < position("alice: second"));
    assert!(position("alice: second") < position("alice: third"));
}

#[tokio::test]
async fn test_read_validates_count() {
    let mut console = Console::in_general().await;

    console.submit("/read 0").await;
    assert_eq!(console.last_line(), "[ERROR] Count must be between 1 and 100, got 0");
    console.submit("/read 101").await;
    assert_eq!(console.last_line(), "[ERROR] Count must be between 1 and 100, got 101");
    console.submit("/r many").await;
    assert_eq!(console.last_line(), "[ERROR] 'many' is not a number");
    assert_eq!(console.history_requests(), [(GENERAL, 20)]);

    console.submit("/read 50").await;
    assert_eq!(console.history_requests(), [(GENERAL, 20), (GENERAL, 50)]);
}

#[tokio::test]
async fn test_incoming_elsewhere_is_a_notice() {
    let mut console = Console::in_general().await;
    let message = console.backend.post(ALERTS, &alice(), "disk full");

    console.incoming(message, "Ops", "alerts").await;

    assert_eq!(console.last_line(), "[New message in @Ops/#alerts]");
    assert!(console.state().recent_messages().iter().all(|m| m.content != "disk full"));
}

#[tokio::test]
async fn test_incoming_in_current_channel_is_shown_inline() {
    let mut console = Console::in_general().await;
    let message = console.backend.post(GENERAL, &alice(), "hello bot");

    console.incoming(message, "Lab", "general").await;

    assert!(console.last_line().ends_with("alice: hello bot"));
    assert_eq!(
        console.state().recent_messages().last().map(|m| m.content.as_str()),
        Some("hello bot")
    );
}

#[tokio::test]
async fn test_unknown_command_and_quit() {
    let mut console = Console::new().await;

    assert!(!console.submit("/frobnicate now").await);
    assert_eq!(
        console.last_line(),
        "[ERROR] Unknown command: /frobnicate. Type /help for a list of commands."
    );

    assert!(console.submit("/q").await);
    assert_eq!(console.last_line(), "Shutting down...");
}

#[tokio::test]
async fn test_clear_empties_the_log() {
    let mut console = Console::in_general().await;
    console.submit("/clear").await;
    assert!(console.log().is_empty());
}
