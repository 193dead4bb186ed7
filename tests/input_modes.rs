//! Multi-line, attach and edit workflows through the input state machine.

mod common;

use chatbridge::service::Call;
use common::{Console, GENERAL};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn sent_texts(console: &Console) -> Vec<String> {
    console
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::SendMessage { text, .. } => Some(text),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_plain_text_is_sent_to_current_channel() {
    let mut console = Console::in_general().await;
    console.submit("hello there").await;

    assert_eq!(sent_texts(&console), ["hello there"]);
    assert!(console.last_line().ends_with("bridge-bot: hello there"));
}

#[tokio::test]
async fn test_plain_text_without_channel_is_an_error() {
    let mut console = Console::new().await;
    console.submit("hello?").await;

    assert!(sent_texts(&console).is_empty());
    assert_eq!(console.last_line(), "[ERROR] No channel selected. Use /setchannel first.");
}

#[tokio::test]
async fn test_multiline_joins_lines_until_terminator() {
    let mut console = Console::in_general().await;

    console.submit("/multiline").await;
    assert_eq!(console.mode(), "Multiline");
    console.submit("hello").await;
    console.submit("world").await;
    assert!(sent_texts(&console).is_empty());
    console.submit("@end").await;

    assert_eq!(console.mode(), "Normal");
    assert_eq!(sent_texts(&console), ["hello\nworld"]);
}

#[tokio::test]
async fn test_multiline_requires_channel() {
    let mut console = Console::new().await;
    console.submit("/ml").await;
    assert_eq!(console.mode(), "Normal");
    assert_eq!(console.last_line(), "[ERROR] No channel selected. Use /setchannel first.");
}

#[tokio::test]
async fn test_multiline_escape_discards_lines() {
    let mut console = Console::in_general().await;
    console.submit("/ml").await;
    console.submit("draft").await;

    assert!(!console.app.handle_key(key(KeyCode::Esc)).await);

    assert_eq!(console.mode(), "Normal");
    assert!(sent_texts(&console).is_empty());
    assert!(console.log().iter().any(|l| l == "[Cancelled] Multiline"));
}

#[tokio::test]
async fn test_ctrl_c_quits_from_any_mode() {
    let mut console = Console::in_general().await;
    console.submit("/ml").await;

    let quit = console
        .app
        .handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
        .await;

    assert!(quit);
}

#[tokio::test]
async fn test_attach_prompts_for_path_and_caption() {
    let mut console = Console::in_general().await;
    let file = console.dir.path().join("notes.txt");
    std::fs::write(&file, "remember the milk").unwrap();

    console.submit("/attach").await;
    assert_eq!(console.mode(), "FileInput");
    console.submit(&format!("\"{}\"", file.display())).await;
    assert_eq!(console.mode(), "FileInput");
    console.submit("shopping").await;

    assert_eq!(console.mode(), "Normal");
    let uploads: Vec<Call> = console
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::SendFile { .. }))
        .collect();
    assert_eq!(
        uploads,
        [Call::SendFile {
            channel: GENERAL,
            path: file,
            caption: Some("shopping".to_string()),
        }]
    );
    assert!(console.log().iter().any(|l| l == "File sent: notes.txt"));
}

#[tokio::test]
async fn test_attach_empty_path_cancels() {
    let mut console = Console::in_general().await;
    console.submit("/a").await;
    console.submit("").await;

    assert_eq!(console.mode(), "Normal");
    assert_eq!(console.last_line(), "[Cancelled] File attach cancelled.");
    assert!(!console.calls().iter().any(|c| matches!(c, Call::SendFile { .. })));
}

#[tokio::test]
async fn test_attach_missing_file_is_reported() {
    let mut console = Console::in_general().await;
    let missing = console.dir.path().join("nope.bin");

    console.submit(&format!("/attach {} caption", missing.display())).await;

    assert_eq!(console.last_line(), format!("[ERROR] File not found: {}", missing.display()));
}

#[tokio::test]
async fn test_edit_replaces_own_message() {
    let mut console = Console::in_general().await;
    console.submit("first draft").await;
    console.submit("/self_messages").await;
    assert_eq!(console.state().recent_self_messages().len(), 1);
    let id = console.state().recent_self_messages()[0].id;

    console.submit("/edit 1").await;
    assert_eq!(console.mode(), "Edit");
    assert_eq!(console.app.session().view.input().text(), "first draft");
    console.submit("final text").await;

    assert_eq!(console.mode(), "Normal");
    assert_eq!(console.backend.message(id).map(|m| m.content), Some("final text".to_string()));
    assert!(console.log().iter().any(|l| l == "Message edited:"));
}

#[tokio::test]
async fn test_edit_unknown_index_is_rejected() {
    let mut console = Console::in_general().await;
    console.submit("/edit 3").await;

    assert_eq!(console.mode(), "Normal");
    assert_eq!(console.last_line(), "[ERROR] No self message #3 (0 listed). Run /self_messages first.");
}

#[tokio::test]
async fn test_delete_removes_own_message() {
    let mut console = Console::in_general().await;
    console.submit("oops").await;
    console.submit("/sm").await;
    let id = console.state().recent_self_messages()[0].id;

    console.submit("/delete 1").await;

    assert!(console.backend.message(id).is_none());
    assert!(console.state().recent_self_messages().is_empty());
    assert_eq!(console.last_line(), "Message deleted: oops");
}

#[tokio::test]
async fn test_delete_out_of_range() {
    let mut console = Console::in_general().await;
    console.submit("/d 1").await;
    assert_eq!(console.last_line(), "[ERROR] Index 1 is out of range (1-0)");
}
