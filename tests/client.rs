//! Client scenario tests
//!
//! Drives full voice and text turn cycles over scripted collaborators,
//! including the staleness rules for partial transcripts.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use common::{FakeChat, FakeSynthesizer, RecordingSink, ScriptedMic, ScriptedTranscriber};
use parley::audio::{AudioCapture, PlaybackController};
use parley::session::{SessionGate, SessionToken};
use parley::transcript::PartialUpdate;
use parley::{Client, ClientEvent, Command, Error, Speaker, TurnOrchestrator};

fn client_with(
    mic_chunk: Vec<f32>,
    stt: Arc<ScriptedTranscriber>,
    chat: Arc<FakeChat>,
) -> Client {
    let capture = AudioCapture::new(Box::new(ScriptedMic { chunk: mic_chunk }));
    let (sink, _) = RecordingSink::new();
    let orchestrator = TurnOrchestrator::new(
        chat,
        Arc::new(FakeSynthesizer::failing()),
        PlaybackController::new(Box::new(sink)),
        false,
    );
    Client::new(capture, orchestrator, stt, Duration::from_millis(500))
}

/// Token matching the client's first recording session
///
/// Tokens are issued sequentially starting at the same seed, so a mirror
/// gate yields the same values as the client's internal one.
fn first_session_token() -> SessionToken {
    let mut mirror = SessionGate::new();
    mirror.begin()
}

#[tokio::test]
async fn test_voice_turn_with_live_transcript() {
    let stt = Arc::new(ScriptedTranscriber::fixed("hello world"));
    let chat = Arc::new(FakeChat::replying("hi there"));
    let mut client = client_with(vec![0.1, 0.2], Arc::clone(&stt), Arc::clone(&chat));

    client.toggle_mic().await.expect("arm failed");
    assert!(client.is_recording());

    // Partial results stream in while recording and update in place
    let token = first_session_token();
    for text in ["he", "hell", "hello"] {
        client.apply_partial(PartialUpdate {
            token,
            text: text.to_string(),
        });
    }
    assert_eq!(client.log().len(), 1);
    assert!(client.log().has_provisional());
    assert_eq!(client.log().last().unwrap().text, "hello");

    // Finalization replaces the live transcript and runs the turn
    client.toggle_mic().await.expect("finalize failed");
    assert!(!client.is_recording());

    let turns = client.log().turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].speaker, Speaker::User);
    assert_eq!(turns[0].text, "hello world");
    assert!(!turns[0].provisional);
    assert_eq!(turns[1].speaker, Speaker::Assistant);
    assert_eq!(turns[1].text, "hi there");

    assert_eq!(chat.received(), vec!["hello world".to_string()]);
}

#[tokio::test]
async fn test_partial_after_finalize_is_stale() {
    let stt = Arc::new(ScriptedTranscriber::fixed("hello"));
    let chat = Arc::new(FakeChat::replying("hi"));
    let mut client = client_with(vec![0.1], Arc::clone(&stt), chat);

    client.toggle_mic().await.expect("arm failed");
    let token = first_session_token();
    client.toggle_mic().await.expect("finalize failed");
    assert_eq!(client.log().len(), 2);

    // A slow partial from the closed session must not reappear
    client.apply_partial(PartialUpdate {
        token,
        text: "ghost".to_string(),
    });
    assert_eq!(client.log().len(), 2);
    assert!(!client.log().has_provisional());
}

#[tokio::test]
async fn test_final_transcription_failure_withdraws_transcript() {
    let stt = Arc::new(ScriptedTranscriber::new(vec![Err(Error::Transcription(
        "backend down".to_string(),
    ))]));
    let chat = Arc::new(FakeChat::replying("unused"));
    let mut client = client_with(vec![0.1], stt, Arc::clone(&chat));

    client.toggle_mic().await.expect("arm failed");
    let token = first_session_token();
    client.apply_partial(PartialUpdate {
        token,
        text: "hel".to_string(),
    });
    assert!(client.log().has_provisional());

    let err = client.toggle_mic().await.expect_err("expected failure");
    assert!(matches!(err, Error::Transcription(_)));

    // The live transcript is withdrawn and no chat request was made
    assert!(client.log().is_empty());
    assert!(chat.received().is_empty());
    assert!(!client.is_recording());
}

#[tokio::test]
async fn test_silent_session_produces_no_turn() {
    let stt = Arc::new(ScriptedTranscriber::fixed("unused"));
    let chat = Arc::new(FakeChat::replying("unused"));
    let mut client = client_with(Vec::new(), Arc::clone(&stt), Arc::clone(&chat));

    client.toggle_mic().await.expect("arm failed");
    client.toggle_mic().await.expect("finalize failed");

    assert!(client.log().is_empty());
    assert!(chat.received().is_empty());
    // Nothing was captured, so the backend was never asked
    assert_eq!(stt.calls(), 0);
}

#[tokio::test]
async fn test_chat_failure_keeps_user_turn() {
    let stt = Arc::new(ScriptedTranscriber::fixed("unused"));
    let chat = Arc::new(FakeChat::failing());
    let mut client = client_with(vec![0.1], stt, chat);

    let err = client.submit_text("hi").await.expect_err("expected failure");
    assert!(matches!(err, Error::Chat(_)));

    let turns = client.log().turns();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].speaker, Speaker::User);
    assert_eq!(turns[0].text, "hi");
}

#[tokio::test]
async fn test_recording_can_restart_after_failure() {
    let stt = Arc::new(ScriptedTranscriber::new(vec![
        Err(Error::Transcription("backend down".to_string())),
        Ok("second try".to_string()),
    ]));
    let chat = Arc::new(FakeChat::replying("ok"));
    let mut client = client_with(vec![0.1], stt, Arc::clone(&chat));

    client.toggle_mic().await.expect("arm failed");
    client.toggle_mic().await.expect_err("expected failure");

    // The failed session never wedges the client
    client.toggle_mic().await.expect("re-arm failed");
    client.toggle_mic().await.expect("finalize failed");

    assert_eq!(chat.received(), vec!["second try".to_string()]);
    assert_eq!(client.log().len(), 2);
}

#[tokio::test]
async fn test_run_loop_processes_commands() {
    let stt = Arc::new(ScriptedTranscriber::fixed("unused"));
    let chat = Arc::new(FakeChat::replying("pong"));
    let client = client_with(vec![0.1], stt, Arc::clone(&chat));

    let mut events = client.subscribe();
    let (tx, rx) = mpsc::channel(4);
    tx.send(Command::SubmitText("ping".to_string()))
        .await
        .expect("send failed");
    tx.send(Command::Shutdown).await.expect("send failed");

    client.run(rx).await;

    assert_eq!(chat.received(), vec!["ping".to_string()]);

    // Events published during the run are still buffered for the subscriber
    let mut saw_turn_pair = false;
    while let Ok(event) = events.try_recv() {
        if let ClientEvent::ConversationChanged(turns) = event {
            saw_turn_pair = turns.len() == 2;
        }
    }
    assert!(saw_turn_pair);
}
